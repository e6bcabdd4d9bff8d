// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;

use crate::domain::models::rss_source::RssSourceConfig;
use crate::domain::repositories::task_repository::RepositoryError;

/// RSS源仓库特质
///
/// 写入方是外部协作方；核心只消费活跃源
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// 列出活跃源，按优先级降序
    async fn list_active(&self) -> Result<Vec<RssSourceConfig>, RepositoryError>;
    /// 列出所有源
    async fn list_all(&self) -> Result<Vec<RssSourceConfig>, RepositoryError>;
    /// 按名称插入或更新源
    async fn upsert(&self, source: &RssSourceConfig) -> Result<(), RepositoryError>;
    /// 按名称删除源
    async fn remove(&self, name: &str) -> Result<(), RepositoryError>;
}
