// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::article::Article;
use crate::domain::repositories::task_repository::RepositoryError;

/// 文章仓库特质
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// 保存文章
    async fn save(&self, article: &Article) -> Result<Article, RepositoryError>;
    /// 根据ID查找文章
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>, RepositoryError>;
    /// 列出任务的所有文章，按创建时间升序
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Article>, RepositoryError>;
    /// 指纹是否已存在于任务的已持久化文章中
    async fn exists_fingerprint(
        &self,
        task_id: Uuid,
        fingerprint: &str,
    ) -> Result<bool, RepositoryError>;
    /// 统计任务的文章数
    async fn count_by_task(&self, task_id: Uuid) -> Result<u64, RepositoryError>;
    /// 仅重写摘要字段
    async fn update_summary(&self, id: Uuid, summary: String) -> Result<(), RepositoryError>;
    /// 删除任务的所有文章，返回删除数量
    async fn delete_by_task(&self, task_id: Uuid) -> Result<u64, RepositoryError>;
}
