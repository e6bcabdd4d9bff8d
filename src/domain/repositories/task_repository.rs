// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::crawl_task::{CrawlTask, TaskStatus};

/// 仓库错误类型
///
/// 存储写入失败对任务是致命的，由调用方决定如何终止
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 存储层错误
    #[error("Storage error: {0}")]
    Storage(String),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 记录已存在
    #[error("Record already exists")]
    AlreadyExists,
}

/// 任务仓库特质
///
/// 定义任务数据访问接口；TaskManager是唯一的写入方
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 创建新任务
    async fn create(&self, task: &CrawlTask) -> Result<CrawlTask, RepositoryError>;
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CrawlTask>, RepositoryError>;
    /// 更新任务
    async fn update(&self, task: &CrawlTask) -> Result<CrawlTask, RepositoryError>;
    /// 列出任务，可按状态过滤，按创建时间降序
    async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<CrawlTask>, RepositoryError>;
    /// 删除任务
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}
