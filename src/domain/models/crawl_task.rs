// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 爬取任务实体
///
/// 表示一次按关键词聚合新闻的采集任务。任务具有状态机、
/// 进度百分比和已处理/总计数器，只能通过状态转换方法变更。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlTask {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 搜索关键词
    pub query: String,
    /// 仅收录此时间之后发布的文章（可选）
    pub since: Option<DateTime<Utc>>,
    /// 最多收录的文章数
    pub limit: u32,
    /// 本任务使用的自定义RSS源列表（可选，覆盖配置源）
    pub custom_feeds: Option<Vec<String>>,
    /// 任务状态
    pub status: TaskStatus,
    /// 进度百分比 (0-100)
    pub progress: u8,
    /// 已处理的候选条目数
    pub processed_articles: u32,
    /// 纳入处理的候选条目总数
    pub total_articles: u32,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 开始执行时间
    pub started_at: Option<DateTime<Utc>>,
    /// 完成时间
    pub completed_at: Option<DateTime<Utc>>,
    /// 失败时的错误信息
    pub error_message: Option<String>,
}

/// 任务状态枚举
///
/// 状态转换遵循以下流程：
/// Pending → Running → Completed/Failed；Failed → Pending 仅通过显式重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 已创建，尚未开始执行
    #[default]
    Pending,
    /// 流水线执行中
    Running,
    /// 成功执行完成
    Completed,
    /// 执行失败
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(()),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition")]
    InvalidStateTransition,

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl CrawlTask {
    /// 创建一个新的爬取任务
    pub fn new(
        query: String,
        since: Option<DateTime<Utc>>,
        limit: u32,
        custom_feeds: Option<Vec<String>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            query,
            since,
            limit,
            custom_feeds,
            status: TaskStatus::Pending,
            progress: 0,
            processed_articles: 0,
            total_articles: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    /// 启动任务
    ///
    /// 将任务状态从Pending变更为Running
    pub fn start(mut self) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Pending => {
                self.status = TaskStatus::Running;
                self.started_at = Some(Utc::now());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 完成任务
    ///
    /// 将任务状态从Running变更为Completed并将进度置为100
    pub fn complete(mut self) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Running => {
                self.status = TaskStatus::Completed;
                self.progress = 100;
                self.completed_at = Some(Utc::now());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 标记任务失败
    pub fn fail(mut self, message: impl Into<String>) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Pending | TaskStatus::Running => {
                self.status = TaskStatus::Failed;
                self.error_message = Some(message.into());
                self.completed_at = Some(Utc::now());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 重置失败任务以便重试
    ///
    /// 仅允许Failed状态；清空计数器和错误信息，回到Pending
    pub fn reset_for_retry(mut self) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Failed => {
                self.status = TaskStatus::Pending;
                self.progress = 0;
                self.processed_articles = 0;
                self.total_articles = 0;
                self.started_at = None;
                self.completed_at = None;
                self.error_message = None;
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 记录一个候选条目处理完毕并刷新进度
    ///
    /// 计数器单调递增，进度限制在[0,100]
    pub fn record_processed(&mut self) {
        self.processed_articles += 1;
        self.refresh_progress();
    }

    /// 记录新纳入的候选条目
    pub fn record_admitted(&mut self, count: u32) {
        self.total_articles += count;
        self.refresh_progress();
    }

    fn refresh_progress(&mut self) {
        let denominator = self.total_articles.min(self.limit).max(1);
        let pct = (self.processed_articles as u64 * 100) / denominator as u64;
        self.progress = pct.min(100) as u8;
    }

    /// 任务是否处于终态
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}
