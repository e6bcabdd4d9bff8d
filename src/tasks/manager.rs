// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::config::settings::Settings;
use crate::crawler::{ArticleExtractor, FeedFetcher, HostRateLimiter};
use crate::domain::models::article::Article;
use crate::domain::models::crawl_task::{CrawlTask, TaskStatus};
use crate::domain::repositories::task_repository::RepositoryError;
use crate::domain::repositories::{ArticleRepository, SourceRepository, TaskRepository};
use crate::domain::services::llm_service::LlmService;
use crate::domain::services::summary_engine::{SummaryEngine, SummaryInput, SummaryStrategy};
use crate::progress::{ProgressEvent, ProgressPublisher};
use crate::tasks::cancel::{cancel_pair, CancelHandle};
use crate::tasks::pipeline::{self, PipelineContext};
use crate::utils::robots::RobotsChecker;

/// 任务操作错误类型
#[derive(Error, Debug)]
pub enum TaskError {
    /// 输入验证失败，未产生任何副作用
    #[error("Validation error: {0}")]
    Validation(String),

    /// 任务或文章不存在
    #[error("Not found")]
    NotFound,

    /// 当前状态不允许该操作
    #[error("Invalid task state: {0}")]
    InvalidState(String),

    /// 存储层失败
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<RepositoryError> for TaskError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => TaskError::NotFound,
            other => TaskError::Storage(other.to_string()),
        }
    }
}

/// 任务创建请求
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// 搜索关键词，不能为空
    #[validate(length(min = 1, message = "query must not be empty"))]
    pub query: String,
    /// 仅收录此时间之后发布的文章
    pub since: Option<DateTime<Utc>>,
    /// 最多收录的文章数
    #[validate(range(min = 1, message = "limit must be positive"))]
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// 覆盖配置源的自定义RSS源模板列表
    pub custom_feeds: Option<Vec<String>>,
}

fn default_limit() -> u32 {
    50
}

impl CreateTaskRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            since: None,
            limit: default_limit(),
            custom_feeds: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_custom_feeds(mut self, feeds: Vec<String>) -> Self {
        self.custom_feeds = Some(feeds);
        self
    }
}

/// 运行中任务的取消句柄和执行句柄
struct RunningTask {
    cancel: CancelHandle,
    join: tokio::task::JoinHandle<()>,
}

/// 任务管理器
///
/// 任务状态机与流水线编排的唯一入口；
/// 持有每个运行中任务的取消句柄
pub struct TaskManager {
    ctx: Arc<PipelineContext>,
    running: Arc<DashMap<Uuid, RunningTask>>,
}

impl TaskManager {
    /// 组装流水线依赖并创建任务管理器
    pub fn new(
        settings: &Settings,
        tasks: Arc<dyn TaskRepository>,
        articles: Arc<dyn ArticleRepository>,
        sources: Arc<dyn SourceRepository>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.crawler.user_agent.clone())
            .timeout(settings.crawler.request_timeout())
            .build()?;

        let limiter = Arc::new(HostRateLimiter::new(settings.crawler.per_host_delay()));
        let robots = Arc::new(RobotsChecker::new(
            client.clone(),
            settings.crawler.user_agent.clone(),
        ));

        let fetcher = Arc::new(FeedFetcher::new(
            client.clone(),
            limiter.clone(),
            robots,
            &settings.crawler,
        ));
        let extractor = Arc::new(ArticleExtractor::new(
            client.clone(),
            limiter,
            &settings.crawler,
        ));

        let default_strategy = settings
            .summary
            .default_strategy
            .parse()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to rss_first strategy");
                SummaryStrategy::RssFirst
            });
        let llm = Arc::new(LlmService::new(client, &settings.summary));
        let summary = Arc::new(SummaryEngine::new(llm, default_strategy));

        let publisher = Arc::new(ProgressPublisher::new(settings.progress.channel_capacity));

        Ok(Self {
            ctx: Arc::new(PipelineContext {
                tasks,
                articles,
                sources,
                fetcher,
                extractor,
                summary,
                publisher,
                extract_workers: settings.crawler.extract_workers,
            }),
            running: Arc::new(DashMap::new()),
        })
    }

    /// 创建任务并异步启动流水线
    pub async fn create(&self, request: CreateTaskRequest) -> Result<CrawlTask, TaskError> {
        request
            .validate()
            .map_err(|e| TaskError::Validation(e.to_string()))?;
        if request.query.trim().is_empty() {
            return Err(TaskError::Validation(
                "query must not be blank".to_string(),
            ));
        }

        let task = CrawlTask::new(
            request.query.trim().to_string(),
            request.since,
            request.limit,
            request.custom_feeds,
        );
        let task = self.ctx.tasks.create(&task).await?;
        self.spawn_pipeline(task.clone());
        Ok(task)
    }

    /// 查询单个任务
    pub async fn get(&self, id: Uuid) -> Result<CrawlTask, TaskError> {
        self.ctx
            .tasks
            .find_by_id(id)
            .await?
            .ok_or(TaskError::NotFound)
    }

    /// 列出任务，可按状态过滤
    pub async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<CrawlTask>, TaskError> {
        Ok(self.ctx.tasks.list(status).await?)
    }

    /// 删除任务
    ///
    /// 取消在途工作并级联删除其全部文章
    pub async fn delete(&self, id: Uuid) -> Result<(), TaskError> {
        if let Some((_, entry)) = self.running.remove(&id) {
            entry.cancel.cancel();
            // 级联删除前等流水线完全退出，在途写入不会留下孤儿文章
            let _ = entry.join.await;
        }
        self.ctx.tasks.delete(id).await?;
        self.ctx.articles.delete_by_task(id).await?;
        Ok(())
    }

    /// 重试失败的任务
    ///
    /// 清空计数器和既有文章，重新执行流水线
    pub async fn retry(&self, id: Uuid) -> Result<CrawlTask, TaskError> {
        let task = self.get(id).await?;
        let status = task.status;
        let task = task.reset_for_retry().map_err(|_| {
            TaskError::InvalidState(format!("retry requires a failed task, current: {status}"))
        })?;

        self.ctx.articles.delete_by_task(id).await?;
        let task = self.ctx.tasks.update(&task).await?;
        self.spawn_pipeline(task.clone());
        Ok(task)
    }

    /// 列出任务收录的文章
    pub async fn articles_for_task(&self, task_id: Uuid) -> Result<Vec<Article>, TaskError> {
        // 未知任务与零文章任务区分开
        self.get(task_id).await?;
        Ok(self.ctx.articles.list_by_task(task_id).await?)
    }

    /// 重新生成文章摘要
    ///
    /// 只改写summary字段；固定策略和不变源文本下幂等
    pub async fn regenerate_summary(
        &self,
        article_id: Uuid,
        strategy: Option<SummaryStrategy>,
    ) -> Result<Article, TaskError> {
        let mut article = self
            .ctx
            .articles
            .find_by_id(article_id)
            .await?
            .ok_or(TaskError::NotFound)?;

        let summary = self
            .ctx
            .summary
            .summarize(
                SummaryInput {
                    title: &article.title,
                    feed_summary: article.summary.as_deref(),
                    text: article.text.as_deref(),
                },
                strategy,
            )
            .await;

        self.ctx
            .articles
            .update_summary(article_id, summary.clone())
            .await?;
        article.summary = Some(summary);
        Ok(article)
    }

    /// 设置进程级默认摘要策略
    ///
    /// 只影响后续摘要调用，不回写已存储的摘要
    pub fn set_default_strategy(&self, strategy: &str) -> Result<(), TaskError> {
        let strategy: SummaryStrategy = strategy
            .parse()
            .map_err(|e: crate::domain::services::summary_engine::SummaryError| {
                TaskError::Validation(e.to_string())
            })?;
        self.ctx.summary.set_strategy(strategy);
        Ok(())
    }

    /// 当前默认摘要策略
    pub fn default_strategy(&self) -> SummaryStrategy {
        self.ctx.summary.current_strategy()
    }

    /// 注册进度观察者
    pub fn subscribe(&self) -> mpsc::Receiver<ProgressEvent> {
        self.ctx.publisher.subscribe()
    }

    /// 任务的流水线是否仍在执行
    pub fn is_running(&self, id: Uuid) -> bool {
        self.running
            .get(&id)
            .map_or(false, |entry| !entry.join.is_finished())
    }

    fn spawn_pipeline(&self, task: CrawlTask) {
        // 顺带清掉已结束的条目，运行表不随历史任务增长
        self.running.retain(|_, entry| !entry.join.is_finished());

        let (handle, token) = cancel_pair();
        let task_id = task.id;
        let join = tokio::spawn(pipeline::run_task(self.ctx.clone(), task, token));
        self.running.insert(
            task_id,
            RunningTask {
                cancel: handle,
                join,
            },
        );
    }
}
