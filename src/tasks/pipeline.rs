// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::crawler::deduplicator::{self, Deduplicator};
use crate::crawler::feed_fetcher::SourceOutcome;
use crate::crawler::{ArticleExtractor, FeedFetcher};
use crate::domain::models::article::Article;
use crate::domain::models::candidate::Candidate;
use crate::domain::models::crawl_task::CrawlTask;
use crate::domain::models::rss_source::{ResolvedFeed, RssSourceConfig};
use crate::domain::repositories::task_repository::RepositoryError;
use crate::domain::repositories::{ArticleRepository, SourceRepository, TaskRepository};
use crate::domain::services::summary_engine::{SummaryEngine, SummaryInput};
use crate::progress::{ProgressEvent, ProgressPublisher};
use crate::tasks::cancel::CancelToken;

/// 流水线依赖集合
///
/// 任务管理器构建一次，所有任务共享
pub struct PipelineContext {
    pub tasks: Arc<dyn TaskRepository>,
    pub articles: Arc<dyn ArticleRepository>,
    pub sources: Arc<dyn SourceRepository>,
    pub fetcher: Arc<FeedFetcher>,
    pub extractor: Arc<ArticleExtractor>,
    pub summary: Arc<SummaryEngine>,
    pub publisher: Arc<ProgressPublisher>,
    pub extract_workers: usize,
}

/// 流水线结束方式
enum PipelineEnd {
    Completed,
    Cancelled,
    Failed(String),
}

/// 执行一个任务的完整流水线
///
/// 抓取 → 去重 → 提取 → 摘要 → 持久化，每个候选处理完
/// 广播一次进度。除持久化外的所有阶段错误都被吸收。
#[instrument(skip_all, fields(task_id = %task.id, query = %task.query))]
pub async fn run_task(ctx: Arc<PipelineContext>, task: CrawlTask, cancel: CancelToken) {
    let mut task = match task.start() {
        Ok(t) => t,
        // 不在Pending说明任务已被并发删除或重复启动
        Err(_) => return,
    };

    if let Err(e) = ctx.tasks.update(&task).await {
        warn!(error = %e, "Failed to mark task running");
        return;
    }
    ctx.publisher.publish(ProgressEvent::from_task(&task));

    let end = match execute(&ctx, &mut task, &cancel).await {
        Ok(end) => end,
        Err(e) => PipelineEnd::Failed(format!("Persistence failure: {e}")),
    };

    match end {
        PipelineEnd::Completed => {
            let Ok(completed) = task.complete() else {
                return;
            };
            if let Err(e) = ctx.tasks.update(&completed).await {
                warn!(error = %e, "Failed to mark task completed");
                return;
            }
            info!(
                processed = completed.processed_articles,
                "Task completed"
            );
            ctx.publisher.publish(ProgressEvent::from_task(&completed));
        }
        PipelineEnd::Cancelled => {
            info!("Task cancelled, pipeline unwound");
        }
        PipelineEnd::Failed(message) => {
            warn!(message = %message, "Task failed");
            let Ok(failed) = task.fail(message) else {
                return;
            };
            if let Err(e) = ctx.tasks.update(&failed).await {
                warn!(error = %e, "Failed to mark task failed");
                return;
            }
            ctx.publisher.publish(ProgressEvent::from_task(&failed));
        }
    }
}

async fn execute(
    ctx: &Arc<PipelineContext>,
    task: &mut CrawlTask,
    cancel: &CancelToken,
) -> Result<PipelineEnd, RepositoryError> {
    let feeds = resolve_feeds(ctx, task).await?;
    if feeds.is_empty() {
        return Ok(PipelineEnd::Failed(
            "No usable sources configured".to_string(),
        ));
    }

    let outcomes = ctx.fetcher.fetch_all(&feeds, cancel).await;
    if cancel.is_cancelled() {
        return Ok(PipelineEnd::Cancelled);
    }
    if !outcomes.iter().any(|o| o.is_fetched()) {
        // 全部被robots排除与全部不可达分开报告
        let all_skipped = outcomes
            .iter()
            .all(|o| matches!(o, SourceOutcome::Skipped { .. }));
        let message = if all_skipped {
            "All configured sources are excluded by robots.txt"
        } else {
            "All configured sources are unreachable"
        };
        return Ok(PipelineEnd::Failed(message.to_string()));
    }

    let admitted = admit_candidates(ctx, task, &outcomes).await?;
    task.record_admitted(admitted.len() as u32);
    ctx.tasks.update(task).await?;
    ctx.publisher.publish(ProgressEvent::from_task(task));

    if admitted.is_empty() {
        return Ok(PipelineEnd::Completed);
    }

    // 提取和摘要并发执行，持久化与计数保持单写者串行
    let enrichment = stream::iter(admitted.into_iter().map(|(candidate, fingerprint)| {
        let ctx = ctx.clone();
        let cancel = cancel.clone();
        async move {
            let extracted = ctx.extractor.extract(&candidate.url, &cancel).await;
            let text = extracted.or_else(|| candidate.summary.clone());
            let summary = ctx
                .summary
                .summarize(
                    SummaryInput {
                        title: &candidate.title,
                        feed_summary: candidate.summary.as_deref(),
                        text: text.as_deref(),
                    },
                    None,
                )
                .await;
            (candidate, fingerprint, text, summary)
        }
    }))
    .buffered(ctx.extract_workers.max(1));
    tokio::pin!(enrichment);

    while let Some((candidate, fingerprint, text, summary)) = enrichment.next().await {
        if cancel.is_cancelled() {
            return Ok(PipelineEnd::Cancelled);
        }

        let mut article = Article::from_candidate(task.id, &candidate, text, fingerprint);
        article.summary = Some(summary);

        match ctx.articles.save(&article).await {
            Ok(_) => {}
            // 仓库层的最后防线命中：视为重复，计入已处理
            Err(RepositoryError::AlreadyExists) => {}
            Err(e) => return Err(e),
        }

        task.record_processed();
        ctx.tasks.update(task).await?;
        ctx.publisher.publish(ProgressEvent::from_task(task));
    }

    Ok(PipelineEnd::Completed)
}

/// 解析本次任务的有效源列表
///
/// 提供自定义源时覆盖配置源；自定义源按给定顺序
/// 赋予递减优先级
async fn resolve_feeds(
    ctx: &PipelineContext,
    task: &CrawlTask,
) -> Result<Vec<ResolvedFeed>, RepositoryError> {
    let configs: Vec<RssSourceConfig> = match &task.custom_feeds {
        Some(templates) if !templates.is_empty() => templates
            .iter()
            .enumerate()
            .map(|(i, t)| RssSourceConfig::from_custom_url(t, (templates.len() - i) as i32))
            .collect(),
        _ => ctx.sources.list_active().await?,
    };

    Ok(configs
        .iter()
        .filter_map(|c| c.resolve(&task.query))
        .collect())
}

/// 候选条目准入
///
/// 按源优先级顺序应用时间窗口、相关性和指纹去重，
/// 准入数量封顶在任务limit
async fn admit_candidates(
    ctx: &PipelineContext,
    task: &CrawlTask,
    outcomes: &[SourceOutcome],
) -> Result<Vec<(Candidate, String)>, RepositoryError> {
    let dedup = Deduplicator::new();
    let mut admitted: Vec<(Candidate, String)> = Vec::new();

    'sources: for outcome in outcomes {
        let SourceOutcome::Fetched { candidates, .. } = outcome else {
            continue;
        };

        for candidate in candidates {
            if admitted.len() as u32 >= task.limit {
                break 'sources;
            }

            // 发布时间缺失的条目不受时间窗口过滤
            if let (Some(since), Some(published)) = (task.since, candidate.published) {
                if published < since {
                    continue;
                }
            }
            if !candidate.is_relevant(&task.query) {
                continue;
            }

            let fingerprint = deduplicator::fingerprint(&candidate.url, &candidate.title);
            if !dedup.check_and_insert(&fingerprint) {
                continue;
            }
            if ctx
                .articles
                .exists_fingerprint(task.id, &fingerprint)
                .await?
            {
                continue;
            }

            admitted.push((candidate.clone(), fingerprint));
        }
    }

    Ok(admitted)
}
