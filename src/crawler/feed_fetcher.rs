// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::settings::CrawlerSettings;
use crate::crawler::feed_parser;
use crate::crawler::rate_limiter::HostRateLimiter;
use crate::domain::models::candidate::Candidate;
use crate::domain::models::rss_source::ResolvedFeed;
use crate::tasks::cancel::CancelToken;
use crate::utils::retry_policy::{
    is_retryable_reqwest_error, is_retryable_status, RetryPolicy,
};
use crate::utils::robots::RobotsChecker;

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 网络请求失败
    #[error("Feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 非成功HTTP状态
    #[error("Feed request returned status {0}")]
    Status(reqwest::StatusCode),

    /// feed文档解析失败
    #[error("Feed document is invalid: {0}")]
    Parse(#[from] rss::Error),

    /// URL无效
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    /// 抓取被取消
    #[error("Fetch cancelled")]
    Cancelled,
}

/// 单个源的抓取结果
///
/// robots拒绝记为跳过而非失败；两者都不中断任务
#[derive(Debug)]
pub enum SourceOutcome {
    /// 抓取并解析成功
    Fetched {
        source: String,
        candidates: Vec<Candidate>,
    },
    /// 被排除指令跳过
    Skipped { source: String, reason: String },
    /// 重试耗尽后放弃
    Failed { source: String, error: FetchError },
}

impl SourceOutcome {
    /// 来源名称
    pub fn source(&self) -> &str {
        match self {
            SourceOutcome::Fetched { source, .. }
            | SourceOutcome::Skipped { source, .. }
            | SourceOutcome::Failed { source, .. } => source,
        }
    }

    /// 是否成功取回feed文档
    pub fn is_fetched(&self) -> bool {
        matches!(self, SourceOutcome::Fetched { .. })
    }
}

/// Feed抓取器
///
/// 并发抓取受最大并发数约束；同一主机的请求间隔
/// 由进程级限速器保证，与任务边界无关
pub struct FeedFetcher {
    client: reqwest::Client,
    limiter: Arc<HostRateLimiter>,
    robots: Arc<RobotsChecker>,
    retry: RetryPolicy,
    max_concurrent: usize,
}

impl FeedFetcher {
    pub fn new(
        client: reqwest::Client,
        limiter: Arc<HostRateLimiter>,
        robots: Arc<RobotsChecker>,
        settings: &CrawlerSettings,
    ) -> Self {
        Self {
            client,
            limiter,
            robots,
            retry: RetryPolicy::with_max_retries(settings.max_retries),
            max_concurrent: settings.max_concurrent_fetches.max(1),
        }
    }

    /// 覆盖重试策略
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 抓取所有已解析的源
    ///
    /// 返回顺序与传入的源优先级顺序一致
    pub async fn fetch_all(
        &self,
        feeds: &[ResolvedFeed],
        cancel: &CancelToken,
    ) -> Vec<SourceOutcome> {
        // 先物化future列表；惰性闭包流在spawn出的任务里
        // 无法通过高阶生命周期推断
        let fetches: Vec<_> = feeds
            .iter()
            .map(|feed| self.fetch_source(feed, cancel))
            .collect();
        stream::iter(fetches)
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    /// 抓取单个源
    async fn fetch_source(&self, feed: &ResolvedFeed, cancel: &CancelToken) -> SourceOutcome {
        match self.robots.is_allowed(&feed.url).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(source = %feed.source, "Source disallowed by robots.txt, skipping");
                return SourceOutcome::Skipped {
                    source: feed.source.clone(),
                    reason: "disallowed by robots.txt".to_string(),
                };
            }
            Err(e) => {
                return SourceOutcome::Failed {
                    source: feed.source.clone(),
                    error: FetchError::InvalidUrl(e.to_string()),
                };
            }
        }

        match self.fetch_document(&feed.url, cancel).await {
            Ok(body) => match feed_parser::parse_feed(&body, &feed.source) {
                Ok(candidates) => {
                    debug!(
                        source = %feed.source,
                        count = candidates.len(),
                        "Feed fetched"
                    );
                    SourceOutcome::Fetched {
                        source: feed.source.clone(),
                        candidates,
                    }
                }
                Err(e) => SourceOutcome::Failed {
                    source: feed.source.clone(),
                    error: e.into(),
                },
            },
            Err(error) => {
                warn!(source = %feed.source, error = %error, "Feed fetch failed");
                SourceOutcome::Failed {
                    source: feed.source.clone(),
                    error,
                }
            }
        }
    }

    /// 带重试和退避地取回feed文档
    async fn fetch_document(
        &self,
        url: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            // 限速等待同样要响应取消，不能拖满一个礼貌间隔
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = self.limiter.acquire(url) => {}
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                r = self.send(url) => r,
            };

            match result {
                Ok(body) => return Ok(body),
                Err(e) if is_retryable(&e) && self.retry.should_retry(attempt) => {
                    attempt += 1;
                    let backoff = self.retry.calculate_backoff(attempt);
                    warn!(
                        url,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient fetch failure, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn is_retryable(error: &FetchError) -> bool {
    match error {
        FetchError::Request(e) => is_retryable_reqwest_error(e),
        FetchError::Status(status) => is_retryable_status(*status),
        _ => false,
    }
}
