// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::settings::CrawlerSettings;
use crate::crawler::rate_limiter::HostRateLimiter;
use crate::tasks::cancel::CancelToken;
use crate::utils::retry_policy::{is_retryable_reqwest_error, RetryPolicy};
use crate::utils::text;

/// 结构化正文容器选择器，按优先顺序尝试
static CONTENT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article",
        "main",
        "[role='main']",
        "div.article-body",
        "div.story-body",
        "div.post-content",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// 启发式阶段纳入段落的最小长度
const MIN_PARAGRAPH_LEN: usize = 40;

/// 正文提取器
///
/// 两级回退链：结构化容器优先，段落聚合兜底。
/// 任何失败都返回None，由调用方退回feed摘要
pub struct ArticleExtractor {
    client: reqwest::Client,
    limiter: Arc<HostRateLimiter>,
    retry: RetryPolicy,
    min_content_length: usize,
}

impl ArticleExtractor {
    pub fn new(
        client: reqwest::Client,
        limiter: Arc<HostRateLimiter>,
        settings: &CrawlerSettings,
    ) -> Self {
        Self {
            client,
            limiter,
            retry: RetryPolicy::with_max_retries(settings.max_retries),
            min_content_length: settings.min_content_length,
        }
    }

    /// 覆盖重试策略
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 提取文章正文
    ///
    /// 抓取失败、任务取消或两级提取都不产出足够内容时返回None
    pub async fn extract(&self, url: &str, cancel: &CancelToken) -> Option<String> {
        if cancel.is_cancelled() {
            return None;
        }

        let html = tokio::select! {
            _ = cancel.cancelled() => return None,
            result = self.fetch_page(url) => match result {
                Ok(html) => html,
                Err(e) => {
                    debug!(url, error = %e, "Article page fetch failed");
                    return None;
                }
            },
        };

        extract_from_html(&html, self.min_content_length)
    }

    /// 带重试地取回文章页面
    async fn fetch_page(&self, url: &str) -> Result<String, reqwest::Error> {
        let mut attempt = 0u32;
        loop {
            self.limiter.acquire(url).await;

            match self.send(url).await {
                Ok(body) => return Ok(body),
                Err(e) if is_retryable_reqwest_error(&e) && self.retry.should_retry(attempt) => {
                    attempt += 1;
                    let backoff = self.retry.calculate_backoff(attempt);
                    warn!(url, attempt, error = %e, "Transient page fetch failure, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// 从HTML文档提取正文
///
/// 第一级：常见正文容器中文本量最大的一个；
/// 第二级：聚合全部有实质内容的段落
fn extract_from_html(html: &str, min_len: usize) -> Option<String> {
    let document = Html::parse_document(html);

    for selector in CONTENT_SELECTORS.iter() {
        let best = document
            .select(selector)
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
            .max_by_key(|t| t.len());

        if let Some(raw) = best {
            let cleaned = text::clean_text(&raw);
            if cleaned.len() >= min_len {
                return Some(cleaned);
            }
        }
    }

    let paragraphs: Vec<String> = document
        .select(&PARAGRAPH_SELECTOR)
        .map(|el| text::clean_text(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|t| t.len() >= MIN_PARAGRAPH_LEN)
        .collect();

    let joined = paragraphs.join(" ");
    if joined.len() >= min_len {
        Some(joined)
    } else {
        None
    }
}
