// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

use crate::domain::services::llm_service::LlmServiceTrait;
use crate::utils::text;

/// 摘要缓存有效期
const CACHE_TTL: Duration = Duration::from_secs(24 * 3600);
/// 摘要缓存条目上限
const CACHE_MAX_ENTRIES: usize = 1024;

/// RSS源摘要可直接采用的最小长度
const RSS_FIRST_MIN_LEN: usize = 10;
/// hybrid策略下源摘要胜出的最小长度
const HYBRID_FEED_MIN_LEN: usize = 50;
/// 送入推理服务的最小正文长度
const AI_MIN_INPUT_LEN: usize = 50;
/// hybrid策略下尝试推理服务的最小正文长度
const HYBRID_TEXT_MIN_LEN: usize = 100;

/// 摘要策略枚举
///
/// 封闭的策略集合，保证分发逻辑可穷尽检查
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStrategy {
    /// 优先采用RSS源提供的摘要
    #[default]
    RssFirst,
    /// 委托外部推理服务生成
    AiGenerated,
    /// 源摘要与提取式摘要结合
    Hybrid,
    /// 确定性的提取式摘要
    Simple,
}

impl fmt::Display for SummaryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SummaryStrategy::RssFirst => write!(f, "rss_first"),
            SummaryStrategy::AiGenerated => write!(f, "ai_generated"),
            SummaryStrategy::Hybrid => write!(f, "hybrid"),
            SummaryStrategy::Simple => write!(f, "simple"),
        }
    }
}

impl FromStr for SummaryStrategy {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rss_first" => Ok(SummaryStrategy::RssFirst),
            "ai_generated" => Ok(SummaryStrategy::AiGenerated),
            "hybrid" => Ok(SummaryStrategy::Hybrid),
            "simple" => Ok(SummaryStrategy::Simple),
            other => Err(SummaryError::UnknownStrategy(other.to_string())),
        }
    }
}

/// 摘要错误类型
#[derive(Error, Debug)]
pub enum SummaryError {
    /// 未识别的策略名称
    #[error("Unknown summary strategy: {0}")]
    UnknownStrategy(String),
    /// 推理服务失败
    #[error("Inference collaborator failed: {0}")]
    Inference(String),
}

/// 摘要输入
///
/// 与持久化解耦：流水线传入候选条目字段，
/// 重新生成时传入已存储文章的字段
#[derive(Debug, Clone, Copy)]
pub struct SummaryInput<'a> {
    /// 文章标题
    pub title: &'a str,
    /// RSS源提供的摘要
    pub feed_summary: Option<&'a str>,
    /// 提取的正文
    pub text: Option<&'a str>,
}

impl<'a> SummaryInput<'a> {
    /// 摘要计算的文本基础：正文缺失时退回标题
    fn basis(&self) -> &'a str {
        match self.text {
            Some(t) if !t.trim().is_empty() => t,
            _ => self.title,
        }
    }
}

#[derive(Clone)]
struct CachedSummary {
    summary: String,
    created_at: Instant,
}

/// 摘要引擎
///
/// 按进程级默认策略分发到具体算法；策略单元加锁读取，
/// 读多写少，不会暴露半更新值
pub struct SummaryEngine {
    strategy: RwLock<SummaryStrategy>,
    llm: Arc<dyn LlmServiceTrait>,
    cache: Mutex<HashMap<String, CachedSummary>>,
}

impl SummaryEngine {
    pub fn new(llm: Arc<dyn LlmServiceTrait>, default_strategy: SummaryStrategy) -> Self {
        Self {
            strategy: RwLock::new(default_strategy),
            llm,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 当前进程级默认策略
    pub fn current_strategy(&self) -> SummaryStrategy {
        *self.strategy.read()
    }

    /// 设置默认策略，只影响后续调用
    pub fn set_strategy(&self, strategy: SummaryStrategy) {
        *self.strategy.write() = strategy;
    }

    /// 生成摘要
    ///
    /// 对固定策略和不变的源文本幂等；任何策略失败都回退
    /// 到simple，绝不让摘要阶段中断任务
    pub async fn summarize(
        &self,
        input: SummaryInput<'_>,
        strategy: Option<SummaryStrategy>,
    ) -> String {
        let strategy = strategy.unwrap_or_else(|| self.current_strategy());
        let cache_key = Self::cache_key(&input, strategy);

        if let Some(cached) = self.cached(&cache_key) {
            return cached;
        }

        let summary = match strategy {
            SummaryStrategy::Simple => self.simple(&input),
            SummaryStrategy::RssFirst => self.rss_first(&input),
            SummaryStrategy::Hybrid => self.hybrid(&input).await,
            SummaryStrategy::AiGenerated => self.ai_generated(&input).await,
        };

        if !summary.is_empty() {
            self.store(cache_key, &summary);
        }
        summary
    }

    fn simple(&self, input: &SummaryInput<'_>) -> String {
        text::leading_sentences(input.basis())
    }

    fn rss_first(&self, input: &SummaryInput<'_>) -> String {
        match input.feed_summary {
            Some(s) if s.trim().len() > RSS_FIRST_MIN_LEN => s.trim().to_string(),
            _ => self.simple(input),
        }
    }

    async fn ai_generated(&self, input: &SummaryInput<'_>) -> String {
        let basis = input.basis();
        if basis.trim().len() < AI_MIN_INPUT_LEN {
            return self.simple(input);
        }

        match self.try_inference(basis).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("AI summarization unavailable, falling back to simple: {}", e);
                self.simple(input)
            }
        }
    }

    async fn hybrid(&self, input: &SummaryInput<'_>) -> String {
        if let Some(s) = input.feed_summary {
            if s.trim().len() > HYBRID_FEED_MIN_LEN {
                return s.trim().to_string();
            }
        }

        let basis = input.basis();
        if basis.trim().len() > HYBRID_TEXT_MIN_LEN {
            match self.try_inference(basis).await {
                Ok(summary) => return summary,
                Err(e) => {
                    warn!("Hybrid summarization fell back to simple: {}", e);
                }
            }
        }

        self.simple(input)
    }

    async fn try_inference(&self, basis: &str) -> Result<String, SummaryError> {
        self.llm
            .summarize(basis)
            .await
            .map_err(|e| SummaryError::Inference(e.to_string()))
    }

    fn cache_key(input: &SummaryInput<'_>, strategy: SummaryStrategy) -> String {
        let mut hasher = Sha256::new();
        hasher.update(strategy.to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(input.feed_summary.unwrap_or("").as_bytes());
        hasher.update(b"\n");
        hasher.update(input.basis().as_bytes());
        hex::encode(hasher.finalize())
    }

    fn cached(&self, key: &str) -> Option<String> {
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get(key) {
            if entry.created_at.elapsed() < CACHE_TTL {
                return Some(entry.summary.clone());
            }
        }
        // 过期条目在下次命中时清掉
        cache.remove(key);
        None
    }

    fn store(&self, key: String, summary: &str) {
        let mut cache = self.cache.lock();
        if cache.len() >= CACHE_MAX_ENTRIES {
            cache.retain(|_, entry| entry.created_at.elapsed() < CACHE_TTL);
        }
        // 清掉过期条目后仍满则整体清空
        if cache.len() >= CACHE_MAX_ENTRIES {
            cache.clear();
        }
        cache.insert(
            key,
            CachedSummary {
                summary: summary.to_string(),
                created_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct UnreachableLlm;

    #[async_trait]
    impl LlmServiceTrait for UnreachableLlm {
        async fn summarize(&self, _text: &str) -> Result<String> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    struct FixedLlm(&'static str);

    #[async_trait]
    impl LlmServiceTrait for FixedLlm {
        async fn summarize(&self, _text: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn engine(llm: Arc<dyn LlmServiceTrait>, strategy: SummaryStrategy) -> SummaryEngine {
        SummaryEngine::new(llm, strategy)
    }

    const LONG_TEXT: &str = "The first sentence covers the announcement in detail. \
        The second sentence describes the market reaction. \
        The third sentence adds analyst commentary.";

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "rss_first".parse::<SummaryStrategy>().unwrap(),
            SummaryStrategy::RssFirst
        );
        assert_eq!(
            "ai_generated".parse::<SummaryStrategy>().unwrap(),
            SummaryStrategy::AiGenerated
        );
        assert!("fancy".parse::<SummaryStrategy>().is_err());
    }

    #[tokio::test]
    async fn test_simple_is_idempotent() {
        let engine = engine(Arc::new(UnreachableLlm), SummaryStrategy::Simple);
        let input = SummaryInput {
            title: "Title",
            feed_summary: None,
            text: Some(LONG_TEXT),
        };

        let first = engine.summarize(input, None).await;
        let second = engine.summarize(input, None).await;
        assert_eq!(first, second);
        assert!(first.starts_with("The first sentence"));
    }

    #[tokio::test]
    async fn test_rss_first_prefers_feed_summary() {
        let engine = engine(Arc::new(UnreachableLlm), SummaryStrategy::RssFirst);
        let input = SummaryInput {
            title: "Title",
            feed_summary: Some("A feed-provided summary of the story."),
            text: Some(LONG_TEXT),
        };

        assert_eq!(
            engine.summarize(input, None).await,
            "A feed-provided summary of the story."
        );
    }

    #[tokio::test]
    async fn test_rss_first_falls_back_when_feed_summary_too_short() {
        let engine = engine(Arc::new(UnreachableLlm), SummaryStrategy::RssFirst);
        let input = SummaryInput {
            title: "Title",
            feed_summary: Some("short"),
            text: Some(LONG_TEXT),
        };

        let simple_input = SummaryInput {
            feed_summary: None,
            ..input
        };
        let expected = engine.summarize(simple_input, Some(SummaryStrategy::Simple)).await;
        assert_eq!(engine.summarize(input, None).await, expected);
    }

    #[tokio::test]
    async fn test_ai_unreachable_matches_simple_output() {
        let engine = engine(Arc::new(UnreachableLlm), SummaryStrategy::AiGenerated);
        let input = SummaryInput {
            title: "Title",
            feed_summary: None,
            text: Some(LONG_TEXT),
        };

        let ai = engine.summarize(input, None).await;
        let simple = engine.summarize(input, Some(SummaryStrategy::Simple)).await;
        assert_eq!(ai, simple);
    }

    #[tokio::test]
    async fn test_ai_uses_collaborator_when_available() {
        let engine = engine(
            Arc::new(FixedLlm("Model generated summary.")),
            SummaryStrategy::AiGenerated,
        );
        let input = SummaryInput {
            title: "Title",
            feed_summary: None,
            text: Some(LONG_TEXT),
        };

        assert_eq!(
            engine.summarize(input, None).await,
            "Model generated summary."
        );
    }

    #[tokio::test]
    async fn test_hybrid_prefers_long_feed_summary() {
        let engine = engine(
            Arc::new(FixedLlm("Model generated summary.")),
            SummaryStrategy::Hybrid,
        );
        let feed = "A feed summary that is comfortably longer than fifty characters total.";
        let input = SummaryInput {
            title: "Title",
            feed_summary: Some(feed),
            text: Some(LONG_TEXT),
        };

        assert_eq!(engine.summarize(input, None).await, feed);
    }

    #[tokio::test]
    async fn test_hybrid_uses_inference_for_short_feed_summary() {
        let engine = engine(
            Arc::new(FixedLlm("Model generated summary.")),
            SummaryStrategy::Hybrid,
        );
        let input = SummaryInput {
            title: "Title",
            feed_summary: Some("tiny"),
            text: Some(LONG_TEXT),
        };

        assert_eq!(
            engine.summarize(input, None).await,
            "Model generated summary."
        );
    }

    #[tokio::test]
    async fn test_cache_size_stays_bounded() {
        let engine = engine(Arc::new(UnreachableLlm), SummaryStrategy::Simple);

        for i in 0..(CACHE_MAX_ENTRIES + 16) {
            let title = format!("Distinct headline number {i}");
            let input = SummaryInput {
                title: &title,
                feed_summary: None,
                text: None,
            };
            engine.summarize(input, None).await;
        }

        assert!(engine.cache.lock().len() <= CACHE_MAX_ENTRIES);
    }

    #[tokio::test]
    async fn test_set_strategy_affects_subsequent_calls() {
        let engine = engine(Arc::new(UnreachableLlm), SummaryStrategy::RssFirst);
        let input = SummaryInput {
            title: "Title",
            feed_summary: Some("A feed-provided summary of the story."),
            text: Some(LONG_TEXT),
        };

        assert_eq!(
            engine.summarize(input, None).await,
            "A feed-provided summary of the story."
        );

        engine.set_strategy(SummaryStrategy::Simple);
        assert_eq!(engine.current_strategy(), SummaryStrategy::Simple);
        assert!(engine.summarize(input, None).await.starts_with("The first sentence"));
    }
}
