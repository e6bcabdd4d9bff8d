// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含爬取、摘要和进度广播等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 爬取配置
    pub crawler: CrawlerSettings,
    /// 摘要配置
    pub summary: SummarySettings,
    /// 进度广播配置
    pub progress: ProgressSettings,
}

/// 爬取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// 最大并发抓取数
    pub max_concurrent_fetches: usize,
    /// 正文提取并发工作者数
    pub extract_workers: usize,
    /// 同一主机两次请求的最小间隔（毫秒）
    pub per_host_delay_ms: u64,
    /// 单次请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 瞬态网络故障的最大重试次数
    pub max_retries: u32,
    /// 请求使用的User-Agent
    pub user_agent: String,
    /// 视为有效正文的最小字符数
    pub min_content_length: usize,
}

impl CrawlerSettings {
    /// 单次请求的超时时长
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 同一主机的最小请求间隔
    pub fn per_host_delay(&self) -> Duration {
        Duration::from_millis(self.per_host_delay_ms)
    }
}

/// 摘要配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SummarySettings {
    /// 默认摘要策略 (rss_first, ai_generated, hybrid, simple)
    pub default_strategy: String,
    /// 推理服务API基础URL
    pub api_base_url: String,
    /// 推理服务模型名称
    pub model: String,
    /// 推理服务API密钥（缺省时ai_generated策略回退到simple）
    pub api_key: Option<String>,
    /// 送入推理服务的最大字符数
    pub max_input_chars: usize,
}

/// 进度广播配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressSettings {
    /// 每个观察者的事件通道容量
    pub channel_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            crawler: CrawlerSettings {
                max_concurrent_fetches: 4,
                extract_workers: 4,
                per_host_delay_ms: 1000,
                request_timeout_secs: 30,
                max_retries: 3,
                user_agent: "newscrawlrs-bot/1.0".to_string(),
                min_content_length: 200,
            },
            summary: SummarySettings {
                default_strategy: "rss_first".to_string(),
                api_base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                api_key: None,
                max_input_chars: 10000,
            },
            progress: ProgressSettings {
                channel_capacity: 64,
            },
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件和环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("crawler.max_concurrent_fetches", 4i64)?
            .set_default("crawler.extract_workers", 4i64)?
            .set_default("crawler.per_host_delay_ms", 1000i64)?
            .set_default("crawler.request_timeout_secs", 30i64)?
            .set_default("crawler.max_retries", 3i64)?
            .set_default("crawler.user_agent", "newscrawlrs-bot/1.0")?
            .set_default("crawler.min_content_length", 200i64)?
            .set_default("summary.default_strategy", "rss_first")?
            .set_default("summary.api_base_url", "https://api.openai.com/v1")?
            .set_default("summary.model", "gpt-3.5-turbo")?
            .set_default("summary.max_input_chars", 10000i64)?
            .set_default("progress.channel_capacity", 64i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("NEWSCRAWL").separator("__"))
            .build()?
            .try_deserialize()
    }
}
