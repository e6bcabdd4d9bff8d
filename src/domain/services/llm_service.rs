// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::settings::SummarySettings;

/// 推理服务特质
///
/// ai_generated策略委托的外部协作方边界
#[async_trait]
pub trait LlmServiceTrait: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

/// LLM服务 - 处理与推理服务提供商的交互
///
/// # 配置
///
/// 通过 `summary` 配置节提供：
/// - `api_key` - API密钥，缺省时调用直接报错
/// - `model` - 使用的模型名称
/// - `api_base_url` - API基础URL
pub struct LlmService {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base_url: String,
    max_input_chars: usize,
}

impl LlmService {
    pub fn new(client: reqwest::Client, settings: &SummarySettings) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            api_base_url: settings.api_base_url.clone(),
            max_input_chars: settings.max_input_chars,
        }
    }
}

#[async_trait]
impl LlmServiceTrait for LlmService {
    /// 为一段文章正文生成摘要
    ///
    /// # 错误
    /// * 当API密钥未配置时返回错误
    /// * 当推理服务调用失败或响应格式无效时返回错误
    async fn summarize(&self, text: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Summary API key not configured"))?;

        let truncated: String = text.chars().take(self.max_input_chars).collect();

        let request_body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a news summarization assistant. \
                        Summarize the article in 2-3 concise sentences. \
                        Output only the summary text."
                },
                {
                    "role": "user",
                    "content": truncated
                }
            ],
            "temperature": 0.3
        });

        let url = format!("{}/chat/completions", self.api_base_url);
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request_body)
            .send()
            .await
            .context("Failed to send request to summary API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Summary API returned error: {} - {}",
                status,
                error_text
            ));
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse summary API response")?;

        match body["choices"][0]["message"]["content"].as_str() {
            Some(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
            _ => Err(anyhow::anyhow!("Invalid response format from summary API")),
        }
    }
}
