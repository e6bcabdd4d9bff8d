// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use parking_lot::Mutex;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use url::Url;

const ROBOTS_CACHE_TTL: Duration = Duration::from_secs(3600);
const ROBOTS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// 缓存的robots.txt内容
#[derive(Clone)]
struct CachedRobots {
    content: String,
    expires_at: Instant,
}

/// Robots.txt检查器
///
/// 按主机缓存robots.txt内容，抓取失败时默认放行
pub struct RobotsChecker {
    client: Client,
    memory_cache: Mutex<HashMap<String, CachedRobots>>,
    user_agent: String,
}

impl RobotsChecker {
    /// 创建新的Robots检查器实例
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            memory_cache: Mutex::new(HashMap::new()),
            user_agent: user_agent.into(),
        }
    }

    /// 检查URL是否被允许访问
    pub async fn is_allowed(&self, url_str: &str) -> Result<bool> {
        let content = self.get_robots_content(url_str).await?;
        let mut matcher = DefaultMatcher::default();
        Ok(matcher.one_agent_allowed_by_robots(&content, &self.user_agent, url_str))
    }

    /// 获取robots.txt内容（带缓存）
    async fn get_robots_content(&self, url_str: &str) -> Result<String> {
        let url = Url::parse(url_str)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid URL: {}", url_str))?;
        let robots_url = match url.port() {
            Some(port) => format!("{}://{}:{}/robots.txt", url.scheme(), host, port),
            None => format!("{}://{}/robots.txt", url.scheme(), host),
        };

        {
            let mut cache = self.memory_cache.lock();
            if let Some(cached) = cache.get(&robots_url) {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.content.clone());
                }
                cache.remove(&robots_url);
            }
        }

        let response = self
            .client
            .get(&robots_url)
            .header("User-Agent", &self.user_agent)
            .timeout(ROBOTS_FETCH_TIMEOUT)
            .send()
            .await;

        let content = match response {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            Ok(_) => {
                // 404或其他非成功状态视为无robots.txt
                String::new()
            }
            Err(e) => {
                tracing::warn!("Failed to fetch robots.txt from {}: {}", robots_url, e);
                String::new()
            }
        };

        let mut cache = self.memory_cache.lock();
        cache.insert(
            robots_url,
            CachedRobots {
                content: content.clone(),
                expires_at: Instant::now() + ROBOTS_CACHE_TTL,
            },
        );

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_disallowed_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private/\n"),
            )
            .mount(&server)
            .await;

        let checker = RobotsChecker::new(Client::new(), "newscrawlrs-bot/1.0");
        let blocked = format!("{}/private/page", server.uri());
        let open = format!("{}/news/page", server.uri());

        assert!(!checker.is_allowed(&blocked).await.unwrap());
        assert!(checker.is_allowed(&open).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let checker = RobotsChecker::new(Client::new(), "newscrawlrs-bot/1.0");
        let url = format!("{}/anything", server.uri());
        assert!(checker.is_allowed(&url).await.unwrap());
    }

    #[tokio::test]
    async fn test_robots_content_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
            .expect(1)
            .mount(&server)
            .await;

        let checker = RobotsChecker::new(Client::new(), "newscrawlrs-bot/1.0");
        let url = format!("{}/a", server.uri());

        assert!(checker.is_allowed(&url).await.unwrap());
        assert!(checker.is_allowed(&url).await.unwrap());
    }
}
