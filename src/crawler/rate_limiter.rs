// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use std::time::Duration;
use url::Url;

/// 按主机限速器
///
/// 进程级共享状态：同一主机的请求间隔跨任务生效。
/// 间隔为零时不限速。
pub struct HostRateLimiter {
    limiter: Option<RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>,
}

impl HostRateLimiter {
    /// 创建限速器，per_host_delay为同一主机两次请求的最小间隔
    pub fn new(per_host_delay: Duration) -> Self {
        Self {
            limiter: Quota::with_period(per_host_delay).map(RateLimiter::keyed),
        }
    }

    /// 等待直到允许向该URL的主机发起请求
    ///
    /// 无法解析出主机名的URL不占用任何配额
    pub async fn acquire(&self, url: &str) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        let Some(host) = host_of(url) else {
            return;
        };
        limiter.until_key_ready(&host).await;
    }
}

/// 提取URL的主机名（小写）
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://News.Example.com/rss?q=a"),
            Some("news.example.com".to_string())
        );
        assert_eq!(host_of("not a url"), None);
    }

    #[tokio::test]
    async fn test_same_host_requests_are_spaced() {
        // governor使用自带时钟，这里用真实的短间隔测量
        let limiter = HostRateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();

        limiter.acquire("https://example.com/a").await;
        limiter.acquire("https://example.com/b").await;

        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_different_hosts_do_not_wait() {
        let limiter = HostRateLimiter::new(Duration::from_millis(200));
        let start = Instant::now();

        limiter.acquire("https://a.example.com/feed").await;
        limiter.acquire("https://b.example.com/feed").await;

        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_zero_interval_disables_limiting() {
        let limiter = HostRateLimiter::new(Duration::ZERO);
        let start = Instant::now();

        for _ in 0..10 {
            limiter.acquire("https://example.com/x").await;
        }

        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
