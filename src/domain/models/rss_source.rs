// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use url::Url;

/// 查询占位符
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// RSS源配置
///
/// 核心只读消费；生命周期由外部协作方管理
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssSourceConfig {
    /// 源名称，唯一
    pub name: String,
    /// URL模板，可包含 {query} 占位符
    pub url_template: String,
    /// 是否支持查询参数
    pub supports_query: bool,
    /// 优先级，数值越大越先抓取
    pub priority: i32,
    /// 是否启用
    pub is_active: bool,
}

/// 解析完成、可直接抓取的源
#[derive(Debug, Clone)]
pub struct ResolvedFeed {
    /// 来源名称
    pub source: String,
    /// 最终抓取URL
    pub url: String,
}

impl RssSourceConfig {
    /// 将查询代入模板，得到可抓取的URL
    ///
    /// 支持查询的模板必须包含占位符才会被代入；
    /// 带占位符但未声明支持查询的模板不会被使用
    pub fn resolve(&self, query: &str) -> Option<ResolvedFeed> {
        let has_placeholder = self.url_template.contains(QUERY_PLACEHOLDER);
        let url = if self.supports_query {
            if !has_placeholder {
                return None;
            }
            self.url_template
                .replace(QUERY_PLACEHOLDER, &urlencoding::encode(query))
        } else {
            if has_placeholder {
                return None;
            }
            self.url_template.clone()
        };

        Some(ResolvedFeed {
            source: self.name.clone(),
            url,
        })
    }

    /// 从自定义源URL构建配置
    ///
    /// 名称取URL的主机名；包含占位符的模板视为支持查询
    pub fn from_custom_url(template: &str, priority: i32) -> Self {
        let supports_query = template.contains(QUERY_PLACEHOLDER);
        let name = Url::parse(&template.replace(QUERY_PLACEHOLDER, "q"))
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| template.to_string());

        Self {
            name,
            url_template: template.to_string(),
            supports_query,
            priority,
            is_active: true,
        }
    }
}

/// 默认RSS源目录
///
/// 优先级按降序排列：支持查询的源先于通用市场源
pub fn default_sources() -> Vec<RssSourceConfig> {
    vec![
        RssSourceConfig {
            name: "Bing News".to_string(),
            url_template: "https://www.bing.com/news/search?q={query}&format=rss".to_string(),
            supports_query: true,
            priority: 5,
            is_active: true,
        },
        RssSourceConfig {
            name: "Google News".to_string(),
            url_template: "https://news.google.com/rss/search?q={query}".to_string(),
            supports_query: true,
            priority: 4,
            is_active: true,
        },
        RssSourceConfig {
            name: "Wall Street Journal".to_string(),
            url_template: "https://feeds.a.dj.com/rss/RSSMarketsMain.xml".to_string(),
            supports_query: false,
            priority: 3,
            is_active: true,
        },
        RssSourceConfig {
            name: "Reuters".to_string(),
            url_template: "https://www.reuters.com/markets/rss".to_string(),
            supports_query: false,
            priority: 2,
            is_active: true,
        },
        RssSourceConfig {
            name: "Nasdaq".to_string(),
            url_template: "https://www.nasdaq.com/feed/rssoutbound?category=markets".to_string(),
            supports_query: false,
            priority: 1,
            is_active: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_substitutes_encoded_query() {
        let source = RssSourceConfig {
            name: "Bing News".to_string(),
            url_template: "https://www.bing.com/news/search?q={query}&format=rss".to_string(),
            supports_query: true,
            priority: 5,
            is_active: true,
        };

        let feed = source.resolve("AI chips").unwrap();
        assert_eq!(
            feed.url,
            "https://www.bing.com/news/search?q=AI%20chips&format=rss"
        );
    }

    #[test]
    fn test_resolve_general_feed_ignores_query() {
        let source = RssSourceConfig {
            name: "Reuters".to_string(),
            url_template: "https://www.reuters.com/markets/rss".to_string(),
            supports_query: false,
            priority: 2,
            is_active: true,
        };

        let feed = source.resolve("AI chips").unwrap();
        assert_eq!(feed.url, "https://www.reuters.com/markets/rss");
    }

    #[test]
    fn test_resolve_rejects_query_source_without_placeholder() {
        let source = RssSourceConfig {
            name: "Broken".to_string(),
            url_template: "https://example.com/rss".to_string(),
            supports_query: true,
            priority: 1,
            is_active: true,
        };

        assert!(source.resolve("q").is_none());
    }

    #[test]
    fn test_from_custom_url() {
        let source = RssSourceConfig::from_custom_url("https://example.org/feed?q={query}", 7);
        assert_eq!(source.name, "example.org");
        assert!(source.supports_query);
        assert_eq!(source.priority, 7);
        assert!(source.is_active);
    }

    #[test]
    fn test_default_sources_descending_priority() {
        let sources = default_sources();
        assert_eq!(sources.len(), 5);
        for pair in sources.windows(2) {
            assert!(pair[0].priority > pair[1].priority);
        }
    }
}
