// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 候选条目
///
/// 从RSS源抓取到、尚未去重和充实的规范化条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// 标题
    pub title: String,
    /// 原始链接
    pub url: String,
    /// 发布时间（可选）
    pub published: Option<DateTime<Utc>>,
    /// RSS源提供的摘要（可选）
    pub summary: Option<String>,
    /// 来源名称
    pub source: String,
    /// 条目携带的分类标签
    pub tags: Vec<String>,
}

impl Candidate {
    /// 候选条目是否与查询相关
    ///
    /// 标题或源摘要至少包含一个查询词
    pub fn is_relevant(&self, query: &str) -> bool {
        let haystack = format!(
            "{} {}",
            self.title.to_lowercase(),
            self.summary.as_deref().unwrap_or("").to_lowercase()
        );

        query
            .to_lowercase()
            .split_whitespace()
            .any(|word| haystack.split(|c: char| !c.is_alphanumeric()).any(|w| w == word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, summary: Option<&str>) -> Candidate {
        Candidate {
            title: title.to_string(),
            url: "https://example.com/a".to_string(),
            published: None,
            summary: summary.map(|s| s.to_string()),
            source: "Test".to_string(),
            tags: vec![],
        }
    }

    #[test]
    fn test_relevant_when_title_matches() {
        let c = candidate("New AI chips announced", None);
        assert!(c.is_relevant("AI chips"));
    }

    #[test]
    fn test_relevant_when_only_summary_matches() {
        let c = candidate("Market roundup", Some("Chips rallied on AI demand"));
        assert!(c.is_relevant("chips"));
    }

    #[test]
    fn test_irrelevant_candidate() {
        let c = candidate("Weather forecast", Some("Sunny all week"));
        assert!(!c.is_relevant("AI chips"));
    }
}
