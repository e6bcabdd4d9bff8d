// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use url::Url;

/// 从URL中剥离的跟踪参数
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "ref", "ocid"];

static TITLE_PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// 规范化URL
///
/// 统一协议和主机的大小写，剥离跟踪参数和片段；
/// 无法解析的URL原样返回（去首尾空白）
pub fn canonicalize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.trim().to_string();
    };

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            !k.starts_with("utm_") && !TRACKING_PARAMS.contains(&k.as_ref())
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let mut canonical = url.to_string();
    if canonical.ends_with('/') && url.path() == "/" && url.query().is_none() {
        canonical.pop();
    }
    canonical
}

/// 规范化标题：小写、去标点、折叠空白
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = TITLE_PUNCT_RE.replace_all(&lowered, " ");
    WHITESPACE_RE.replace_all(&stripped, " ").trim().to_string()
}

/// 计算候选条目的内容指纹
///
/// SHA-256(规范化URL + "\n" + 规范化标题)
pub fn fingerprint(url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonicalize_url(url).as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_title(title).as_bytes());
    hex::encode(hasher.finalize())
}

/// 任务内去重器
///
/// 检查并登记必须是一次原子操作，
/// 同一任务的并发候选不会重复通过
#[derive(Default)]
pub struct Deduplicator {
    seen: Mutex<HashSet<String>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记指纹；首次见到返回true
    pub fn check_and_insert(&self, fingerprint: &str) -> bool {
        self.seen.lock().insert(fingerprint.to_string())
    }

    /// 已登记的指纹数
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_strips_tracking_params() {
        assert_eq!(
            canonicalize_url(
                "HTTPS://Example.com/News/story?utm_source=x&id=7&fbclid=abc#comments"
            ),
            "https://example.com/News/story?id=7"
        );
    }

    #[test]
    fn test_canonicalize_drops_empty_query_and_root_slash() {
        assert_eq!(
            canonicalize_url("https://example.com/?utm_medium=feed"),
            "https://example.com"
        );
    }

    #[test]
    fn test_canonicalize_unparseable_url_passthrough() {
        assert_eq!(canonicalize_url("  not a url  "), "not a url");
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("  Nvidia's  Q3: Record \"AI\" Revenue!  "),
            "nvidia s q3 record ai revenue"
        );
    }

    #[test]
    fn test_fingerprint_ignores_tracking_noise() {
        let a = fingerprint("https://example.com/story?utm_source=bing", "AI Chips Surge");
        let b = fingerprint("https://example.com/story", "ai chips surge!");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_differs_for_different_stories() {
        let a = fingerprint("https://example.com/story-1", "AI Chips Surge");
        let b = fingerprint("https://example.com/story-2", "AI Chips Surge");
        assert_ne!(a, b);
    }

    #[test]
    fn test_check_and_insert_is_first_wins() {
        let dedup = Deduplicator::new();
        let fp = fingerprint("https://example.com/a", "Title");

        assert!(dedup.check_and_insert(&fp));
        assert!(!dedup.check_and_insert(&fp));
        assert_eq!(dedup.len(), 1);
    }
}
