// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NOISE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Advertisement|Subscribe|Newsletter").unwrap());

/// 清理并规范化文本
///
/// 折叠空白并去掉常见的页面噪声词
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let collapsed = WHITESPACE_RE.replace_all(text, " ");
    let cleaned = NOISE_RE.replace_all(&collapsed, "");
    cleaned.trim().to_string()
}

/// 去除HTML标签，返回纯文本
///
/// RSS源的描述字段经常携带HTML片段
pub fn strip_html(input: &str) -> String {
    if !input.contains('<') {
        return clean_text(&html_escape::decode_html_entities(input));
    }

    let fragment = Html::parse_fragment(input);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    clean_text(&text)
}

/// 提取式摘要：取前两句，不足时截断到200字符
pub fn leading_sentences(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let sentences: Vec<&str> = text.split(". ").collect();
    if sentences.len() >= 2 {
        return format!("{}. {}.", sentences[0], sentences[1].trim_end_matches('.'));
    }
    if !sentences[0].is_empty() && text.len() <= 200 {
        let s = sentences[0].trim_end_matches('.');
        return format!("{}.", s);
    }

    let prefix: String = text.chars().take(200).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("a\n\t  b   c"), "a b c");
    }

    #[test]
    fn test_clean_text_removes_noise() {
        assert_eq!(clean_text("Read more Advertisement here"), "Read more here");
        assert_eq!(clean_text("subscribe now"), "now");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Hello <b>world</b></p>"),
            "Hello world"
        );
        assert_eq!(strip_html("a &amp; b"), "a & b");
    }

    #[test]
    fn test_leading_sentences_two() {
        let text = "First sentence. Second sentence. Third sentence.";
        assert_eq!(leading_sentences(text), "First sentence. Second sentence.");
    }

    #[test]
    fn test_leading_sentences_single() {
        assert_eq!(leading_sentences("Only one sentence."), "Only one sentence.");
    }

    #[test]
    fn test_leading_sentences_truncates_long_text() {
        let text = "x".repeat(400);
        let summary = leading_sentences(&text);
        assert_eq!(summary.len(), 203);
        assert!(summary.ends_with("..."));
    }
}
