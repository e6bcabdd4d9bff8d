// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use rss::Channel;

use crate::domain::models::candidate::Candidate;
use crate::utils::text;

/// 解析RSS文档为候选条目序列
///
/// 缺少标题或链接的条目被丢弃；顺序保持feed文档内的顺序
pub fn parse_feed(body: &[u8], source_name: &str) -> Result<Vec<Candidate>, rss::Error> {
    let channel = Channel::read_from(body)?;

    let candidates = channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = text::clean_text(item.title()?);
            let url = item.link()?.trim().to_string();
            if title.is_empty() || url.is_empty() {
                return None;
            }

            let summary = item
                .description()
                .map(text::strip_html)
                .filter(|s| !s.is_empty());

            let tags = item
                .categories()
                .iter()
                .map(|c| c.name().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();

            Some(Candidate {
                title,
                url,
                published: item.pub_date().and_then(parse_published),
                summary,
                source: source_name.to_string(),
                tags,
            })
        })
        .collect();

    Ok(candidates)
}

/// 解析条目的发布时间
///
/// RSS规范是RFC 2822，个别源使用RFC 3339
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_xml(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>Test Feed</title>
<link>https://example.com</link>
<description>test</description>
{items}
</channel></rss>"#
        )
    }

    #[test]
    fn test_parse_full_item() {
        let xml = feed_xml(
            r#"<item>
<title>AI Chips Surge</title>
<link>https://example.com/story?id=1</link>
<description><![CDATA[<p>Chipmakers &amp; suppliers rallied.</p>]]></description>
<pubDate>Mon, 24 Aug 2026 09:30:00 GMT</pubDate>
<category>Markets</category>
<category>Technology</category>
</item>"#,
        );

        let candidates = parse_feed(xml.as_bytes(), "Bing News").unwrap();
        assert_eq!(candidates.len(), 1);

        let c = &candidates[0];
        assert_eq!(c.title, "AI Chips Surge");
        assert_eq!(c.url, "https://example.com/story?id=1");
        assert_eq!(c.summary.as_deref(), Some("Chipmakers & suppliers rallied."));
        assert_eq!(c.source, "Bing News");
        assert_eq!(c.tags, vec!["Markets", "Technology"]);
        assert!(c.published.is_some());
    }

    #[test]
    fn test_items_without_title_or_link_are_dropped() {
        let xml = feed_xml(
            r#"<item><title>No link here</title></item>
<item><link>https://example.com/no-title</link></item>
<item><title>Kept</title><link>https://example.com/kept</link></item>"#,
        );

        let candidates = parse_feed(xml.as_bytes(), "Test").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Kept");
    }

    #[test]
    fn test_unparseable_pub_date_is_none() {
        let xml = feed_xml(
            r#"<item>
<title>Odd date</title>
<link>https://example.com/a</link>
<pubDate>yesterday-ish</pubDate>
</item>"#,
        );

        let candidates = parse_feed(xml.as_bytes(), "Test").unwrap();
        assert!(candidates[0].published.is_none());
    }

    #[test]
    fn test_invalid_document_is_an_error() {
        assert!(parse_feed(b"this is not xml", "Test").is_err());
    }
}
