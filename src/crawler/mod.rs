// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod deduplicator;
pub mod extractor;
pub mod feed_fetcher;
pub mod feed_parser;
pub mod rate_limiter;

pub use deduplicator::Deduplicator;
pub use extractor::ArticleExtractor;
pub use feed_fetcher::{FeedFetcher, FetchError, SourceOutcome};
pub use rate_limiter::HostRateLimiter;
