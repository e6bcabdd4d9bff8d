// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod article;
pub mod candidate;
pub mod crawl_task;
pub mod rss_source;
