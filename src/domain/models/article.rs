// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::candidate::Candidate;

/// 文章实体
///
/// 每个任务内指纹唯一；除显式重新生成摘要外不可变更
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// 文章唯一标识符
    pub id: Uuid,
    /// 所属任务ID
    pub task_id: Uuid,
    /// 标题
    pub title: String,
    /// 来源名称
    pub source: String,
    /// 规范化URL
    pub url: String,
    /// 发布时间（可选）
    pub published: Option<DateTime<Utc>>,
    /// 摘要（可选）
    pub summary: Option<String>,
    /// 提取的正文（可选）
    pub text: Option<String>,
    /// 标签列表
    pub tags: Vec<String>,
    /// 内容指纹，写入后不再变更
    pub fingerprint: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// 从候选条目构建文章
    pub fn from_candidate(
        task_id: Uuid,
        candidate: &Candidate,
        text: Option<String>,
        fingerprint: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            title: candidate.title.clone(),
            source: candidate.source.clone(),
            url: candidate.url.clone(),
            published: candidate.published,
            summary: None,
            text,
            tags: candidate.tags.clone(),
            fingerprint,
            created_at: Utc::now(),
        }
    }
}
