// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::models::article::Article;
use crate::domain::models::crawl_task::{CrawlTask, TaskStatus};
use crate::domain::models::rss_source::RssSourceConfig;
use crate::domain::repositories::article_repository::ArticleRepository;
use crate::domain::repositories::source_repository::SourceRepository;
use crate::domain::repositories::task_repository::{RepositoryError, TaskRepository};

/// 内存任务仓库
///
/// 进程内持久化网关；存储格式由外部协作方决定，
/// 核心只通过仓库特质访问
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: DashMap<Uuid, CrawlTask>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &CrawlTask) -> Result<CrawlTask, RepositoryError> {
        if self.tasks.contains_key(&task.id) {
            return Err(RepositoryError::AlreadyExists);
        }
        self.tasks.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CrawlTask>, RepositoryError> {
        Ok(self.tasks.get(&id).map(|t| t.clone()))
    }

    async fn update(&self, task: &CrawlTask) -> Result<CrawlTask, RepositoryError> {
        if !self.tasks.contains_key(&task.id) {
            return Err(RepositoryError::NotFound);
        }
        self.tasks.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<CrawlTask>, RepositoryError> {
        let mut tasks: Vec<CrawlTask> = self
            .tasks
            .iter()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .map(|t| t.clone())
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

/// 内存文章仓库
#[derive(Default)]
pub struct InMemoryArticleRepository {
    articles: DashMap<Uuid, Article>,
}

impl InMemoryArticleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleRepository for InMemoryArticleRepository {
    async fn save(&self, article: &Article) -> Result<Article, RepositoryError> {
        // 指纹唯一性由流水线在写入前保证，这里只做最后防线
        let duplicate = self.articles.iter().any(|a| {
            a.task_id == article.task_id && a.fingerprint == article.fingerprint
        });
        if duplicate {
            return Err(RepositoryError::AlreadyExists);
        }
        self.articles.insert(article.id, article.clone());
        Ok(article.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>, RepositoryError> {
        Ok(self.articles.get(&id).map(|a| a.clone()))
    }

    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Article>, RepositoryError> {
        let mut articles: Vec<Article> = self
            .articles
            .iter()
            .filter(|a| a.task_id == task_id)
            .map(|a| a.clone())
            .collect();
        articles.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(articles)
    }

    async fn exists_fingerprint(
        &self,
        task_id: Uuid,
        fingerprint: &str,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .articles
            .iter()
            .any(|a| a.task_id == task_id && a.fingerprint == fingerprint))
    }

    async fn count_by_task(&self, task_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(self.articles.iter().filter(|a| a.task_id == task_id).count() as u64)
    }

    async fn update_summary(&self, id: Uuid, summary: String) -> Result<(), RepositoryError> {
        match self.articles.get_mut(&id) {
            Some(mut article) => {
                article.summary = Some(summary);
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete_by_task(&self, task_id: Uuid) -> Result<u64, RepositoryError> {
        let ids: Vec<Uuid> = self
            .articles
            .iter()
            .filter(|a| a.task_id == task_id)
            .map(|a| a.id)
            .collect();
        let removed = ids.len() as u64;
        for id in ids {
            self.articles.remove(&id);
        }
        Ok(removed)
    }
}

/// 内存RSS源仓库
#[derive(Default)]
pub struct InMemorySourceRepository {
    sources: RwLock<Vec<RssSourceConfig>>,
}

impl InMemorySourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用默认源目录初始化（仅在为空时）
    pub fn seed_defaults(&self) {
        let mut sources = self.sources.write();
        if sources.is_empty() {
            *sources = crate::domain::models::rss_source::default_sources();
        }
    }
}

#[async_trait]
impl SourceRepository for InMemorySourceRepository {
    async fn list_active(&self) -> Result<Vec<RssSourceConfig>, RepositoryError> {
        let mut active: Vec<RssSourceConfig> = self
            .sources
            .read()
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(active)
    }

    async fn list_all(&self) -> Result<Vec<RssSourceConfig>, RepositoryError> {
        Ok(self.sources.read().clone())
    }

    async fn upsert(&self, source: &RssSourceConfig) -> Result<(), RepositoryError> {
        let mut sources = self.sources.write();
        match sources.iter_mut().find(|s| s.name == source.name) {
            Some(existing) => *existing = source.clone(),
            None => sources.push(source.clone()),
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), RepositoryError> {
        let mut sources = self.sources.write();
        let before = sources.len();
        sources.retain(|s| s.name != name);
        if sources.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
