// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod article_repository;
pub mod source_repository;
pub mod task_repository;

pub use article_repository::ArticleRepository;
pub use source_repository::SourceRepository;
pub use task_repository::{RepositoryError, TaskRepository};
