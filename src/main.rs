// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use newscrawlrs::config::settings::Settings;
use newscrawlrs::domain::models::crawl_task::TaskStatus;
use newscrawlrs::infrastructure::repositories::{
    InMemoryArticleRepository, InMemorySourceRepository, InMemoryTaskRepository,
};
use newscrawlrs::tasks::{CreateTaskRequest, TaskManager};
use newscrawlrs::utils::telemetry;
use std::sync::Arc;
use tracing::info;

/// 主函数
///
/// 从命令行参数读取一次性采集任务，执行并打印结果
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting newscrawlrs...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    // 3. Assemble repositories and seed the default source catalogue
    let tasks = Arc::new(InMemoryTaskRepository::new());
    let articles = Arc::new(InMemoryArticleRepository::new());
    let sources = Arc::new(InMemorySourceRepository::new());
    sources.seed_defaults();

    let manager = TaskManager::new(&settings, tasks, articles, sources)?;

    // 4. Build the task request from the command line
    let mut args = std::env::args().skip(1);
    let Some(query) = args.next() else {
        eprintln!("Usage: newscrawlrs <query> [limit]");
        std::process::exit(2);
    };
    let mut request = CreateTaskRequest::new(query);
    if let Some(limit) = args.next() {
        request = request.with_limit(limit.parse()?);
    }

    // 5. Run the task and stream progress to the log
    let mut progress = manager.subscribe();
    let task = manager.create(request).await?;
    info!(task_id = %task.id, "Task created");

    while let Some(event) = progress.recv().await {
        info!(
            progress = event.progress,
            processed = event.processed_articles,
            total = event.total_articles,
            status = %event.status,
            "Progress update"
        );
        if matches!(event.status, TaskStatus::Completed | TaskStatus::Failed) {
            break;
        }
    }

    // 6. Print the collected articles
    let task = manager.get(task.id).await?;
    if task.status == TaskStatus::Failed {
        anyhow::bail!(
            "Task failed: {}",
            task.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    let collected = manager.articles_for_task(task.id).await?;
    println!("{}", serde_json::to_string_pretty(&collected)?);
    Ok(())
}
