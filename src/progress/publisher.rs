// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::domain::models::crawl_task::{CrawlTask, TaskStatus};

/// 进度事件
///
/// 每处理完一个候选条目广播一次
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// 事件类型，固定为 progress_update
    #[serde(rename = "type")]
    pub event_type: &'static str,
    /// 任务ID
    pub task_id: Uuid,
    /// 进度百分比 (0-100)
    pub progress: u8,
    /// 任务状态
    pub status: TaskStatus,
    /// 已处理的候选条目数
    pub processed_articles: u32,
    /// 纳入处理的候选条目总数
    pub total_articles: u32,
}

impl ProgressEvent {
    /// 从任务当前状态构建事件
    pub fn from_task(task: &CrawlTask) -> Self {
        Self {
            event_type: "progress_update",
            task_id: task.id,
            progress: task.progress,
            status: task.status,
            processed_articles: task.processed_articles,
            total_articles: task.total_articles,
        }
    }
}

/// 进度发布器
///
/// 进程级观察者注册表。投递尽力而为：
/// 通道满时丢弃事件，已断开的观察者在发布时剔除
pub struct ProgressPublisher {
    observers: Mutex<Vec<mpsc::Sender<ProgressEvent>>>,
    channel_capacity: usize,
}

impl ProgressPublisher {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// 注册一个新观察者
    ///
    /// 新观察者不会收到历史事件
    pub fn subscribe(&self) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        self.observers.lock().push(tx);
        rx
    }

    /// 向所有观察者广播事件
    ///
    /// 绝不阻塞流水线
    pub fn publish(&self, event: ProgressEvent) {
        self.observers.lock().retain(|tx| {
            match tx.try_send(event.clone()) {
                Ok(()) => true,
                // 慢观察者丢事件但保留连接
                Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Closed(_)) => false,
            }
        });
    }

    /// 当前注册的观察者数
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(task: &CrawlTask) -> ProgressEvent {
        ProgressEvent::from_task(task)
    }

    #[tokio::test]
    async fn test_broadcast_to_all_observers() {
        let publisher = ProgressPublisher::new(8);
        let mut rx1 = publisher.subscribe();
        let mut rx2 = publisher.subscribe();

        let task = CrawlTask::new("q".to_string(), None, 10, None);
        publisher.publish(event(&task));

        assert_eq!(rx1.recv().await.unwrap().task_id, task.id);
        assert_eq!(rx2.recv().await.unwrap().task_id, task.id);
    }

    #[tokio::test]
    async fn test_full_channel_drops_events_without_blocking() {
        let publisher = ProgressPublisher::new(1);
        let mut rx = publisher.subscribe();

        let task = CrawlTask::new("q".to_string(), None, 10, None);
        publisher.publish(event(&task));
        publisher.publish(event(&task));
        publisher.publish(event(&task));

        // 只有第一个事件被投递，观察者仍然在册
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
        assert_eq!(publisher.observer_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnected_observer_is_pruned() {
        let publisher = ProgressPublisher::new(8);
        let rx = publisher.subscribe();
        drop(rx);

        let task = CrawlTask::new("q".to_string(), None, 10, None);
        publisher.publish(event(&task));
        assert_eq!(publisher.observer_count(), 0);
    }

    #[test]
    fn test_event_wire_format() {
        let task = CrawlTask::new("q".to_string(), None, 10, None);
        let json = serde_json::to_value(event(&task)).unwrap();

        assert_eq!(json["type"], "progress_update");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["progress"], 0);
        assert_eq!(json["processed_articles"], 0);
        assert_eq!(json["total_articles"], 0);
    }
}
