// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tokio::sync::watch;

/// 创建一对取消句柄和取消令牌
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// 取消句柄
///
/// 由任务管理器持有；句柄被丢弃时视为已取消，
/// 保证流水线不会脱离管理器存活
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// 发出取消信号
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// 派生一个新的取消令牌
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// 取消令牌
///
/// 流水线在每个挂起点协作式检查该令牌
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// 是否已被取消
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// 等待取消信号
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
