// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bluecon_core::{Notification, NotificationHandler};
use tokio::sync::Notify;

/// Records every delivered notification, in delivery order.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    received: Arc<Mutex<Vec<Notification>>>,
    notify: Arc<Notify>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn count(&self) -> usize {
        self.received.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Waits until at least `n` notifications arrived or `timeout` elapses.
    /// Returns whether the count was reached.
    pub async fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.count() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

impl NotificationHandler for RecordingHandler {
    fn on_notification(&self, notification: Notification) {
        self.received
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(notification);
        self.notify.notify_waiters();
    }
}
