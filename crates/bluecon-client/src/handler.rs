// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridges the listener thread to async consumers.

use bluecon_core::{Notification, NotificationHandler};
use tokio::sync::mpsc;
use tracing::debug;

/// A [`NotificationHandler`] that forwards notifications into an unbounded
/// channel, so async code can `recv().await` them on its own runtime.
///
/// Sending never blocks the listener thread. Once the receiver is dropped,
/// notifications are discarded.
#[derive(Debug, Clone)]
pub struct ChannelNotificationHandler {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotificationHandler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationHandler for ChannelNotificationHandler {
    fn on_notification(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            debug!("notification receiver dropped, discarding notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluecon_core::CallEnded;

    #[tokio::test]
    async fn forwards_from_another_thread() {
        let (handler, mut receiver) = ChannelNotificationHandler::new();
        std::thread::spawn(move || {
            handler.on_notification(Notification::CallEnded(CallEnded {
                device_id: "dev-1".into(),
            }));
        })
        .join()
        .unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.device_id(), "dev-1");
        // Handler was dropped with the thread.
        assert!(receiver.recv().await.is_none());
    }

    #[test]
    fn dropped_receiver_is_not_an_error() {
        let (handler, receiver) = ChannelNotificationHandler::new();
        drop(receiver);
        handler.on_notification(Notification::CallEnded(CallEnded {
            device_id: String::new(),
        }));
    }
}
