// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscriber side of the notification pipeline.

use crate::notification::Notification;

/// Receives decoded notifications, at most once per persistent id.
///
/// Called synchronously from the listener thread, so implementations must
/// not block for long. Closures `Fn(Notification)` implement this trait.
pub trait NotificationHandler: Send + Sync + 'static {
    fn on_notification(&self, notification: Notification);
}

impl<F> NotificationHandler for F
where
    F: Fn(Notification) + Send + Sync + 'static,
{
    fn on_notification(&self, notification: Notification) {
        self(notification)
    }
}
