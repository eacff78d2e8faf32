// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits injected into the session client.
//!
//! Storage backends, the push-delivery provider, and the notification
//! handler are all trait objects so callers can substitute their own.

pub mod handler;
pub mod push;
pub mod storage;

pub use handler::NotificationHandler;
pub use push::{ListenSession, PushMessage, PushProvider};
pub use storage::{NotificationInfoStorage, OAuthTokenStorage};
