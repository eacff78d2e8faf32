// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the BlueCon intercom client.
//!
//! This crate provides the error type, the data model, notification
//! decoding, and the capability traits (storage, push provider,
//! notification handler) shared by every other crate in the workspace.

pub mod error;
pub mod notification;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BlueconError;
pub use notification::{CallEnded, CallStarted, LifecycleSignal, Notification};
pub use types::{
    AccessDoor, AccessId, CallLog, DeviceInfo, OAuthToken, Pairing, PushApp, PushCredentials,
    SignalStrength, User,
};

pub use traits::{
    ListenSession, NotificationHandler, NotificationInfoStorage, OAuthTokenStorage, PushMessage,
    PushProvider,
};
