// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session core for the BlueCon intercom client.
//!
//! [`SessionClient`] is the entry point. It keeps an OAuth token valid
//! through [`TokenManager`], talks to the vendor API through [`FermaxApi`],
//! and runs a [`NotificationListener`] that delivers each call notification
//! exactly once to a [`NotificationHandler`](bluecon_core::NotificationHandler).

pub mod api;
pub mod handler;
pub mod listener;
pub mod oauth;
pub mod registrar;
pub mod session;
pub mod settings;

pub use api::FermaxApi;
pub use handler::ChannelNotificationHandler;
pub use listener::{Acknowledger, ListenerState, NotificationListener};
pub use oauth::{OAuthService, TokenManager};
pub use registrar::{PushRegistrar, package_cert};
pub use session::SessionClient;
pub use settings::{ClientSettings, Storages};
