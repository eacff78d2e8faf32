// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Construction inputs for [`SessionClient`](crate::SessionClient).

use std::sync::Arc;
use std::time::Duration;

use bluecon_core::{NotificationInfoStorage, OAuthTokenStorage, PushApp};

pub const DEFAULT_BASE_URL: &str = "https://blue.fermax.io";
pub const DEFAULT_OAUTH_URL: &str = "https://oauth.blue.fermax.com/oauth/token";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Account, endpoint, and push identity settings.
#[derive(Clone)]
pub struct ClientSettings {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub oauth_url: String,
    pub request_timeout: Duration,
    /// Upper bound on how long stopping the listener waits for its thread.
    pub stop_timeout: Duration,
    /// Required only for the notification listener and app-token registration.
    pub push_app: Option<PushApp>,
}

impl ClientSettings {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            push_app: None,
        }
    }

    pub fn with_push_app(mut self, app: PushApp) -> Self {
        self.push_app = Some(app);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_oauth_url(mut self, url: impl Into<String>) -> Self {
        self.oauth_url = url.into();
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("oauth_url", &self.oauth_url)
            .field("request_timeout", &self.request_timeout)
            .field("stop_timeout", &self.stop_timeout)
            .field("push_app", &self.push_app.as_ref().map(|a| &a.project_id))
            .finish()
    }
}

/// The pluggable persistence the session core writes to.
#[derive(Clone)]
pub struct Storages {
    pub tokens: Arc<dyn OAuthTokenStorage>,
    pub notifications: Arc<dyn NotificationInfoStorage>,
}

impl Storages {
    pub fn new(
        tokens: Arc<dyn OAuthTokenStorage>,
        notifications: Arc<dyn NotificationInfoStorage>,
    ) -> Self {
        Self {
            tokens,
            notifications,
        }
    }
}
