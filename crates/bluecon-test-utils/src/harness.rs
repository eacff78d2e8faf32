// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end session tests.
//!
//! `TestHarness` starts a wiremock server that plays the vendor backend and
//! the OAuth endpoint, seeds in-memory stores with a valid token, and builds
//! a [`SessionClient`] around a [`ScriptedPushProvider`] and a
//! [`RecordingHandler`].

use std::sync::Arc;
use std::time::Duration;

use bluecon_client::{ClientSettings, SessionClient, Storages};
use bluecon_core::{BlueconError, OAuthToken, PushApp, PushCredentials, PushMessage};
use bluecon_storage::{InMemoryNotificationInfoStorage, InMemoryOAuthTokenStorage};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::recording_handler::RecordingHandler;
use crate::scripted_provider::ScriptedPushProvider;

pub const ACK_PATH: &str = "/callmanager/api/v1/message/ack";
pub const APP_TOKEN_PATH: &str = "/notification/api/v1/apptoken";
pub const OAUTH_PATH: &str = "/oauth/token";

pub fn test_push_app() -> PushApp {
    PushApp {
        sender_id: "123456789".to_string(),
        api_key: "test-api-key".to_string(),
        project_id: "test-project".to_string(),
        app_id: "1:123456789:android:abc".to_string(),
        package_name: "com.example.intercom".to_string(),
    }
}

/// A token valid for another hour.
pub fn valid_token() -> OAuthToken {
    OAuthToken {
        access_token: "harness-access".to_string(),
        refresh_token: "harness-refresh".to_string(),
        token_type: "bearer".to_string(),
        expires_at: Utc::now() + ChronoDuration::hours(1),
    }
}

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    script: Vec<PushMessage>,
    block_for: Option<Duration>,
    register_delay: Option<Duration>,
    ack_status: u16,
    stop_timeout: Duration,
    credentials: Option<PushCredentials>,
    token: OAuthToken,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            script: Vec::new(),
            block_for: None,
            register_delay: None,
            ack_status: 200,
            stop_timeout: Duration::from_secs(5),
            credentials: None,
            token: valid_token(),
        }
    }

    /// Messages the push provider delivers, in order.
    pub fn with_messages(mut self, script: Vec<PushMessage>) -> Self {
        self.script = script;
        self
    }

    /// Makes the provider block its thread for `duration` after the script.
    pub fn with_blocking_provider(mut self, duration: Duration) -> Self {
        self.block_for = Some(duration);
        self
    }

    /// Slows down provider registration, stretching out `start()`.
    pub fn with_slow_registration(mut self, delay: Duration) -> Self {
        self.register_delay = Some(delay);
        self
    }

    /// Status the mock backend answers acknowledgments with.
    pub fn with_ack_status(mut self, status: u16) -> Self {
        self.ack_status = status;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Pre-registers push credentials, so no provider registration happens.
    pub fn with_stored_credentials(mut self, credentials: PushCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Seeds the token store with `token` instead of a valid one.
    pub fn with_token(mut self, token: OAuthToken) -> Self {
        self.token = token;
        self
    }

    pub async fn build(self) -> Result<TestHarness, BlueconError> {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ACK_PATH))
            .respond_with(ResponseTemplate::new(self.ack_status))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(APP_TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(OAUTH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "harness-refreshed",
                "refresh_token": "harness-refresh-2",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let mut provider = ScriptedPushProvider::new(self.script);
        if let Some(duration) = self.block_for {
            provider = provider.blocking_for(duration);
        }
        if let Some(delay) = self.register_delay {
            provider = provider.registering_after(delay);
        }
        let provider = Arc::new(provider);

        let tokens = Arc::new(InMemoryOAuthTokenStorage::with_token(self.token));
        let notifications = Arc::new(match self.credentials {
            Some(credentials) => InMemoryNotificationInfoStorage::with_credentials(credentials),
            None => InMemoryNotificationInfoStorage::new(),
        });
        let handler = RecordingHandler::new();

        let settings = ClientSettings::new("harness-client", "harness-secret")
            .with_base_url(server.uri())
            .with_oauth_url(format!("{}{OAUTH_PATH}", server.uri()))
            .with_stop_timeout(self.stop_timeout)
            .with_push_app(test_push_app());

        let client = SessionClient::from_stored_token(
            settings,
            Storages::new(tokens.clone(), notifications.clone()),
            provider.clone(),
            Arc::new(handler.clone()),
        )
        .await?;

        Ok(TestHarness {
            client,
            provider,
            handler,
            tokens,
            notifications,
            server,
        })
    }
}

/// A session client wired to a mock backend and a scripted push provider.
pub struct TestHarness {
    pub client: SessionClient,
    pub provider: Arc<ScriptedPushProvider>,
    pub handler: RecordingHandler,
    pub tokens: Arc<InMemoryOAuthTokenStorage>,
    pub notifications: Arc<InMemoryNotificationInfoStorage>,
    /// Mock vendor backend; mount extra mocks on it for endpoint tests.
    pub server: MockServer,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Requests that reached `path` on the mock backend.
    pub async fn requests_to(&self, path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }
}
