// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` so a typo in
//! `bluecon.toml` is reported instead of silently ignored.

use std::path::PathBuf;

use bluecon_core::PushApp;
use serde::{Deserialize, Serialize};

/// Top-level BlueCon configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BlueconConfig {
    /// Vendor account credentials.
    #[serde(default)]
    pub account: AccountConfig,

    /// Push application identity and listener tuning.
    #[serde(default)]
    pub push: PushConfig,

    /// Vendor API endpoints.
    #[serde(default)]
    pub api: ApiConfig,

    /// Where tokens and push state are persisted.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification listener lifecycle settings.
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// OAuth client and user identity.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    /// OAuth client id issued for the mobile app.
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret paired with `client_id`.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Account user name (e-mail). The password is never stored.
    #[serde(default)]
    pub username: Option<String>,
}

/// Push application identity. All five identity fields must be set
/// together for the notification listener to be available.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    #[serde(default)]
    pub sender_id: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub app_id: Option<String>,

    #[serde(default)]
    pub package_name: Option<String>,

    /// Seconds between heartbeat pings on the push connection.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Number of seen persistent ids to retain. 0 keeps all of them.
    #[serde(default = "default_max_persistent_ids")]
    pub max_persistent_ids: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            sender_id: None,
            api_key: None,
            project_id: None,
            app_id: None,
            package_name: None,
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            max_persistent_ids: default_max_persistent_ids(),
        }
    }
}

impl PushConfig {
    fn identity_fields(&self) -> [(&'static str, Option<&String>); 5] {
        [
            ("sender_id", self.sender_id.as_ref()),
            ("api_key", self.api_key.as_ref()),
            ("project_id", self.project_id.as_ref()),
            ("app_id", self.app_id.as_ref()),
            ("package_name", self.package_name.as_ref()),
        ]
    }

    /// Names of identity fields that are unset or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.identity_fields()
            .into_iter()
            .filter(|(_, value)| value.is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| name)
            .collect()
    }

    /// The push application, if every identity field is configured.
    pub fn push_app(&self) -> Option<PushApp> {
        if !self.missing_fields().is_empty() {
            return None;
        }
        Some(PushApp {
            sender_id: self.sender_id.clone()?,
            api_key: self.api_key.clone()?,
            project_id: self.project_id.clone()?,
            app_id: self.app_id.clone()?,
            package_name: self.package_name.clone()?,
        })
    }
}

fn default_heartbeat_interval_secs() -> u64 {
    300
}

fn default_max_persistent_ids() -> usize {
    10_000
}

/// Vendor HTTP endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_oauth_url")]
    pub oauth_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            oauth_url: default_oauth_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://blue.fermax.io".to_string()
}

fn default_oauth_url() -> String {
    "https://oauth.blue.fermax.com/oauth/token".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Persistence locations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory for `token.json` and `notifications.json`. Defaults to
    /// the platform data directory.
    #[serde(default)]
    pub data_dir: Option<String>,
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|p| p.join("bluecon"))
                .unwrap_or_else(|| PathBuf::from(".bluecon")),
        }
    }

    pub fn token_path(&self) -> PathBuf {
        self.resolved_data_dir().join("token.json")
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.resolved_data_dir().join("notifications.json")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ListenerConfig {
    /// How long `stop` waits for the listener thread before giving up.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

fn default_stop_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level for the `bluecon` crates (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
