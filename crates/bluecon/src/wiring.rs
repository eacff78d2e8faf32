// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the session client from loaded configuration.

use std::sync::Arc;
use std::time::Duration;

use bluecon_client::{ClientSettings, SessionClient, Storages};
use bluecon_config::BlueconConfig;
use bluecon_core::{BlueconError, NotificationHandler, PushProvider};
use bluecon_fcm::FcmPushProvider;
use bluecon_storage::{FileNotificationInfoStorage, FileOAuthTokenStorage};
use tracing::debug;

pub fn client_settings(config: &BlueconConfig) -> Result<ClientSettings, BlueconError> {
    let (Some(client_id), Some(client_secret)) =
        (&config.account.client_id, &config.account.client_secret)
    else {
        return Err(BlueconError::Config(
            "account.client_id and account.client_secret must be configured".to_string(),
        ));
    };

    let mut settings = ClientSettings::new(client_id, client_secret)
        .with_base_url(&config.api.base_url)
        .with_oauth_url(&config.api.oauth_url)
        .with_stop_timeout(Duration::from_secs(config.listener.stop_timeout_secs));
    settings.request_timeout = Duration::from_secs(config.api.request_timeout_secs);
    if let Some(app) = config.push.push_app() {
        settings = settings.with_push_app(app);
    }
    Ok(settings)
}

pub fn storages(config: &BlueconConfig) -> Storages {
    let tokens = FileOAuthTokenStorage::new(config.storage.token_path());
    let notifications = FileNotificationInfoStorage::new(config.storage.notifications_path())
        .with_max_persistent_ids(config.push.max_persistent_ids);
    debug!(
        data_dir = %config.storage.resolved_data_dir().display(),
        "using file storage"
    );
    Storages::new(Arc::new(tokens), Arc::new(notifications))
}

pub fn push_provider(config: &BlueconConfig) -> Result<Arc<dyn PushProvider>, BlueconError> {
    let provider = FcmPushProvider::new()?
        .with_heartbeat_interval(Duration::from_secs(config.push.heartbeat_interval_secs));
    Ok(Arc::new(provider))
}

/// Session built around the stored token.
pub async fn connect(
    config: &BlueconConfig,
    handler: Arc<dyn NotificationHandler>,
) -> Result<SessionClient, BlueconError> {
    SessionClient::from_stored_token(
        client_settings(config)?,
        storages(config),
        push_provider(config)?,
        handler,
    )
    .await
    .map_err(|e| match e {
        BlueconError::Authentication { message, source } => BlueconError::Authentication {
            message: format!("{message} (run `bluecon login` first)"),
            source,
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[account]
client_id = "cid"
client_secret = "secret"

[push]
sender_id = "1"
api_key = "k"
project_id = "p"
app_id = "a"
package_name = "com.fermax.blue.app"
max_persistent_ids = 5

[api]
base_url = "https://example.test"
request_timeout_secs = 7

[listener]
stop_timeout_secs = 3
"#;

    #[test]
    fn settings_follow_config() {
        let config = bluecon_config::load_and_validate_str(FULL).unwrap();
        let settings = client_settings(&config).unwrap();
        assert_eq!(settings.client_id, "cid");
        assert_eq!(settings.base_url, "https://example.test");
        assert_eq!(settings.request_timeout, Duration::from_secs(7));
        assert_eq!(settings.stop_timeout, Duration::from_secs(3));
        assert_eq!(
            settings.push_app.map(|a| a.package_name).as_deref(),
            Some("com.fermax.blue.app")
        );
    }

    #[test]
    fn missing_account_credentials_are_a_config_error() {
        let config = bluecon_config::load_and_validate_str("").unwrap();
        assert!(matches!(
            client_settings(&config),
            Err(BlueconError::Config(_))
        ));
    }

    #[tokio::test]
    async fn connect_without_token_suggests_login() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            "{FULL}\n[storage]\ndata_dir = \"{}\"\n",
            dir.path().display()
        );
        let config = bluecon_config::load_and_validate_str(&toml).unwrap();
        let handler: Arc<dyn NotificationHandler> = Arc::new(|_n: bluecon_core::Notification| {});
        let err = connect(&config, handler).await.unwrap_err();
        assert!(err.is_authentication());
        assert!(err.to_string().contains("bluecon login"));
    }
}
