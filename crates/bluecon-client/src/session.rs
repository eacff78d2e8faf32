// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session facade: authenticated vendor calls plus the notification
//! listener lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use bluecon_core::{
    AccessDoor, BlueconError, DeviceInfo, Notification, NotificationHandler, Pairing,
    PushProvider, User,
};
use secrecy::SecretString;
use tracing::{debug, info};

use crate::api::{FermaxApi, build_http_client, latest_photo_call};
use crate::listener::{Acknowledger, ListenerState, NotificationListener};
use crate::oauth::{OAuthService, TokenManager};
use crate::registrar::PushRegistrar;
use crate::settings::{ClientSettings, Storages};

/// Authenticated access to the vendor API, shared with the listener thread.
struct Authenticated {
    api: FermaxApi,
    tokens: Arc<TokenManager>,
}

impl Authenticated {
    async fn auth(&self) -> Result<String, BlueconError> {
        self.tokens.bearer_header().await
    }
}

#[async_trait]
impl Acknowledger for Authenticated {
    async fn acknowledge(&self, notification: &Notification) -> Result<bool, BlueconError> {
        let Some(message_id) = notification.ack_message_id() else {
            return Ok(false);
        };
        let auth = self.auth().await?;
        self.api.acknowledge(&auth, message_id).await
    }
}

/// Client for one vendor account.
///
/// Every request obtains a valid token first (refreshing it if needed) and
/// sends it as `Authorization: Bearer <access>`.
pub struct SessionClient {
    auth: Arc<Authenticated>,
    registrar: Option<Arc<PushRegistrar>>,
    listener: Option<NotificationListener>,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("base_url", &self.auth.api.base_url())
            .field("push", &self.registrar.is_some())
            .finish()
    }
}

impl SessionClient {
    /// Logs in with a password grant, stores the token, and builds the client.
    pub async fn login(
        settings: ClientSettings,
        username: &str,
        password: &SecretString,
        storages: Storages,
        provider: Arc<dyn PushProvider>,
        handler: Arc<dyn NotificationHandler>,
    ) -> Result<Self, BlueconError> {
        let client = Self::build(settings, storages, provider, handler)?;
        client.auth.tokens.login(username, password).await?;
        Ok(client)
    }

    /// Builds the client around a previously stored token.
    ///
    /// Fails with an authentication error if the token store is empty.
    pub async fn from_stored_token(
        settings: ClientSettings,
        storages: Storages,
        provider: Arc<dyn PushProvider>,
        handler: Arc<dyn NotificationHandler>,
    ) -> Result<Self, BlueconError> {
        let client = Self::build(settings, storages, provider, handler)?;
        if !client.auth.tokens.has_token().await? {
            return Err(BlueconError::Authentication {
                message: "not logged in".to_string(),
                source: None,
            });
        }
        Ok(client)
    }

    fn build(
        settings: ClientSettings,
        storages: Storages,
        provider: Arc<dyn PushProvider>,
        handler: Arc<dyn NotificationHandler>,
    ) -> Result<Self, BlueconError> {
        let http = build_http_client(settings.request_timeout)?;
        let oauth = OAuthService::new(
            http.clone(),
            settings.oauth_url.as_str(),
            &settings.client_id,
            &settings.client_secret,
        );
        let tokens = Arc::new(TokenManager::new(oauth, storages.tokens.clone()));
        let api = FermaxApi::new(http, settings.base_url.as_str());
        let auth = Arc::new(Authenticated {
            api: api.clone(),
            tokens: tokens.clone(),
        });

        let (registrar, listener) = match settings.push_app {
            Some(app) => {
                let registrar = Arc::new(PushRegistrar::new(
                    app,
                    provider.clone(),
                    storages.notifications.clone(),
                    api,
                    tokens,
                ));
                let listener = NotificationListener::new(
                    provider,
                    storages.notifications.clone(),
                    registrar.clone(),
                    auth.clone(),
                    handler,
                    settings.stop_timeout,
                );
                (Some(registrar), Some(listener))
            }
            None => {
                debug!("no push application configured, notifications unavailable");
                (None, None)
            }
        };

        Ok(Self {
            auth,
            registrar,
            listener,
        })
    }

    fn registrar(&self) -> Result<&PushRegistrar, BlueconError> {
        self.registrar.as_deref().ok_or_else(push_not_configured)
    }

    fn listener(&self) -> Result<&NotificationListener, BlueconError> {
        self.listener.as_ref().ok_or_else(push_not_configured)
    }

    pub async fn get_pairings(&self) -> Result<Vec<Pairing>, BlueconError> {
        let auth = self.auth.auth().await?;
        self.auth.api.pairings(&auth).await
    }

    pub async fn get_user_info(&self) -> Result<User, BlueconError> {
        let auth = self.auth.auth().await?;
        self.auth.api.user(&auth).await
    }

    /// Device telemetry, or `None` if the backend does not answer 2xx.
    pub async fn get_device_info(&self, device_id: &str) -> Result<Option<DeviceInfo>, BlueconError> {
        let auth = self.auth.auth().await?;
        self.auth.api.device_info(&auth, device_id).await
    }

    /// Opens `door` on `device_id`. Returns whether the backend answered 2xx.
    pub async fn open_door(&self, device_id: &str, door: &AccessDoor) -> Result<bool, BlueconError> {
        let auth = self.auth.auth().await?;
        let opened = self
            .auth
            .api
            .open_door(&auth, device_id, &door.access_id)
            .await?;
        info!(device_id, door = %door.title, opened, "open door requested");
        Ok(opened)
    }

    /// Sends the vendor acknowledgment. `Ok(false)` without a request for
    /// notifications that need none.
    pub async fn acknowledge_notification(
        &self,
        notification: &Notification,
    ) -> Result<bool, BlueconError> {
        self.auth.acknowledge(notification).await
    }

    /// Registers for push if needed, then marks the app token active or inactive.
    pub async fn register_app_token(&self, active: bool) -> Result<bool, BlueconError> {
        self.registrar()?.set_active(active).await
    }

    /// Photo of the most recent call on `device_id`, if any call has one.
    pub async fn get_last_picture(&self, device_id: &str) -> Result<Option<Vec<u8>>, BlueconError> {
        let app_token = self.registrar()?.register().await?.device_token;
        let auth = self.auth.auth().await?;
        let logs = self.auth.api.call_registry(&auth, &app_token).await?;

        let Some(photo_id) = latest_photo_call(&logs, device_id).and_then(|log| log.photo_id.clone())
        else {
            debug!(device_id, calls = logs.len(), "no call photo available");
            return Ok(None);
        };
        let auth = self.auth.auth().await?;
        self.auth.api.photo(&auth, &photo_id).await
    }

    pub async fn start_notification_listener(&self) -> Result<(), BlueconError> {
        self.listener()?.start().await
    }

    /// Returns `true` if the listener thread is still alive after the stop timeout.
    pub async fn stop_notification_listener(&self) -> bool {
        match &self.listener {
            Some(listener) => listener.stop().await,
            None => false,
        }
    }

    pub fn listener_state(&self) -> ListenerState {
        self.listener
            .as_ref()
            .map_or(ListenerState::Stopped, NotificationListener::state)
    }
}

fn push_not_configured() -> BlueconError {
    BlueconError::Config("push application settings are not configured".to_string())
}
