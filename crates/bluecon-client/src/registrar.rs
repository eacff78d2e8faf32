// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push endpoint registration.

use std::sync::Arc;

use bluecon_core::{
    BlueconError, NotificationInfoStorage, PushApp, PushCredentials, PushProvider,
};
use sha2::{Digest, Sha512};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::api::FermaxApi;
use crate::oauth::TokenManager;

/// Package certificate presented to the push provider: lowercase hex
/// SHA-512 over sender id, app id, API key, project id, and package name.
pub fn package_cert(app: &PushApp) -> String {
    let mut sha = Sha512::new();
    for part in [
        &app.sender_id,
        &app.app_id,
        &app.api_key,
        &app.project_id,
        &app.package_name,
    ] {
        sha.update(part.as_bytes());
    }
    hex::encode(sha.finalize())
}

/// Registers this installation with the push provider once and with the
/// vendor backend on demand.
pub struct PushRegistrar {
    app: PushApp,
    provider: Arc<dyn PushProvider>,
    storage: Arc<dyn NotificationInfoStorage>,
    api: FermaxApi,
    tokens: Arc<TokenManager>,
    register_lock: Mutex<()>,
}

impl PushRegistrar {
    pub fn new(
        app: PushApp,
        provider: Arc<dyn PushProvider>,
        storage: Arc<dyn NotificationInfoStorage>,
        api: FermaxApi,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            app,
            provider,
            storage,
            api,
            tokens,
            register_lock: Mutex::new(()),
        }
    }

    /// Returns the stored credentials, registering with the provider first
    /// if none exist yet. Stored credentials are never replaced here.
    pub async fn register(&self) -> Result<PushCredentials, BlueconError> {
        self.ensure_registered().await.map(|(credentials, _)| credentials)
    }

    /// Like [`register`](Self::register), and also reports whether this call
    /// performed the provider registration.
    pub async fn ensure_registered(&self) -> Result<(PushCredentials, bool), BlueconError> {
        if let Some(credentials) = self.storage.retrieve_credentials().await? {
            debug!("reusing stored push credentials");
            return Ok((credentials, false));
        }

        let _guard = self.register_lock.lock().await;
        if let Some(credentials) = self.storage.retrieve_credentials().await? {
            return Ok((credentials, false));
        }

        let cert = package_cert(&self.app);
        let credentials = self.provider.register(&self.app, &cert).await?;
        self.storage.store_credentials(&credentials).await?;
        info!(
            provider = self.provider.name(),
            android_id = credentials.android_id,
            "registered push endpoint"
        );
        Ok((credentials, true))
    }

    /// Marks the registered token active or inactive at the vendor backend.
    /// Returns whether the backend answered 2xx.
    pub async fn set_active(&self, active: bool) -> Result<bool, BlueconError> {
        let credentials = self.register().await?;
        let auth = self.tokens.bearer_header().await?;
        let accepted = self
            .api
            .set_app_token(&auth, &credentials.device_token, active)
            .await?;
        info!(active, accepted, "app token registration sent");
        Ok(accepted)
    }
}
