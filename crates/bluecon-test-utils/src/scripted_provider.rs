// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push provider that replays a fixed script of messages.
//!
//! `listen` sends every scripted message in order, then idles until the
//! session is cancelled. A provider built with [`blocking_for`] instead
//! blocks its thread after the script, ignoring cancellation, to model a
//! connection that cannot be interrupted.
//!
//! [`blocking_for`]: ScriptedPushProvider::blocking_for

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bluecon_core::notification::NOTIFICATION_TYPE_FIELD;
use bluecon_core::{BlueconError, ListenSession, PushApp, PushCredentials, PushMessage, PushProvider};
use tracing::debug;

/// A `Call` data message for `device_id` at `door`.
pub fn call_message(persistent_id: &str, device_id: &str, door: &str) -> PushMessage {
    PushMessage {
        persistent_id: persistent_id.to_string(),
        message_id: format!("msg-{persistent_id}"),
        data: HashMap::from([
            (NOTIFICATION_TYPE_FIELD.to_string(), "Call".to_string()),
            ("DeviceId".to_string(), device_id.to_string()),
            ("AccessDoorKey".to_string(), door.to_string()),
        ]),
    }
}

/// A `CallEnd` data message for `device_id`.
pub fn call_end_message(persistent_id: &str, device_id: &str) -> PushMessage {
    PushMessage {
        persistent_id: persistent_id.to_string(),
        message_id: format!("msg-{persistent_id}"),
        data: HashMap::from([
            (NOTIFICATION_TYPE_FIELD.to_string(), "CallEnd".to_string()),
            ("DeviceId".to_string(), device_id.to_string()),
        ]),
    }
}

pub struct ScriptedPushProvider {
    script: Vec<PushMessage>,
    credentials: PushCredentials,
    block_for: Option<Duration>,
    register_delay: Option<Duration>,
    register_calls: AtomicUsize,
    listen_calls: AtomicUsize,
    seen_at_listen: Mutex<Vec<Vec<String>>>,
    package_certs: Mutex<Vec<String>>,
}

impl ScriptedPushProvider {
    pub fn new(script: Vec<PushMessage>) -> Self {
        Self {
            script,
            credentials: Self::default_credentials(),
            block_for: None,
            register_delay: None,
            register_calls: AtomicUsize::new(0),
            listen_calls: AtomicUsize::new(0),
            seen_at_listen: Mutex::new(Vec::new()),
            package_certs: Mutex::new(Vec::new()),
        }
    }

    pub fn default_credentials() -> PushCredentials {
        PushCredentials {
            device_token: "scripted-fcm-token".to_string(),
            android_id: 5_000_001,
            security_token: 9_000_002,
            installation_id: Some("scripted-fid".to_string()),
        }
    }

    /// After the script, block the listener thread for `duration` and
    /// ignore cancellation.
    pub fn blocking_for(mut self, duration: Duration) -> Self {
        self.block_for = Some(duration);
        self
    }

    /// Makes every `register` call take `delay` before answering.
    pub fn registering_after(mut self, delay: Duration) -> Self {
        self.register_delay = Some(delay);
        self
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn listen_calls(&self) -> usize {
        self.listen_calls.load(Ordering::SeqCst)
    }

    /// Seen ids handed to each `listen` call, in call order.
    pub fn seen_at_listen(&self) -> Vec<Vec<String>> {
        self.seen_at_listen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn package_certs(&self) -> Vec<String> {
        self.package_certs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait]
impl PushProvider for ScriptedPushProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn register(
        &self,
        _app: &PushApp,
        package_cert: &str,
    ) -> Result<PushCredentials, BlueconError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.register_delay {
            tokio::time::sleep(delay).await;
        }
        self.package_certs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(package_cert.to_string());
        Ok(self.credentials.clone())
    }

    async fn listen(&self, session: ListenSession) -> Result<(), BlueconError> {
        self.listen_calls.fetch_add(1, Ordering::SeqCst);
        let seen = session.seen_ids.retrieve_persistent_ids().await?;
        self.seen_at_listen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(seen);

        for message in &self.script {
            if session.sender.send(message.clone()).await.is_err() {
                return Ok(());
            }
        }
        debug!(messages = self.script.len(), "script delivered");

        if let Some(duration) = self.block_for {
            std::thread::sleep(duration);
            return Ok(());
        }

        session.cancel.cancelled().await;
        Ok(())
    }
}
