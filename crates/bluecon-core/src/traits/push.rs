// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push-delivery provider trait (registration + persistent listen connection).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::BlueconError;
use crate::traits::storage::NotificationInfoStorage;
use crate::types::{PushApp, PushCredentials};

/// One data message delivered by the provider, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    /// Provider-assigned id used for deduplication.
    pub persistent_id: String,
    /// Message id the vendor expects in acknowledgments.
    pub message_id: String,
    /// Key/value payload of the data message.
    pub data: HashMap<String, String>,
}

/// Everything a provider needs to run one listen session.
pub struct ListenSession {
    pub credentials: PushCredentials,
    /// Source of already-seen persistent ids, re-read on every (re)connect.
    pub seen_ids: Arc<dyn NotificationInfoStorage>,
    /// Ordered hand-off of received messages to the listener loop.
    pub sender: mpsc::Sender<PushMessage>,
    /// Cancelled when the listener is asked to stop.
    pub cancel: CancellationToken,
}

/// A push-delivery provider such as Firebase Cloud Messaging.
#[async_trait]
pub trait PushProvider: Send + Sync + 'static {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    /// Registers this installation as a push endpoint and returns the new
    /// credentials. `package_cert` identifies the impersonated app package.
    async fn register(
        &self,
        app: &PushApp,
        package_cert: &str,
    ) -> Result<PushCredentials, BlueconError>;

    /// Runs the persistent connection until `session.cancel` fires or the
    /// receiving side of `session.sender` is dropped.
    ///
    /// This call blocks for the lifetime of the connection and is only ever
    /// driven from the listener's dedicated thread.
    async fn listen(&self, session: ListenSession) -> Result<(), BlueconError>;
}
