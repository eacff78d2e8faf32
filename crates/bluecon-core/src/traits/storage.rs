// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits for the OAuth token and the push-notification state.

use async_trait::async_trait;

use crate::error::BlueconError;
use crate::types::{OAuthToken, PushCredentials};

/// Holds at most one OAuth token.
#[async_trait]
pub trait OAuthTokenStorage: Send + Sync + 'static {
    /// Returns the stored token, if any.
    async fn retrieve_token(&self) -> Result<Option<OAuthToken>, BlueconError>;

    /// Replaces the stored token.
    async fn store_token(&self, token: &OAuthToken) -> Result<(), BlueconError>;
}

/// Push registration credentials plus the log of seen persistent ids.
///
/// Every store/append call is a complete unit: a reader never observes a
/// partially written record.
#[async_trait]
pub trait NotificationInfoStorage: Send + Sync + 'static {
    /// Returns the single credential record, if registration already happened.
    async fn retrieve_credentials(&self) -> Result<Option<PushCredentials>, BlueconError>;

    /// Stores (or replaces, on forced re-registration) the credential record.
    async fn store_credentials(&self, credentials: &PushCredentials) -> Result<(), BlueconError>;

    /// Returns every retained persistent id, oldest first.
    async fn retrieve_persistent_ids(&self) -> Result<Vec<String>, BlueconError>;

    /// Appends a persistent id to the log.
    async fn store_persistent_id(&self, persistent_id: &str) -> Result<(), BlueconError>;

    /// Membership check against the full log.
    async fn contains_persistent_id(&self, persistent_id: &str) -> Result<bool, BlueconError> {
        Ok(self
            .retrieve_persistent_ids()
            .await?
            .iter()
            .any(|id| id == persistent_id))
    }
}
