// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage backends. State is lost when the process exits.

use async_trait::async_trait;
use bluecon_core::{
    BlueconError, NotificationInfoStorage, OAuthToken, OAuthTokenStorage, PushCredentials,
};
use tokio::sync::RwLock;

use crate::retention::PersistentIdLog;

/// Token storage held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryOAuthTokenStorage {
    token: RwLock<Option<OAuthToken>>,
}

impl InMemoryOAuthTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `token`.
    pub fn with_token(token: OAuthToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

#[async_trait]
impl OAuthTokenStorage for InMemoryOAuthTokenStorage {
    async fn retrieve_token(&self) -> Result<Option<OAuthToken>, BlueconError> {
        Ok(self.token.read().await.clone())
    }

    async fn store_token(&self, token: &OAuthToken) -> Result<(), BlueconError> {
        *self.token.write().await = Some(token.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct NotificationState {
    credentials: Option<PushCredentials>,
    persistent_ids: PersistentIdLog,
}

/// Push credentials and seen ids held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryNotificationInfoStorage {
    state: RwLock<NotificationState>,
    max_persistent_ids: Option<usize>,
}

impl InMemoryNotificationInfoStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only the most recent `max` persistent ids.
    pub fn with_max_persistent_ids(mut self, max: usize) -> Self {
        self.max_persistent_ids = Some(max);
        self
    }

    /// Creates a store that already holds registration credentials.
    pub fn with_credentials(credentials: PushCredentials) -> Self {
        Self {
            state: RwLock::new(NotificationState {
                credentials: Some(credentials),
                persistent_ids: PersistentIdLog::new(),
            }),
            max_persistent_ids: None,
        }
    }
}

#[async_trait]
impl NotificationInfoStorage for InMemoryNotificationInfoStorage {
    async fn retrieve_credentials(&self) -> Result<Option<PushCredentials>, BlueconError> {
        Ok(self.state.read().await.credentials.clone())
    }

    async fn store_credentials(&self, credentials: &PushCredentials) -> Result<(), BlueconError> {
        self.state.write().await.credentials = Some(credentials.clone());
        Ok(())
    }

    async fn retrieve_persistent_ids(&self) -> Result<Vec<String>, BlueconError> {
        Ok(self.state.read().await.persistent_ids.to_vec())
    }

    async fn store_persistent_id(&self, persistent_id: &str) -> Result<(), BlueconError> {
        let max = self.max_persistent_ids;
        self.state
            .write()
            .await
            .persistent_ids
            .append(persistent_id, max);
        Ok(())
    }

    async fn contains_persistent_id(&self, persistent_id: &str) -> Result<bool, BlueconError> {
        Ok(self.state.read().await.persistent_ids.contains(persistent_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn token(access: &str) -> OAuthToken {
        OAuthToken {
            access_token: access.into(),
            refresh_token: "r".into(),
            token_type: "bearer".into(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn token_store_replaces_token() {
        let store = InMemoryOAuthTokenStorage::new();
        assert!(store.retrieve_token().await.unwrap().is_none());
        store.store_token(&token("one")).await.unwrap();
        store.store_token(&token("two")).await.unwrap();
        let stored = store.retrieve_token().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "two");
    }

    #[tokio::test]
    async fn notification_store_keeps_one_credential_record() {
        let store = InMemoryNotificationInfoStorage::new();
        let creds = PushCredentials {
            device_token: "tok".into(),
            android_id: 1,
            security_token: 2,
            installation_id: None,
        };
        store.store_credentials(&creds).await.unwrap();
        assert_eq!(store.retrieve_credentials().await.unwrap(), Some(creds));
    }

    #[tokio::test]
    async fn persistent_ids_are_appended_in_order() {
        let store = InMemoryNotificationInfoStorage::new().with_max_persistent_ids(2);
        for id in ["a", "b", "a", "c"] {
            store.store_persistent_id(id).await.unwrap();
        }
        assert_eq!(store.retrieve_persistent_ids().await.unwrap(), vec!["b", "c"]);
        assert!(store.contains_persistent_id("c").await.unwrap());
        assert!(!store.contains_persistent_id("a").await.unwrap());
    }
}
