// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON file storage backends.
//!
//! Every write serializes the whole document, writes it to a temp file in
//! the same directory, and renames it over the target. Readers therefore see
//! either the old or the new document, never a torn one. Writers on the same
//! store are serialized by an async mutex so read-modify-write appends do
//! not lose updates. Nothing is cached: every read goes to disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bluecon_core::{
    BlueconError, NotificationInfoStorage, OAuthToken, OAuthTokenStorage, PushCredentials,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::retention::PersistentIdLog;

/// Reads and parses a JSON document. A missing file reads as `None`.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, BlueconError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(BlueconError::storage),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BlueconError::storage(e)),
    }
}

/// Serializes `value` and atomically replaces `path` with it.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BlueconError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(BlueconError::storage)?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || persist_atomically(&path, &bytes))
        .await
        .map_err(BlueconError::storage)?
}

fn persist_atomically(path: &Path, bytes: &[u8]) -> Result<(), BlueconError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(BlueconError::storage)?;

    // NamedTempFile is created owner-only (0600 on unix), which the rename keeps.
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(BlueconError::storage)?;
    tmp.write_all(bytes).map_err(BlueconError::storage)?;
    tmp.as_file().sync_all().map_err(BlueconError::storage)?;
    tmp.persist(path).map_err(|e| BlueconError::storage(e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "storage document written");
    Ok(())
}

/// OAuth token persisted as a JSON file.
#[derive(Debug)]
pub struct FileOAuthTokenStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileOAuthTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OAuthTokenStorage for FileOAuthTokenStorage {
    async fn retrieve_token(&self) -> Result<Option<OAuthToken>, BlueconError> {
        read_json(&self.path).await
    }

    async fn store_token(&self, token: &OAuthToken) -> Result<(), BlueconError> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.path, token).await
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NotificationDocument {
    #[serde(default)]
    credentials: Option<PushCredentials>,
    #[serde(default)]
    persistent_ids: PersistentIdLog,
}

/// Push credentials and the seen-id log persisted as one JSON file.
#[derive(Debug)]
pub struct FileNotificationInfoStorage {
    path: PathBuf,
    max_persistent_ids: Option<usize>,
    write_lock: Mutex<()>,
}

impl FileNotificationInfoStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_persistent_ids: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Keeps only the most recent `max` persistent ids (0 keeps everything).
    pub fn with_max_persistent_ids(mut self, max: usize) -> Self {
        self.max_persistent_ids = Some(max);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<NotificationDocument, BlueconError> {
        Ok(read_json(&self.path).await?.unwrap_or_default())
    }
}

#[async_trait]
impl NotificationInfoStorage for FileNotificationInfoStorage {
    async fn retrieve_credentials(&self) -> Result<Option<PushCredentials>, BlueconError> {
        Ok(self.load().await?.credentials)
    }

    async fn store_credentials(&self, credentials: &PushCredentials) -> Result<(), BlueconError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        doc.credentials = Some(credentials.clone());
        write_json(&self.path, &doc).await
    }

    async fn retrieve_persistent_ids(&self) -> Result<Vec<String>, BlueconError> {
        Ok(self.load().await?.persistent_ids.to_vec())
    }

    async fn store_persistent_id(&self, persistent_id: &str) -> Result<(), BlueconError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        if doc
            .persistent_ids
            .append(persistent_id, self.max_persistent_ids)
        {
            write_json(&self.path, &doc).await?;
        }
        Ok(())
    }

    async fn contains_persistent_id(&self, persistent_id: &str) -> Result<bool, BlueconError> {
        Ok(self.load().await?.persistent_ids.contains(persistent_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = FileOAuthTokenStorage::new(dir.path().join("token.json"));
        assert!(tokens.retrieve_token().await.unwrap().is_none());

        let info = FileNotificationInfoStorage::new(dir.path().join("push.json"));
        assert!(info.retrieve_credentials().await.unwrap().is_none());
        assert!(info.retrieve_persistent_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/token.json");
        let store = FileOAuthTokenStorage::new(&path);
        let token = OAuthToken {
            access_token: "a".into(),
            refresh_token: "r".into(),
            token_type: "bearer".into(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        store.store_token(&token).await.unwrap();
        assert!(path.exists());

        let reopened = FileOAuthTokenStorage::new(&path);
        assert_eq!(reopened.retrieve_token().await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn corrupt_document_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("push.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = FileNotificationInfoStorage::new(&path);
        let err = store.retrieve_persistent_ids().await.unwrap_err();
        assert!(matches!(err, BlueconError::Storage { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn written_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("push.json");
        let store = FileNotificationInfoStorage::new(&path);
        store.store_persistent_id("a").await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }
}
