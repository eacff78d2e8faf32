// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the BlueCon client.

use thiserror::Error;

/// Boxed error source carried by the wrapping variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across all BlueCon traits and operations.
#[derive(Debug, Error)]
pub enum BlueconError {
    /// Configuration errors (missing credentials, invalid header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Token exchange or refresh failed. Never retried internally.
    #[error("authentication error: {message}")]
    Authentication {
        message: String,
        source: Option<BoxError>,
    },

    /// HTTP or network failure on a vendor or provider request.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<BoxError>,
    },

    /// A push payload could not be decoded into a notification.
    #[error("decode error: {0}")]
    Decode(String),

    /// Persistence backend failure (I/O, serialization).
    #[error("storage error: {source}")]
    Storage { source: BoxError },

    /// Push-provider registration failed (checkin, installation, register).
    #[error("push registration error: {message}")]
    Registration {
        message: String,
        source: Option<BoxError>,
    },

    /// Listener lifecycle misuse or failure of the listener thread.
    #[error("listener error: {0}")]
    Listener(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },
}

impl BlueconError {
    /// Wraps a `reqwest`-style failure as a [`BlueconError::Transport`].
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wraps a persistence failure as a [`BlueconError::Storage`].
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// Returns true for errors raised by the OAuth layer.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
