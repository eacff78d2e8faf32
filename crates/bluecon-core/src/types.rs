// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model shared by the session core, the storage backends, and the
//! push provider.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Seconds before the real expiry at which a token is already treated as expired.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth2 token pair issued by the vendor's authorization server.
///
/// Tokens are replaced wholesale when refreshed; nothing mutates one in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl OAuthToken {
    /// Builds a token from a grant response received at `issued_at`.
    pub fn from_grant(
        access_token: String,
        refresh_token: String,
        token_type: String,
        expires_in_secs: i64,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type,
            expires_at: issued_at + Duration::seconds(expires_in_secs),
        }
    }

    /// Whether the token must be refreshed before being attached to a request.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Expiry check against an explicit clock, including the safety margin.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) >= self.expires_at
    }

    /// Value for the `Authorization` header.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Push-delivery credentials created once per installation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushCredentials {
    /// FCM registration token, registered with the vendor as the app token.
    pub device_token: String,
    /// Android checkin identity used to log in to the push connection.
    pub android_id: u64,
    pub security_token: u64,
    /// Firebase installation id the token was issued for.
    #[serde(default)]
    pub installation_id: Option<String>,
}

impl std::fmt::Debug for PushCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushCredentials")
            .field("device_token", &"[REDACTED]")
            .field("android_id", &self.android_id)
            .field("security_token", &"[REDACTED]")
            .field("installation_id", &self.installation_id)
            .finish()
    }
}

/// The Firebase application the client impersonates when registering for push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushApp {
    pub sender_id: String,
    pub api_key: String,
    pub project_id: String,
    pub app_id: String,
    pub package_name: String,
}

/// A door actuator reachable through a paired device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDoor {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "accessId")]
    pub access_id: AccessId,
    #[serde(default)]
    pub visible: bool,
}

/// Block/subblock/number address of an access door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessId {
    pub block: i64,
    pub subblock: i64,
    pub number: i64,
}

/// A user's registered intercom device association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pairing {
    pub id: String,
    pub device_id: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "accessDoorMap")]
    pub access_doors: BTreeMap<String, AccessDoor>,
    #[serde(default)]
    pub master: bool,
}

/// Live telemetry snapshot of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_id: String,
    #[serde(default)]
    pub connection_state: String,
    #[serde(default)]
    pub family: String,
    #[serde(default, rename = "type")]
    pub device_type: String,
    #[serde(default, rename = "subtype", alias = "subType")]
    pub sub_type: String,
    #[serde(default, rename = "photocaller", alias = "photoCaller")]
    pub photo_caller: bool,
    #[serde(default)]
    pub wireless_signal: Option<i64>,
}

impl DeviceInfo {
    /// Connection state reported by the vendor for an online device.
    pub const CONNECTED: &'static str = "Connected";

    pub fn is_connected(&self) -> bool {
        self.connection_state == Self::CONNECTED
    }

    pub fn signal_strength(&self) -> SignalStrength {
        SignalStrength::from_level(self.wireless_signal)
    }

    /// Human readable model string, e.g. `VEO-XS WIFI MONITOR`.
    pub fn model(&self) -> String {
        format!("{} {} {}", self.device_type, self.sub_type, self.family)
    }
}

/// Wireless signal quality buckets as reported in `wirelessSignal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Terrible,
    Bad,
    Weak,
    Good,
    Excellent,
    Unknown,
}

impl SignalStrength {
    pub fn from_level(level: Option<i64>) -> Self {
        match level {
            Some(0) => Self::Terrible,
            Some(1) => Self::Bad,
            Some(2) => Self::Weak,
            Some(3) => Self::Good,
            Some(4) => Self::Excellent,
            _ => Self::Unknown,
        }
    }
}

/// The account owner as returned by `users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(default)]
    pub locale: Option<String>,
}

/// One entry of the call registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLog {
    #[serde(default)]
    pub call_id: Option<String>,
    pub device_id: String,
    #[serde(default)]
    pub photo_id: Option<String>,
    pub call_date: String,
}

impl CallLog {
    /// Parses `call_date`, accepting RFC 3339 and the `+0100` offset form.
    pub fn parsed_call_date(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.call_date)
            .or_else(|_| DateTime::parse_from_str(&self.call_date, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .ok()
    }
}
