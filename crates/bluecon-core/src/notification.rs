// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed call notifications decoded from push payloads.
//!
//! The vendor tags every data message with `FermaxNotificationType`. Known
//! tags map onto [`Notification`] variants; any other tag is a
//! [`BlueconError::Decode`], never a silent drop.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::BlueconError;

/// Name of the discriminator field in push payloads.
pub const NOTIFICATION_TYPE_FIELD: &str = "FermaxNotificationType";

/// Wire shape of the payloads we understand.
#[derive(Debug, Deserialize)]
#[serde(tag = "FermaxNotificationType")]
enum NotificationPayload {
    #[serde(rename = "Call")]
    Call {
        #[serde(rename = "DeviceId")]
        device_id: String,
        #[serde(rename = "AccessDoorKey")]
        access_door_key: String,
    },
    #[serde(rename = "CallEnd")]
    CallEnd {
        #[serde(rename = "DeviceId", default)]
        device_id: String,
    },
}

/// An incoming call at a door panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStarted {
    pub device_id: String,
    /// Key of the access door in the pairing's door map (e.g. `ZERO`).
    pub access_door_key: String,
    /// Push message id, echoed back when acknowledging.
    pub message_id: String,
}

/// The call on a device ended. `device_id` is empty if the payload omitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEnded {
    pub device_id: String,
}

/// A decoded push notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    CallStarted(CallStarted),
    CallEnded(CallEnded),
}

/// The signal the entity layer reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleSignal {
    CallStarted {
        device_id: String,
        access_door_id: String,
    },
    CallEnded {
        device_id: String,
    },
}

impl Notification {
    /// Decodes the string key/value payload of a push data message.
    pub fn decode(data: &HashMap<String, String>, message_id: &str) -> Result<Self, BlueconError> {
        let value = serde_json::to_value(data)
            .map_err(|e| BlueconError::Decode(format!("unserializable payload: {e}")))?;
        Self::from_value(value, message_id)
    }

    /// Decodes a JSON payload object.
    pub fn from_value(value: serde_json::Value, message_id: &str) -> Result<Self, BlueconError> {
        let payload: NotificationPayload = serde_json::from_value(value)
            .map_err(|e| BlueconError::Decode(format!("unrecognized notification: {e}")))?;

        Ok(match payload {
            NotificationPayload::Call {
                device_id,
                access_door_key,
            } => Notification::CallStarted(CallStarted {
                device_id,
                access_door_key,
                message_id: message_id.to_string(),
            }),
            NotificationPayload::CallEnd { device_id } => {
                Notification::CallEnded(CallEnded { device_id })
            }
        })
    }

    /// Whether the vendor expects an acknowledgment for this notification.
    pub fn requires_ack(&self) -> bool {
        matches!(self, Notification::CallStarted(_))
    }

    /// Message id to acknowledge, for notifications that require it.
    pub fn ack_message_id(&self) -> Option<&str> {
        match self {
            Notification::CallStarted(call) => Some(&call.message_id),
            Notification::CallEnded(_) => None,
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            Notification::CallStarted(call) => &call.device_id,
            Notification::CallEnded(end) => &end.device_id,
        }
    }

    pub fn signal(&self) -> LifecycleSignal {
        match self {
            Notification::CallStarted(call) => LifecycleSignal::CallStarted {
                device_id: call.device_id.clone(),
                access_door_id: call.access_door_key.clone(),
            },
            Notification::CallEnded(end) => LifecycleSignal::CallEnded {
                device_id: end.device_id.clone(),
            },
        }
    }
}
