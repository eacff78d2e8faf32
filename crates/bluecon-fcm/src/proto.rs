// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protocol buffer messages for Android checkin and the MCS connection.
//!
//! Only the fields this client reads or writes are declared; prost skips
//! unknown fields when decoding.

use prost::Message;

// ---- checkin ----

#[derive(Clone, PartialEq, Message)]
pub struct ChromeBuildProto {
    #[prost(int32, optional, tag = "1")]
    pub platform: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub chrome_version: Option<String>,
    #[prost(int32, optional, tag = "3")]
    pub channel: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AndroidCheckinProto {
    #[prost(int64, optional, tag = "2")]
    pub last_checkin_msec: Option<i64>,
    #[prost(int32, optional, tag = "12")]
    pub r#type: Option<i32>,
    #[prost(message, optional, tag = "13")]
    pub chrome_build: Option<ChromeBuildProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AndroidCheckinRequest {
    #[prost(int64, optional, tag = "2")]
    pub id: Option<i64>,
    #[prost(message, optional, tag = "4")]
    pub checkin: Option<AndroidCheckinProto>,
    #[prost(fixed64, optional, tag = "13")]
    pub security_token: Option<u64>,
    #[prost(int32, optional, tag = "14")]
    pub version: Option<i32>,
    #[prost(int32, optional, tag = "22")]
    pub user_serial_number: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AndroidCheckinResponse {
    #[prost(bool, optional, tag = "1")]
    pub stats_ok: Option<bool>,
    #[prost(int64, optional, tag = "3")]
    pub time_msec: Option<i64>,
    #[prost(fixed64, optional, tag = "7")]
    pub android_id: Option<u64>,
    #[prost(fixed64, optional, tag = "8")]
    pub security_token: Option<u64>,
}

// ---- MCS ----

#[derive(Clone, PartialEq, Message)]
pub struct HeartbeatPing {
    #[prost(int32, optional, tag = "1")]
    pub stream_id: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub last_stream_id_received: Option<i32>,
    #[prost(int64, optional, tag = "3")]
    pub status: Option<i64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct HeartbeatAck {
    #[prost(int32, optional, tag = "1")]
    pub stream_id: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub last_stream_id_received: Option<i32>,
    #[prost(int64, optional, tag = "3")]
    pub status: Option<i64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ErrorInfo {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, optional, tag = "2")]
    pub message: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub r#type: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Setting {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct LoginRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub domain: String,
    #[prost(string, tag = "3")]
    pub user: String,
    #[prost(string, tag = "4")]
    pub resource: String,
    #[prost(string, tag = "5")]
    pub auth_token: String,
    #[prost(string, optional, tag = "6")]
    pub device_id: Option<String>,
    #[prost(message, repeated, tag = "8")]
    pub setting: Vec<Setting>,
    #[prost(string, repeated, tag = "10")]
    pub received_persistent_id: Vec<String>,
    #[prost(bool, optional, tag = "12")]
    pub adaptive_heartbeat: Option<bool>,
    #[prost(bool, optional, tag = "14")]
    pub use_rmq2: Option<bool>,
    #[prost(int64, optional, tag = "15")]
    pub account_id: Option<i64>,
    /// `2` selects Android-id authentication.
    #[prost(int32, optional, tag = "16")]
    pub auth_service: Option<i32>,
    #[prost(int32, optional, tag = "17")]
    pub network_type: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct LoginResponse {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, optional, tag = "2")]
    pub jid: Option<String>,
    #[prost(message, optional, tag = "3")]
    pub error: Option<ErrorInfo>,
    #[prost(message, repeated, tag = "4")]
    pub setting: Vec<Setting>,
    #[prost(int32, optional, tag = "5")]
    pub stream_id: Option<i32>,
    #[prost(int32, optional, tag = "6")]
    pub last_stream_id_received: Option<i32>,
    #[prost(int64, optional, tag = "8")]
    pub server_timestamp: Option<i64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Close {}

#[derive(Clone, PartialEq, Message)]
pub struct IqStanza {
    #[prost(int64, optional, tag = "1")]
    pub rmq_id: Option<i64>,
    #[prost(int32, tag = "2")]
    pub r#type: i32,
    #[prost(string, tag = "3")]
    pub id: String,
    #[prost(string, optional, tag = "4")]
    pub from: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub to: Option<String>,
    #[prost(string, optional, tag = "8")]
    pub persistent_id: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AppData {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct DataMessageStanza {
    #[prost(string, optional, tag = "2")]
    pub id: Option<String>,
    #[prost(string, tag = "3")]
    pub from: String,
    #[prost(string, optional, tag = "4")]
    pub to: Option<String>,
    #[prost(string, tag = "5")]
    pub category: String,
    #[prost(string, optional, tag = "6")]
    pub token: Option<String>,
    #[prost(message, repeated, tag = "7")]
    pub app_data: Vec<AppData>,
    #[prost(string, optional, tag = "9")]
    pub persistent_id: Option<String>,
    #[prost(int32, optional, tag = "10")]
    pub stream_id: Option<i32>,
    #[prost(int32, optional, tag = "11")]
    pub last_stream_id_received: Option<i32>,
    #[prost(int64, optional, tag = "18")]
    pub sent: Option<i64>,
    #[prost(bytes = "vec", optional, tag = "21")]
    pub raw_data: Option<Vec<u8>>,
}
