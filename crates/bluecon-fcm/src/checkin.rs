// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Android device checkin.

use bluecon_core::BlueconError;
use prost::Message;
use tracing::debug;

use crate::proto::{
    AndroidCheckinProto, AndroidCheckinRequest, AndroidCheckinResponse, ChromeBuildProto,
};
use crate::registration_error;

pub(crate) const CHROME_VERSION: &str = "63.0.3234.0";

// DEVICE_CHROME_BROWSER, PLATFORM_LINUX, CHANNEL_STABLE
const CHECKIN_TYPE_CHROME: i32 = 3;
const CHROME_PLATFORM_LINUX: i32 = 3;
const CHROME_CHANNEL_STABLE: i32 = 1;
const CHECKIN_VERSION: i32 = 3;

/// Identity assigned by a successful checkin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub android_id: u64,
    pub security_token: u64,
}

pub(crate) fn checkin_request() -> AndroidCheckinRequest {
    AndroidCheckinRequest {
        id: None,
        security_token: None,
        checkin: Some(AndroidCheckinProto {
            last_checkin_msec: None,
            r#type: Some(CHECKIN_TYPE_CHROME),
            chrome_build: Some(ChromeBuildProto {
                platform: Some(CHROME_PLATFORM_LINUX),
                chrome_version: Some(CHROME_VERSION.to_string()),
                channel: Some(CHROME_CHANNEL_STABLE),
            }),
        }),
        version: Some(CHECKIN_VERSION),
        user_serial_number: Some(0),
    }
}

/// Checks in as a new Chrome browser device.
pub async fn checkin(client: &reqwest::Client, url: &str) -> Result<DeviceIdentity, BlueconError> {
    let body = checkin_request().encode_to_vec();
    let response = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/x-protobuf")
        .body(body)
        .send()
        .await
        .map_err(|e| BlueconError::transport("checkin request failed", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(registration_error(format!("checkin returned HTTP {status}"), None));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| BlueconError::transport("checkin response read failed", e))?;
    let decoded = AndroidCheckinResponse::decode(bytes)
        .map_err(|e| registration_error("malformed checkin response", Some(Box::new(e))))?;

    match (decoded.android_id, decoded.security_token) {
        (Some(android_id), Some(security_token)) if android_id != 0 && security_token != 0 => {
            debug!(android_id, "device checkin complete");
            Ok(DeviceIdentity {
                android_id,
                security_token,
            })
        }
        _ => Err(registration_error("checkin response carried no device identity", None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn request_describes_a_new_chrome_device() {
        let request = checkin_request();
        assert_eq!(request.id, None);
        assert_eq!(request.security_token, None);
        let build = request.checkin.and_then(|c| c.chrome_build).unwrap();
        assert_eq!(build.chrome_version.as_deref(), Some(CHROME_VERSION));
        assert_eq!(build.platform, Some(CHROME_PLATFORM_LINUX));
    }

    #[tokio::test]
    async fn checkin_decodes_identity() {
        let server = MockServer::start().await;
        let body = AndroidCheckinResponse {
            stats_ok: Some(true),
            time_msec: None,
            android_id: Some(1234),
            security_token: Some(5678),
        }
        .encode_to_vec();
        Mock::given(method("POST"))
            .and(path("/checkin"))
            .and(header("content-type", "application/x-protobuf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let identity = checkin(&client, &format!("{}/checkin", server.uri()))
            .await
            .unwrap();
        assert_eq!(
            identity,
            DeviceIdentity {
                android_id: 1234,
                security_token: 5678
            }
        );
    }

    #[tokio::test]
    async fn empty_identity_is_a_registration_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::<u8>::new()))
            .mount(&server)
            .await;

        let err = checkin(&reqwest::Client::new(), &server.uri())
            .await
            .unwrap_err();
        assert!(matches!(err, BlueconError::Registration { .. }));
    }
}
