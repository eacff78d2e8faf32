// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the vendor's REST endpoints.
//!
//! [`FermaxApi`] is stateless apart from the shared `reqwest::Client`; every
//! method takes the `Authorization` header value to send. Token handling
//! lives in [`TokenManager`](crate::oauth::TokenManager).

use std::time::Duration;

use base64::Engine;
use bluecon_core::{AccessId, BlueconError, CallLog, DeviceInfo, Pairing, User};
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

const PAIRINGS_PATH: &str = "/pairing/api/v3/pairings/me";
const USER_PATH: &str = "/user/api/v1/users/me";
const DEVICE_PATH: &str = "/deviceaction/api/v1/device";
const ACK_PATH: &str = "/callmanager/api/v1/message/ack";
const APP_TOKEN_PATH: &str = "/notification/api/v1/apptoken";
const CALL_REGISTRY_PATH: &str = "/callManager/api/v1/callregistry/participant";
const PHOTO_PATH: &str = "/callManager/api/v1/photocall";

/// Client identity reported when registering the app token.
const APP_VERSION: &str = "3.3.2";
const APP_LOCALE: &str = "en";
const APP_OS: &str = "Android";
const APP_OS_VERSION: &str = "Android 13";

/// Builds the shared HTTP client.
///
/// Idle connections are never pooled: the listener thread calls through the
/// same client from its own runtime, and a pooled connection is bound to the
/// runtime that opened it.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, BlueconError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(0)
        .user_agent(concat!("bluecon/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| BlueconError::transport("failed to build HTTP client", e))
}

#[derive(Debug, Deserialize)]
struct PhotoResponse {
    image: PhotoImage,
}

#[derive(Debug, Deserialize)]
struct PhotoImage {
    data: String,
}

/// Vendor REST API.
#[derive(Debug, Clone)]
pub struct FermaxApi {
    client: reqwest::Client,
    base_url: String,
}

impl FermaxApi {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, BlueconError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| BlueconError::Config(format!("invalid API URL {}: {e}", self.base_url)))
    }

    /// Device endpoint with `device_id` escaped as a single path segment.
    fn device_url(&self, device_id: &str, action: Option<&str>) -> Result<Url, BlueconError> {
        let mut url = self.url(DEVICE_PATH)?;
        url.path_segments_mut()
            .map_err(|()| {
                BlueconError::Config(format!("API URL cannot take a path: {}", self.base_url))
            })?
            .push(device_id)
            .extend(action);
        Ok(url)
    }

    pub async fn pairings(&self, auth: &str) -> Result<Vec<Pairing>, BlueconError> {
        let response = self.get(auth, self.url(PAIRINGS_PATH)?, &[]).await?;
        expect_json(response, "pairings").await
    }

    pub async fn user(&self, auth: &str) -> Result<User, BlueconError> {
        let response = self.get(auth, self.url(USER_PATH)?, &[]).await?;
        expect_json(response, "user info").await
    }

    /// Device telemetry, or `None` when the backend does not answer 2xx.
    pub async fn device_info(
        &self,
        auth: &str,
        device_id: &str,
    ) -> Result<Option<DeviceInfo>, BlueconError> {
        let response = self.get(auth, self.device_url(device_id, None)?, &[]).await?;
        if !response.status().is_success() {
            debug!(device_id, status = %response.status(), "device info unavailable");
            return Ok(None);
        }
        expect_json(response, "device info").await.map(Some)
    }

    pub async fn open_door(
        &self,
        auth: &str,
        device_id: &str,
        access_id: &AccessId,
    ) -> Result<bool, BlueconError> {
        let url = self.device_url(device_id, Some("directed-opendoor"))?;
        let response = self.post_json(auth, url, access_id).await?;
        Ok(accepted(response.status(), "open door"))
    }

    pub async fn acknowledge(&self, auth: &str, message_id: &str) -> Result<bool, BlueconError> {
        let body = json!({ "attended": true, "fcmMessageId": message_id });
        let response = self.post_json(auth, self.url(ACK_PATH)?, &body).await?;
        Ok(accepted(response.status(), "acknowledge"))
    }

    /// Registers (or deactivates) `token` as this installation's push target.
    pub async fn set_app_token(
        &self,
        auth: &str,
        token: &str,
        active: bool,
    ) -> Result<bool, BlueconError> {
        let body = json!({
            "token": token,
            "appVersion": APP_VERSION,
            "locale": APP_LOCALE,
            "os": APP_OS,
            "osVersion": APP_OS_VERSION,
            "active": active,
        });
        let response = self.post_json(auth, self.url(APP_TOKEN_PATH)?, &body).await?;
        Ok(accepted(response.status(), "app token"))
    }

    pub async fn call_registry(
        &self,
        auth: &str,
        app_token: &str,
    ) -> Result<Vec<CallLog>, BlueconError> {
        let query = [("appToken", app_token), ("callRegistryType", "all")];
        let response = self.get(auth, self.url(CALL_REGISTRY_PATH)?, &query).await?;
        expect_json(response, "call registry").await
    }

    /// Downloads and decodes a call photo. `None` when the backend has no photo.
    pub async fn photo(&self, auth: &str, photo_id: &str) -> Result<Option<Vec<u8>>, BlueconError> {
        let url = self.url(PHOTO_PATH)?;
        let response = self.get(auth, url, &[("photoId", photo_id)]).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let photo: PhotoResponse = expect_json(response, "photo").await?;
        base64::engine::general_purpose::STANDARD
            .decode(photo.image.data.trim())
            .map(Some)
            .map_err(|e| BlueconError::Decode(format!("invalid photo data: {e}")))
    }

    async fn get(
        &self,
        auth: &str,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<Response, BlueconError> {
        let path = url.path().to_string();
        self.client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .query(query)
            .send()
            .await
            .map_err(|e| BlueconError::transport(format!("GET {path} failed"), e))
    }

    async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        auth: &str,
        url: Url,
        body: &B,
    ) -> Result<Response, BlueconError> {
        let path = url.path().to_string();
        self.client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(body)
            .send()
            .await
            .map_err(|e| BlueconError::transport(format!("POST {path} failed"), e))
    }
}

fn accepted(status: StatusCode, what: &str) -> bool {
    if status.is_success() {
        debug!(status = %status, "{what} accepted");
        true
    } else {
        warn!(status = %status, "{what} rejected");
        false
    }
}

async fn expect_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, BlueconError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BlueconError::Transport {
            message: format!("{what} request returned {status}: {body}"),
            source: None,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| BlueconError::Decode(format!("invalid {what} response: {e}")))
}

/// Newest call log for `device_id` that carries a photo.
pub fn latest_photo_call<'a>(logs: &'a [CallLog], device_id: &str) -> Option<&'a CallLog> {
    logs.iter()
        .filter(|log| log.device_id == device_id && log.photo_id.is_some())
        .filter_map(|log| log.parsed_call_date().map(|date| (date, log)))
        .max_by_key(|(date, _)| *date)
        .map(|(_, log)| log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AUTH: &str = "Bearer test-access";

    async fn api(server: &MockServer) -> FermaxApi {
        let client = build_http_client(Duration::from_secs(5)).unwrap();
        FermaxApi::new(client, server.uri())
    }

    fn log(device: &str, photo: Option<&str>, date: &str) -> CallLog {
        CallLog {
            call_id: None,
            device_id: device.into(),
            photo_id: photo.map(str::to_string),
            call_date: date.into(),
        }
    }

    #[tokio::test]
    async fn pairings_send_bearer_and_parse() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PAIRINGS_PATH))
            .and(header("authorization", AUTH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "p1",
                "deviceId": "dev-1",
                "tag": "Home",
                "status": "PAIRED",
                "accessDoorMap": {
                    "ZERO": {"title": "Street", "accessId": {"block": 100, "subblock": -1, "number": 0}, "visible": true}
                },
                "master": true
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let pairings = api(&server).await.pairings(AUTH).await.unwrap();
        assert_eq!(pairings.len(), 1);
        assert_eq!(pairings[0].device_id, "dev-1");
        assert_eq!(pairings[0].access_doors["ZERO"].access_id.block, 100);
    }

    #[tokio::test]
    async fn user_info_error_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USER_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = api(&server).await.user(AUTH).await.unwrap_err();
        match err {
            BlueconError::Transport { message, .. } => assert!(message.contains("503")),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn device_info_non_success_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/deviceaction/api/v1/device/dev-1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(api(&server).await.device_info(AUTH, "dev-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn open_door_posts_access_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/deviceaction/api/v1/device/dev-1/directed-opendoor"))
            .and(body_json(json!({"block": 100, "subblock": -1, "number": 0})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let access = AccessId {
            block: 100,
            subblock: -1,
            number: 0,
        };
        assert!(api(&server).await.open_door(AUTH, "dev-1", &access).await.unwrap());
    }

    #[tokio::test]
    async fn device_id_stays_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/deviceaction/api/v1/device/a%2Fb%3Fx/directed-opendoor"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let access = AccessId {
            block: 100,
            subblock: -1,
            number: 0,
        };
        assert!(api(&server).await.open_door(AUTH, "a/b?x", &access).await.unwrap());
    }

    #[test]
    fn device_url_escapes_the_id() {
        let api = FermaxApi::new(reqwest::Client::new(), "https://api.example.test/");
        let url = api.device_url("dev 1/../x", None).unwrap();
        assert_eq!(url.path(), "/deviceaction/api/v1/device/dev%201%2F..%2Fx");
    }

    #[tokio::test]
    async fn rejected_ack_is_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ACK_PATH))
            .and(body_json(json!({"attended": true, "fcmMessageId": "m-1"})))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(!api(&server).await.acknowledge(AUTH, "m-1").await.unwrap());
    }

    #[tokio::test]
    async fn app_token_body_identifies_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(APP_TOKEN_PATH))
            .and(body_json(json!({
                "token": "fcm-token",
                "appVersion": "3.3.2",
                "locale": "en",
                "os": "Android",
                "osVersion": "Android 13",
                "active": false
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        assert!(
            api(&server)
                .await
                .set_app_token(AUTH, "fcm-token", false)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn photo_is_base64_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PHOTO_PATH))
            .and(query_param("photoId", "ph-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"image": {"data": "aGVsbG8="}})),
            )
            .mount(&server)
            .await;

        let bytes = api(&server).await.photo(AUTH, "ph-1").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn latest_photo_call_picks_newest_with_photo() {
        let logs = vec![
            log("dev-1", Some("old"), "2024-01-01T10:00:00.000+0100"),
            log("dev-1", None, "2024-03-01T10:00:00.000+0100"),
            log("dev-2", Some("other"), "2024-04-01T10:00:00.000+0100"),
            log("dev-1", Some("new"), "2024-02-01T10:00:00+01:00"),
        ];
        let latest = latest_photo_call(&logs, "dev-1").unwrap();
        assert_eq!(latest.photo_id.as_deref(), Some("new"));
        assert!(latest_photo_call(&logs, "dev-3").is_none());
    }
}
