// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session facade tests: token lifecycle and vendor endpoints.

use std::sync::Arc;
use std::time::Duration;

use bluecon_client::{ChannelNotificationHandler, ClientSettings, SessionClient, Storages};
use bluecon_core::{
    AccessDoor, AccessId, BlueconError, CallEnded, Notification, OAuthToken, OAuthTokenStorage,
};
use bluecon_storage::{InMemoryNotificationInfoStorage, InMemoryOAuthTokenStorage};
use bluecon_test_utils::{ScriptedPushProvider, TestHarness};
use chrono::{Duration as ChronoDuration, Utc};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token(access: &str, expires_in_secs: i64) -> OAuthToken {
    OAuthToken {
        access_token: access.into(),
        refresh_token: "refresh-1".into(),
        token_type: "bearer".into(),
        expires_at: Utc::now() + ChronoDuration::seconds(expires_in_secs),
    }
}

fn settings(server: &MockServer) -> ClientSettings {
    ClientSettings::new("cid", "secret")
        .with_base_url(server.uri())
        .with_oauth_url(format!("{}/oauth/token", server.uri()))
}

async fn client_with(
    server: &MockServer,
    tokens: Arc<InMemoryOAuthTokenStorage>,
) -> Result<SessionClient, BlueconError> {
    let (handler, _rx) = ChannelNotificationHandler::new();
    SessionClient::from_stored_token(
        settings(server),
        Storages::new(tokens, Arc::new(InMemoryNotificationInfoStorage::new())),
        Arc::new(ScriptedPushProvider::new(Vec::new())),
        Arc::new(handler),
    )
    .await
}

fn door() -> AccessDoor {
    AccessDoor {
        title: "Street".into(),
        access_id: AccessId {
            block: 100,
            subblock: -1,
            number: 0,
        },
        visible: true,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_a_single_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(json!({
                    "access_token": "fresh",
                    "refresh_token": "refresh-2",
                    "expires_in": 3600
                })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pairing/api/v3/pairings/me"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(8)
        .mount(&server)
        .await;

    let tokens = Arc::new(InMemoryOAuthTokenStorage::with_token(token("stale", -30)));
    let client = Arc::new(client_with(&server, tokens.clone()).await.unwrap());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move { client.get_pairings().await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_empty());
    }

    let stored = tokens.retrieve_token().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "fresh");
    assert!(stored.expires_at > Utc::now());
}

#[tokio::test]
async fn login_persists_the_granted_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "acc",
            "refresh_token": "ref",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(InMemoryOAuthTokenStorage::new());
    let (handler, _rx) = ChannelNotificationHandler::new();
    SessionClient::login(
        settings(&server),
        "me@example.com",
        &SecretString::from("pw"),
        Storages::new(tokens.clone(), Arc::new(InMemoryNotificationInfoStorage::new())),
        Arc::new(ScriptedPushProvider::new(Vec::new())),
        Arc::new(handler),
    )
    .await
    .unwrap();

    let stored = tokens.retrieve_token().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "acc");
}

#[tokio::test]
async fn empty_token_store_is_not_logged_in() {
    let server = MockServer::start().await;
    let err = client_with(&server, Arc::new(InMemoryOAuthTokenStorage::new()))
        .await
        .unwrap_err();
    assert!(err.is_authentication());
}

#[tokio::test]
async fn rejected_refresh_is_an_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(InMemoryOAuthTokenStorage::with_token(token("stale", -30)));
    let client = client_with(&server, tokens).await.unwrap();
    assert!(client.get_user_info().await.unwrap_err().is_authentication());
}

#[tokio::test]
async fn open_door_reports_backend_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/deviceaction/api/v1/device/dev-ok/directed-opendoor"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/deviceaction/api/v1/device/dev-down/directed-opendoor"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let tokens = Arc::new(InMemoryOAuthTokenStorage::with_token(token("live", 3600)));
    let client = client_with(&server, tokens).await.unwrap();
    assert!(client.open_door("dev-ok", &door()).await.unwrap());
    assert!(!client.open_door("dev-down", &door()).await.unwrap());
}

#[tokio::test]
async fn device_info_reports_telemetry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/deviceaction/api/v1/device/dev-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deviceId": "dev-1",
            "connectionState": "Connected",
            "family": "MONITOR",
            "type": "VEO-XS",
            "subtype": "WIFI",
            "photocaller": true,
            "wirelessSignal": 4
        })))
        .mount(&server)
        .await;

    let tokens = Arc::new(InMemoryOAuthTokenStorage::with_token(token("live", 3600)));
    let client = client_with(&server, tokens).await.unwrap();
    let info = client.get_device_info("dev-1").await.unwrap().unwrap();
    assert!(info.is_connected());
    assert_eq!(info.signal_strength().to_string(), "excellent");
    assert!(client.get_device_info("dev-2").await.unwrap().is_none());
}

#[tokio::test]
async fn call_end_needs_no_acknowledgment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tokens = Arc::new(InMemoryOAuthTokenStorage::with_token(token("live", 3600)));
    let client = client_with(&server, tokens).await.unwrap();
    let ended = Notification::CallEnded(CallEnded {
        device_id: "dev-1".into(),
    });
    assert!(!client.acknowledge_notification(&ended).await.unwrap());
}

#[tokio::test]
async fn push_operations_need_a_push_app() {
    let server = MockServer::start().await;
    let tokens = Arc::new(InMemoryOAuthTokenStorage::with_token(token("live", 3600)));
    let client = client_with(&server, tokens).await.unwrap();

    let err = client.start_notification_listener().await.unwrap_err();
    assert!(matches!(err, BlueconError::Config(_)));
    assert!(matches!(
        client.register_app_token(true).await.unwrap_err(),
        BlueconError::Config(_)
    ));
}

#[tokio::test]
async fn last_picture_is_the_newest_call_photo() {
    let harness = TestHarness::builder().build().await.unwrap();
    Mock::given(method("GET"))
        .and(path("/callManager/api/v1/callregistry/participant"))
        .and(query_param("appToken", "scripted-fcm-token"))
        .and(query_param("callRegistryType", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"callId": "c1", "deviceId": "dev-1", "photoId": "old", "callDate": "2024-05-01T08:00:00.000+0200"},
            {"callId": "c2", "deviceId": "dev-1", "photoId": "new", "callDate": "2024-05-02T08:00:00.000+0200"},
            {"callId": "c3", "deviceId": "dev-1", "callDate": "2024-05-03T08:00:00.000+0200"}
        ])))
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/callManager/api/v1/photocall"))
        .and(query_param("photoId", "new"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"image": {"data": "AQID"}})),
        )
        .expect(1)
        .mount(&harness.server)
        .await;

    let picture = harness.client.get_last_picture("dev-1").await.unwrap();
    assert_eq!(picture, Some(vec![1, 2, 3]));
    assert_eq!(harness.client.get_last_picture("dev-9").await.unwrap(), None);
}
