// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Firebase installation and GCM token registration.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bluecon_core::{BlueconError, PushApp, PushCredentials};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checkin::{DeviceIdentity, checkin};
use crate::{FcmEndpoints, registration_error};

const FIS_SDK_VERSION: &str = "a:17.0.0";
const GCM_CLIENT_VERSION: &str = "fcm-23.1.2";

/// Generates a Firebase installation id: 17 random bytes with the
/// `0111` prefix, base64url encoded and cut to 22 characters.
pub fn generate_fid() -> String {
    let mut bytes = [0u8; 17];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes[0] = 0x70 | (bytes[0] & 0x0f);
    let mut fid = URL_SAFE_NO_PAD.encode(bytes);
    fid.truncate(22);
    fid
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstallationRequest<'a> {
    fid: &'a str,
    app_id: &'a str,
    auth_version: &'a str,
    sdk_version: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallationResponse {
    fid: Option<String>,
    auth_token: InstallationAuthToken,
}

#[derive(Debug, Deserialize)]
struct InstallationAuthToken {
    token: String,
}

/// A created Firebase installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub fid: String,
    pub auth_token: String,
}

/// Creates a Firebase installation for `app`.
pub async fn create_installation(
    client: &reqwest::Client,
    base_url: &str,
    app: &PushApp,
    package_cert: &str,
) -> Result<Installation, BlueconError> {
    let fid = generate_fid();
    let url = format!(
        "{}/projects/{}/installations",
        base_url.trim_end_matches('/'),
        app.project_id
    );
    let response = client
        .post(&url)
        .header("x-goog-api-key", &app.api_key)
        .header("X-Android-Package", &app.package_name)
        .header("X-Android-Cert", package_cert)
        .json(&InstallationRequest {
            fid: &fid,
            app_id: &app.app_id,
            auth_version: "FIS_v2",
            sdk_version: FIS_SDK_VERSION,
        })
        .send()
        .await
        .map_err(|e| BlueconError::transport("firebase installation request failed", e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(registration_error(
            format!("firebase installation returned HTTP {status}: {body}"),
            None,
        ));
    }
    let parsed: InstallationResponse = response
        .json()
        .await
        .map_err(|e| registration_error("malformed firebase installation response", Some(Box::new(e))))?;

    Ok(Installation {
        fid: parsed.fid.unwrap_or(fid),
        auth_token: parsed.auth_token.token,
    })
}

/// Registers the device with GCM and returns the push token.
pub async fn register_token(
    client: &reqwest::Client,
    url: &str,
    app: &PushApp,
    package_cert: &str,
    device: DeviceIdentity,
    installation: &Installation,
) -> Result<String, BlueconError> {
    let android_id = device.android_id.to_string();
    let form = [
        ("X-subtype", app.sender_id.as_str()),
        ("sender", app.sender_id.as_str()),
        ("X-app_ver", "1"),
        ("X-osv", "33"),
        ("X-cliv", GCM_CLIENT_VERSION),
        ("X-gmsv", "231218000"),
        ("X-appid", installation.fid.as_str()),
        ("X-scope", "*"),
        (
            "X-Goog-Firebase-Installations-Auth",
            installation.auth_token.as_str(),
        ),
        ("X-gmp_app_id", app.app_id.as_str()),
        ("X-firebase-app-name-hash", "R1dAH9Ui7M-ynoznwBdw01tLxhI"),
        ("app", app.package_name.as_str()),
        ("device", android_id.as_str()),
        ("app_ver", "1"),
        ("cert", package_cert),
        ("plat", "0"),
    ];

    let response = client
        .post(url)
        .header(
            reqwest::header::AUTHORIZATION,
            format!("AidLogin {}:{}", device.android_id, device.security_token),
        )
        .form(&form)
        .send()
        .await
        .map_err(|e| BlueconError::transport("gcm register request failed", e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| BlueconError::transport("gcm register response read failed", e))?;
    parse_register_response(status, &body)
}

fn parse_register_response(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<String, BlueconError> {
    let body = body.trim();
    if let Some(error) = body.split("Error=").nth(1) {
        return Err(registration_error(format!("gcm register rejected: {error}"), None));
    }
    if !status.is_success() {
        return Err(registration_error(format!("gcm register returned HTTP {status}"), None));
    }
    match body.strip_prefix("token=") {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(registration_error(
            format!("unexpected gcm register response: {body}"),
            None,
        )),
    }
}

/// Full registration: checkin, installation, then token registration.
pub async fn register(
    client: &reqwest::Client,
    endpoints: &FcmEndpoints,
    app: &PushApp,
    package_cert: &str,
) -> Result<PushCredentials, BlueconError> {
    let device = checkin(client, &endpoints.checkin_url).await?;
    let installation =
        create_installation(client, &endpoints.installations_url, app, package_cert).await?;
    debug!(fid = %installation.fid, "firebase installation created");
    let device_token =
        register_token(client, &endpoints.register_url, app, package_cert, device, &installation)
            .await?;
    info!(android_id = device.android_id, "push endpoint registered");

    Ok(PushCredentials {
        device_token,
        android_id: device.android_id,
        security_token: device.security_token,
        installation_id: Some(installation.fid),
    })
}
