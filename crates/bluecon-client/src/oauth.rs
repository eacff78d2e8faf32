// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth2 token exchange and refresh-on-read token management.

use std::sync::Arc;

use base64::Engine;
use bluecon_core::{BlueconError, OAuthToken, OAuthTokenStorage};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Grant response from the authorization server.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

fn auth_error(message: impl Into<String>) -> BlueconError {
    BlueconError::Authentication {
        message: message.into(),
        source: None,
    }
}

/// Exchanges account credentials for tokens at the OAuth endpoint.
///
/// Requests authenticate the client with HTTP Basic
/// (`base64(client_id:client_secret)`). Failures are never retried here.
#[derive(Clone)]
pub struct OAuthService {
    client: reqwest::Client,
    token_url: String,
    basic_auth: String,
}

impl OAuthService {
    pub fn new(
        client: reqwest::Client,
        token_url: impl Into<String>,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{client_id}:{client_secret}"));
        Self {
            client,
            token_url: token_url.into(),
            basic_auth: format!("Basic {encoded}"),
        }
    }

    /// Password grant.
    pub async fn create_token(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<OAuthToken, BlueconError> {
        let form = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password.expose_secret()),
        ];
        let token = self.exchange(&form, None).await?;
        info!(username, "logged in");
        Ok(token)
    }

    /// Refresh-token grant. Keeps the old refresh token if the server omits one.
    pub async fn refresh_token(&self, token: &OAuthToken) -> Result<OAuthToken, BlueconError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", token.refresh_token.as_str()),
        ];
        self.exchange(&form, Some(&token.refresh_token)).await
    }

    async fn exchange(
        &self,
        form: &[(&str, &str)],
        previous_refresh: Option<&str>,
    ) -> Result<OAuthToken, BlueconError> {
        let issued_at = Utc::now();
        let response = self
            .client
            .post(&self.token_url)
            .header(reqwest::header::AUTHORIZATION, &self.basic_auth)
            .form(form)
            .send()
            .await
            .map_err(|e| BlueconError::Authentication {
                message: format!("token request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => err.error_description.unwrap_or(err.error),
                Err(_) => body,
            };
            warn!(status = %status, "token request rejected");
            return Err(auth_error(format!("token endpoint returned {status}: {detail}")));
        }

        let grant: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| BlueconError::Authentication {
                    message: format!("malformed token response: {e}"),
                    source: Some(Box::new(e)),
                })?;

        let refresh_token = grant
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string))
            .ok_or_else(|| auth_error("token response carried no refresh token"))?;

        debug!(expires_in = grant.expires_in, "token granted");
        Ok(OAuthToken::from_grant(
            grant.access_token,
            refresh_token,
            grant.token_type.unwrap_or_else(|| "bearer".to_string()),
            grant.expires_in,
            issued_at,
        ))
    }
}

/// Hands out tokens that are valid at return time, refreshing on read.
///
/// Concurrent callers that all find an expired token share a single refresh:
/// the first one to take `refresh_lock` performs it, the rest re-read the
/// store after acquiring the lock and find the new token.
pub struct TokenManager {
    oauth: OAuthService,
    store: Arc<dyn OAuthTokenStorage>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(oauth: OAuthService, store: Arc<dyn OAuthTokenStorage>) -> Self {
        Self {
            oauth,
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Performs a password grant and persists the resulting token.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<OAuthToken, BlueconError> {
        let token = self.oauth.create_token(username, password).await?;
        self.store.store_token(&token).await?;
        Ok(token)
    }

    /// Whether the store holds any token.
    pub async fn has_token(&self) -> Result<bool, BlueconError> {
        Ok(self.store.retrieve_token().await?.is_some())
    }

    pub async fn get_valid_token(&self) -> Result<OAuthToken, BlueconError> {
        let token = self.stored().await?;
        if !token.is_expired() {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        let token = self.stored().await?;
        if !token.is_expired() {
            debug!("token already refreshed by a concurrent caller");
            return Ok(token);
        }

        let refreshed = self.oauth.refresh_token(&token).await?;
        self.store.store_token(&refreshed).await?;
        info!(expires_at = %refreshed.expires_at, "access token refreshed");
        Ok(refreshed)
    }

    /// `Authorization` header value carrying a valid access token.
    pub async fn bearer_header(&self) -> Result<String, BlueconError> {
        Ok(self.get_valid_token().await?.bearer_header())
    }

    async fn stored(&self) -> Result<OAuthToken, BlueconError> {
        self.store
            .retrieve_token()
            .await?
            .ok_or_else(|| auth_error("not logged in"))
    }
}
