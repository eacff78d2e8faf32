// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Firebase Cloud Messaging push provider.
//!
//! Registration goes through Android checkin, a Firebase installation, and
//! GCM `register3`. Listening keeps one MCS connection open to the push
//! service, reconnecting with capped exponential backoff until cancelled.

pub mod checkin;
pub mod connection;
pub mod mcs;
pub mod proto;
pub mod register;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bluecon_core::error::BoxError;
use bluecon_core::{
    BlueconError, ListenSession, NotificationInfoStorage, PushApp, PushCredentials, PushProvider,
};
use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{SessionEnd, login_request, run_session};
use crate::mcs::McsConnection;

pub use checkin::DeviceIdentity;

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

pub(crate) fn registration_error(
    message: impl Into<String>,
    source: Option<BoxError>,
) -> BlueconError {
    BlueconError::Registration {
        message: message.into(),
        source,
    }
}

/// Service endpoints, overridable for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcmEndpoints {
    pub checkin_url: String,
    /// Firebase installations API base, without the `/projects/...` suffix.
    pub installations_url: String,
    pub register_url: String,
    pub mcs_host: String,
    pub mcs_port: u16,
    /// Plain TCP to the MCS host when false.
    pub mcs_tls: bool,
}

impl Default for FcmEndpoints {
    fn default() -> Self {
        Self {
            checkin_url: "https://android.clients.google.com/checkin".into(),
            installations_url: "https://firebaseinstallations.googleapis.com/v1".into(),
            register_url: "https://android.clients.google.com/c2dm/register3".into(),
            mcs_host: "mtalk.google.com".into(),
            mcs_port: 5228,
            mcs_tls: true,
        }
    }
}

trait McsStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> McsStream for T {}

/// Reconnect delay: doubles per failure up to a cap, with up to 25%
/// random jitter, and resets after a successful login.
#[derive(Debug)]
struct Backoff {
    current: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            current: INITIAL_BACKOFF,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = (self.current * 2).min(MAX_BACKOFF);
        let jitter_ms = rand::thread_rng().gen_range(0..=base.as_millis() as u64 / 4);
        base + Duration::from_millis(jitter_ms)
    }

    fn reset(&mut self) {
        self.current = INITIAL_BACKOFF;
    }
}

/// [`PushProvider`] backed by Firebase Cloud Messaging.
#[derive(Debug, Clone)]
pub struct FcmPushProvider {
    client: reqwest::Client,
    endpoints: FcmEndpoints,
    heartbeat_interval: Duration,
}

impl FcmPushProvider {
    pub fn new() -> Result<Self, BlueconError> {
        // No idle pooling: registration and listening run on different runtimes.
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| BlueconError::transport("failed to build HTTP client", e))?;
        Ok(Self {
            client,
            endpoints: FcmEndpoints::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        })
    }

    pub fn with_endpoints(mut self, endpoints: FcmEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    async fn connect(&self) -> Result<Box<dyn McsStream>, BlueconError> {
        let addr = (self.endpoints.mcs_host.as_str(), self.endpoints.mcs_port);
        let tcp = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| BlueconError::Timeout {
                duration: CONNECT_TIMEOUT,
            })?
            .map_err(|e| BlueconError::transport("MCS connect failed", e))?;
        tcp.set_nodelay(true)
            .map_err(|e| BlueconError::transport("MCS socket setup failed", e))?;

        if !self.endpoints.mcs_tls {
            return Ok(Box::new(tcp));
        }
        let server_name = rustls::pki_types::ServerName::try_from(self.endpoints.mcs_host.clone())
            .map_err(|e| BlueconError::transport("invalid MCS host name", e))?;
        let tls = tls_connector()?
            .connect(server_name, tcp)
            .await
            .map_err(|e| BlueconError::transport("MCS TLS handshake failed", e))?;
        Ok(Box::new(tls))
    }

    /// One connect, login, and session. Seen ids are re-read every time so
    /// a reconnect never asks for messages already processed.
    async fn connect_and_run(
        &self,
        session: &ListenSession,
        seen_ids: &dyn NotificationInfoStorage,
        backoff: &mut Backoff,
    ) -> Result<SessionEnd, BlueconError> {
        let cancel = &session.cancel;
        let ids = seen_ids.retrieve_persistent_ids().await?;
        let request = login_request(&session.credentials, ids);

        let stream = tokio::select! {
            _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            stream = self.connect() => stream?,
        };
        let (conn, response) = tokio::select! {
            _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            login = tokio::time::timeout(CONNECT_TIMEOUT, McsConnection::login(stream, request)) => {
                login.map_err(|_| BlueconError::Timeout { duration: CONNECT_TIMEOUT })??
            }
        };
        backoff.reset();
        info!(
            host = %self.endpoints.mcs_host,
            stream_id = response.stream_id.unwrap_or_default(),
            "connected to push service"
        );

        run_session(conn, &session.sender, cancel, self.heartbeat_interval).await
    }
}

fn tls_connector() -> Result<tokio_rustls::TlsConnector, BlueconError> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::aws_lc_rs::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| BlueconError::transport("TLS configuration failed", e))?
    .with_root_certificates(roots)
    .with_no_client_auth();
    Ok(tokio_rustls::TlsConnector::from(Arc::new(config)))
}

async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[async_trait]
impl PushProvider for FcmPushProvider {
    fn name(&self) -> &str {
        "fcm"
    }

    async fn register(
        &self,
        app: &PushApp,
        package_cert: &str,
    ) -> Result<PushCredentials, BlueconError> {
        register::register(&self.client, &self.endpoints, app, package_cert).await
    }

    async fn listen(&self, session: ListenSession) -> Result<(), BlueconError> {
        let seen_ids = session.seen_ids.clone();
        let mut backoff = Backoff::new();

        loop {
            match self
                .connect_and_run(&session, seen_ids.as_ref(), &mut backoff)
                .await
            {
                Ok(SessionEnd::Cancelled) => {
                    debug!("push connection cancelled");
                    return Ok(());
                }
                Ok(SessionEnd::ReceiverGone) => {
                    debug!("push consumer went away");
                    return Ok(());
                }
                Ok(SessionEnd::ClosedByServer) => info!("push service closed the connection"),
                Err(e) => warn!(error = %e, "push connection failed"),
            }

            let delay = backoff.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "reconnecting to push service");
            if !sleep_or_cancel(delay, &session.cancel).await {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_to_cap_and_resets() {
        let mut backoff = Backoff::new();
        let mut last = Duration::ZERO;
        for _ in 0..10 {
            let delay = backoff.next_delay();
            assert!(delay <= MAX_BACKOFF + MAX_BACKOFF / 4);
            last = delay;
        }
        assert!(last >= MAX_BACKOFF);

        backoff.reset();
        let first = backoff.next_delay();
        assert!(first >= INITIAL_BACKOFF && first <= INITIAL_BACKOFF + INITIAL_BACKOFF / 4);
    }

    #[test]
    fn default_endpoints_target_google() {
        let endpoints = FcmEndpoints::default();
        assert_eq!(endpoints.mcs_port, 5228);
        assert!(endpoints.mcs_tls);
        assert!(endpoints.checkin_url.starts_with("https://"));
    }

    #[test]
    fn tls_connector_builds_with_bundled_roots() {
        assert!(tls_connector().is_ok());
    }
}
