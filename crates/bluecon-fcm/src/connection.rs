// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One logged-in MCS session: heartbeats in both directions and data
//! message hand-off.

use std::collections::HashMap;
use std::time::Duration;

use bluecon_core::{BlueconError, PushCredentials, PushMessage};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::checkin::CHROME_VERSION;
use crate::mcs::{Frame, McsConnection};
use crate::proto::{DataMessageStanza, HeartbeatAck, HeartbeatPing, LoginRequest, Setting};

/// Why a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The listener asked to stop.
    Cancelled,
    /// The consumer dropped its receiver.
    ReceiverGone,
    /// The server sent a close frame.
    ClosedByServer,
}

/// Builds the login request for `credentials`, acknowledging `seen_ids`
/// so the server does not redeliver them.
pub fn login_request(credentials: &PushCredentials, seen_ids: Vec<String>) -> LoginRequest {
    let android_id = credentials.android_id.to_string();
    LoginRequest {
        id: format!("chrome-{CHROME_VERSION}"),
        domain: "mcs.android.com".into(),
        device_id: Some(format!("android-{:x}", credentials.android_id)),
        user: android_id.clone(),
        resource: android_id,
        auth_token: credentials.security_token.to_string(),
        setting: vec![Setting {
            name: "new_vc".into(),
            value: "1".into(),
        }],
        received_persistent_id: seen_ids,
        adaptive_heartbeat: Some(false),
        use_rmq2: Some(true),
        account_id: None,
        auth_service: Some(2),
        network_type: Some(1),
    }
}

fn to_push_message(stanza: DataMessageStanza) -> Option<PushMessage> {
    let message_id = stanza.id.unwrap_or_default();
    let persistent_id = stanza
        .persistent_id
        .filter(|id| !id.is_empty())
        .or_else(|| (!message_id.is_empty()).then(|| message_id.clone()))?;
    let data: HashMap<String, String> = stanza
        .app_data
        .into_iter()
        .map(|entry| (entry.key, entry.value))
        .collect();
    Some(PushMessage {
        persistent_id,
        message_id,
        data,
    })
}

/// Drives a logged-in connection until cancelled, closed, or failed.
pub async fn run_session<S>(
    mut conn: McsConnection<S>,
    sender: &mpsc::Sender<PushMessage>,
    cancel: &CancellationToken,
    heartbeat_interval: Duration,
) -> Result<SessionEnd, BlueconError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut heartbeat = tokio::time::interval(heartbeat_interval);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; login already proved liveness.
    heartbeat.tick().await;

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            _ = heartbeat.tick() => {
                trace!("sending heartbeat");
                let ping = HeartbeatPing {
                    last_stream_id_received: Some(conn.last_stream_id_received()),
                    ..Default::default()
                };
                conn.send(&Frame::HeartbeatPing(ping)).await?;
                continue;
            }
            frame = conn.receive() => frame?,
        };

        match frame {
            Frame::HeartbeatPing(_) => {
                let ack = HeartbeatAck {
                    last_stream_id_received: Some(conn.last_stream_id_received()),
                    ..Default::default()
                };
                conn.send(&Frame::HeartbeatAck(ack)).await?;
            }
            Frame::Data(stanza) => {
                let Some(message) = to_push_message(stanza) else {
                    debug!("ignoring data message without an id");
                    continue;
                };
                debug!(persistent_id = %message.persistent_id, "push message received");
                if sender.send(message).await.is_err() {
                    return Ok(SessionEnd::ReceiverGone);
                }
            }
            Frame::Close(_) => return Ok(SessionEnd::ClosedByServer),
            other => trace!(?other, "ignoring MCS frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcs::MCS_VERSION;
    use crate::proto::{AppData, Close};
    use bytes::BytesMut;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn credentials() -> PushCredentials {
        PushCredentials {
            device_token: "t".into(),
            android_id: 255,
            security_token: 99,
            installation_id: None,
        }
    }

    fn data(persistent_id: &str, id: &str) -> Frame {
        Frame::Data(DataMessageStanza {
            id: Some(id.into()),
            from: "sender".into(),
            category: "com.fermax.blue.app".into(),
            persistent_id: Some(persistent_id.into()),
            app_data: vec![AppData {
                key: "FermaxNotificationType".into(),
                value: "Call".into(),
            }],
            ..Default::default()
        })
    }

    fn wire(frames: &[Frame]) -> BytesMut {
        let mut out = BytesMut::from(&[MCS_VERSION][..]);
        for frame in frames {
            frame.encode(&mut out);
        }
        out
    }

    #[test]
    fn login_request_uses_checkin_identity() {
        let request = login_request(&credentials(), vec!["0:a".into()]);
        assert_eq!(request.user, "255");
        assert_eq!(request.auth_token, "99");
        assert_eq!(request.device_id.as_deref(), Some("android-ff"));
        assert_eq!(request.received_persistent_id, vec!["0:a"]);
    }

    #[test]
    fn message_id_backs_missing_persistent_id() {
        let stanza = DataMessageStanza {
            id: Some("m1".into()),
            ..Default::default()
        };
        let message = to_push_message(stanza).unwrap();
        assert_eq!(message.persistent_id, "m1");
        assert!(to_push_message(DataMessageStanza::default()).is_none());
    }

    #[tokio::test]
    async fn data_messages_flow_until_close() {
        let (client, mut server) = tokio::io::duplex(4096);
        server
            .write_all(&wire(&[data("0:1", "m1"), data("0:2", "m2"), Frame::Close(Close {})]))
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let end = run_session(
            McsConnection::new(client),
            &tx,
            &CancellationToken::new(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();
        assert_eq!(end, SessionEnd::ClosedByServer);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.persistent_id, "0:1");
        assert_eq!(first.message_id, "m1");
        assert_eq!(first.data["FermaxNotificationType"], "Call");
        assert_eq!(rx.recv().await.unwrap().persistent_id, "0:2");
    }

    #[tokio::test]
    async fn server_ping_gets_an_ack() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, mut server_write) = tokio::io::split(server);
        server_write
            .write_all(&wire(&[Frame::HeartbeatPing(HeartbeatPing::default())]))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(8);
        let session = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                run_session(McsConnection::new(client), &tx, &cancel, Duration::from_secs(60)).await
            }
        });

        // Client frames carry no version byte on this side; prepend one so
        // the reader accepts them.
        let mut inbound = McsConnection::new((&[MCS_VERSION][..]).chain(server_read));
        match inbound.receive().await.unwrap() {
            Frame::HeartbeatAck(ack) => assert_eq!(ack.last_stream_id_received, Some(1)),
            other => panic!("expected ack, got {other:?}"),
        }

        cancel.cancel();
        assert_eq!(session.await.unwrap().unwrap(), SessionEnd::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn client_sends_heartbeats_on_interval() {
        let (client, server) = tokio::io::duplex(4096);
        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let session = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                run_session(McsConnection::new(client), &tx, &cancel, Duration::from_secs(30)).await
            }
        });

        let mut inbound = McsConnection::new((&[MCS_VERSION][..]).chain(server));
        let frame = inbound.receive().await.unwrap();
        assert!(matches!(frame, Frame::HeartbeatPing(_)));

        cancel.cancel();
        assert_eq!(session.await.unwrap().unwrap(), SessionEnd::Cancelled);
    }

    #[tokio::test]
    async fn dropped_receiver_ends_session() {
        let (client, mut server) = tokio::io::duplex(4096);
        server.write_all(&wire(&[data("0:1", "m1")])).await.unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let end = run_session(
            McsConnection::new(client),
            &tx,
            &CancellationToken::new(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();
        assert_eq!(end, SessionEnd::ReceiverGone);
    }
}
