// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MCS wire framing.
//!
//! The client opens with a single version byte, then every message is a tag
//! byte, a varint body length, and a protobuf body. The server answers with
//! its own version byte before its first frame.

use bluecon_core::BlueconError;
use bytes::{Buf, BufMut, BytesMut};
use prost::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::proto::{
    Close, DataMessageStanza, HeartbeatAck, HeartbeatPing, IqStanza, LoginRequest, LoginResponse,
};

/// Protocol version sent on connect.
pub const MCS_VERSION: u8 = 41;

/// Oldest server version still understood.
const MIN_SERVER_VERSION: u8 = 38;

/// Upper bound on a single frame body.
const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

mod tag {
    pub const HEARTBEAT_PING: u8 = 0;
    pub const HEARTBEAT_ACK: u8 = 1;
    pub const LOGIN_REQUEST: u8 = 2;
    pub const LOGIN_RESPONSE: u8 = 3;
    pub const CLOSE: u8 = 4;
    pub const IQ_STANZA: u8 = 7;
    pub const DATA_MESSAGE: u8 = 8;
}

/// One decoded MCS message.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    HeartbeatPing(HeartbeatPing),
    HeartbeatAck(HeartbeatAck),
    LoginRequest(LoginRequest),
    LoginResponse(LoginResponse),
    Close(Close),
    Iq(IqStanza),
    Data(DataMessageStanza),
    /// A tag this client does not handle; the body is skipped.
    Unknown(u8),
}

impl Frame {
    fn tag(&self) -> u8 {
        match self {
            Frame::HeartbeatPing(_) => tag::HEARTBEAT_PING,
            Frame::HeartbeatAck(_) => tag::HEARTBEAT_ACK,
            Frame::LoginRequest(_) => tag::LOGIN_REQUEST,
            Frame::LoginResponse(_) => tag::LOGIN_RESPONSE,
            Frame::Close(_) => tag::CLOSE,
            Frame::Iq(_) => tag::IQ_STANZA,
            Frame::Data(_) => tag::DATA_MESSAGE,
            Frame::Unknown(tag) => *tag,
        }
    }

    /// Appends tag, length, and body to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        let body = match self {
            Frame::HeartbeatPing(m) => m.encode_to_vec(),
            Frame::HeartbeatAck(m) => m.encode_to_vec(),
            Frame::LoginRequest(m) => m.encode_to_vec(),
            Frame::LoginResponse(m) => m.encode_to_vec(),
            Frame::Close(m) => m.encode_to_vec(),
            Frame::Iq(m) => m.encode_to_vec(),
            Frame::Data(m) => m.encode_to_vec(),
            Frame::Unknown(_) => Vec::new(),
        };
        buf.put_u8(self.tag());
        prost::encoding::encode_varint(body.len() as u64, buf);
        buf.put_slice(&body);
    }

    fn decode(tag: u8, body: &[u8]) -> Result<Self, BlueconError> {
        let frame = match tag {
            tag::HEARTBEAT_PING => Frame::HeartbeatPing(decode_body(body)?),
            tag::HEARTBEAT_ACK => Frame::HeartbeatAck(decode_body(body)?),
            tag::LOGIN_REQUEST => Frame::LoginRequest(decode_body(body)?),
            tag::LOGIN_RESPONSE => Frame::LoginResponse(decode_body(body)?),
            tag::CLOSE => Frame::Close(decode_body(body)?),
            tag::IQ_STANZA => Frame::Iq(decode_body(body)?),
            tag::DATA_MESSAGE => Frame::Data(decode_body(body)?),
            other => Frame::Unknown(other),
        };
        Ok(frame)
    }
}

fn decode_body<M: Message + Default>(body: &[u8]) -> Result<M, BlueconError> {
    M::decode(body).map_err(|e| BlueconError::transport("malformed MCS frame body", e))
}

fn protocol_error(message: impl Into<String>) -> BlueconError {
    BlueconError::Transport {
        message: message.into(),
        source: None,
    }
}

/// Reads a varint from the front of `buf` without consuming it.
///
/// Returns the value and its encoded width, or `None` if more bytes are
/// needed.
fn peek_varint(buf: &[u8]) -> Result<Option<(u64, usize)>, BlueconError> {
    let mut value = 0u64;
    for (i, byte) in buf.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }
    if buf.len() >= 10 {
        return Err(protocol_error("MCS frame length varint is too long"));
    }
    Ok(None)
}

/// Splits one complete frame off the front of `buf`, if present.
pub fn parse_frame(buf: &mut BytesMut) -> Result<Option<Frame>, BlueconError> {
    let Some(&tag) = buf.first() else {
        return Ok(None);
    };
    let Some((len, width)) = peek_varint(&buf[1..])? else {
        return Ok(None);
    };
    let len = usize::try_from(len)
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| protocol_error(format!("MCS frame of {len} bytes exceeds limit")))?;

    let header = 1 + width;
    if buf.len() < header + len {
        return Ok(None);
    }
    buf.advance(header);
    let body = buf.split_to(len);
    Frame::decode(tag, &body).map(Some)
}

/// A framed MCS stream.
///
/// [`receive`](Self::receive) is cancel safe: partial reads stay in the
/// internal buffer, so it can sit inside `tokio::select!` next to timers.
pub struct McsConnection<S> {
    stream: S,
    buf: BytesMut,
    version_checked: bool,
    received: i32,
}

impl<S> McsConnection<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(4096),
            version_checked: false,
            received: 0,
        }
    }

    /// Number of frames received so far, reported back in heartbeats.
    pub fn last_stream_id_received(&self) -> i32 {
        self.received
    }
}

impl<S: AsyncRead + Unpin> McsConnection<S> {
    /// Waits for the next frame. End of stream is a transport error.
    pub async fn receive(&mut self) -> Result<Frame, BlueconError> {
        loop {
            if !self.version_checked && !self.buf.is_empty() {
                let version = self.buf.get_u8();
                if version < MIN_SERVER_VERSION {
                    return Err(protocol_error(format!(
                        "unsupported MCS server version {version}"
                    )));
                }
                self.version_checked = true;
            }
            if self.version_checked
                && let Some(frame) = parse_frame(&mut self.buf)?
            {
                self.received += 1;
                trace!(tag = frame.tag(), "MCS frame received");
                return Ok(frame);
            }

            let read = self
                .stream
                .read_buf(&mut self.buf)
                .await
                .map_err(|e| BlueconError::transport("MCS read failed", e))?;
            if read == 0 {
                return Err(protocol_error("MCS connection closed by peer"));
            }
        }
    }
}

impl<S: AsyncWrite + Unpin> McsConnection<S> {
    pub async fn send(&mut self, frame: &Frame) -> Result<(), BlueconError> {
        let mut out = BytesMut::new();
        frame.encode(&mut out);
        self.write(&out).await
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), BlueconError> {
        self.stream
            .write_all(bytes)
            .await
            .map_err(|e| BlueconError::transport("MCS write failed", e))?;
        self.stream
            .flush()
            .await
            .map_err(|e| BlueconError::transport("MCS flush failed", e))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> McsConnection<S> {
    /// Sends the version byte and `request`, then waits for the login
    /// response. A response carrying an error is a transport error.
    pub async fn login(
        stream: S,
        request: LoginRequest,
    ) -> Result<(Self, LoginResponse), BlueconError> {
        let mut conn = Self::new(stream);
        let mut out = BytesMut::new();
        out.put_u8(MCS_VERSION);
        Frame::LoginRequest(request).encode(&mut out);
        conn.write(&out).await?;

        match conn.receive().await? {
            Frame::LoginResponse(response) => {
                if let Some(error) = &response.error {
                    return Err(protocol_error(format!(
                        "MCS login rejected: code {} {}",
                        error.code,
                        error.message.as_deref().unwrap_or_default()
                    )));
                }
                Ok((conn, response))
            }
            other => Err(protocol_error(format!(
                "expected MCS login response, got tag {}",
                other.tag()
            ))),
        }
    }
}
