//! Source RCON client used to talk back to the Minecraft server.
//!
//! Packets are framed as:
//! ```text
//! [ i32 LE: length ][ i32 LE: request id ][ i32 LE: type ][ body ][ 0x00 0x00 ]
//! ```
//! where `length` counts everything after itself.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time;
use tracing::{debug, info, warn};

pub const TYPE_RESPONSE: i32 = 0;
pub const TYPE_COMMAND: i32 = 2;
pub const TYPE_LOGIN: i32 = 3;

/// id + type + two NUL terminators
const HEADER_LEN: usize = 10;
/// Minecraft caps response bodies at 4096 bytes; anything far beyond is garbage.
pub const MAX_PACKET_LEN: usize = 4096 + HEADER_LEN;

#[derive(Error, Debug)]
pub enum RconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Packet too large: {0} bytes (max: {MAX_PACKET_LEN})")]
    PacketTooLarge(usize),
    #[error("Invalid packet length: {0}")]
    InvalidLength(i32),
    #[error("Authentication failed")]
    AuthFailed,
    #[error("Unexpected response id {got}, expected {expected}")]
    UnexpectedId { expected: i32, got: i32 },
    #[error("Connection closed by server")]
    Closed,
    #[error("No response from server")]
    NoResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }
}

pub fn encode(packet: &Packet) -> Result<Bytes, RconError> {
    let len = HEADER_LEN + packet.body.len();
    if len > MAX_PACKET_LEN {
        return Err(RconError::PacketTooLarge(len));
    }

    let mut buf = BytesMut::with_capacity(4 + len);
    buf.put_i32_le(len as i32);
    buf.put_i32_le(packet.id);
    buf.put_i32_le(packet.kind);
    buf.put_slice(packet.body.as_bytes());
    buf.put_u8(0);
    buf.put_u8(0);

    Ok(buf.freeze())
}

/// Returns `Ok(None)` until `buf` holds a whole packet.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Packet>, RconError> {
    if buf.len() < 4 {
        return Ok(None);
    }

    let len = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if len < HEADER_LEN as i32 || len as usize > MAX_PACKET_LEN {
        return Err(RconError::InvalidLength(len));
    }

    let total = 4 + len as usize;
    if buf.len() < total {
        return Ok(None);
    }

    buf.advance(4);
    let mut frame = buf.split_to(len as usize);
    let id = frame.get_i32_le();
    let kind = frame.get_i32_le();
    let body_len = frame.len() - 2;
    let body = String::from_utf8_lossy(&frame[..body_len]).into_owned();

    Ok(Some(Packet { id, kind, body }))
}

#[derive(Debug, Clone)]
pub struct RconSettings {
    pub address: String,
    pub password: String,
    /// How long a query may take before reconnecting.
    pub wait: Duration,
    /// How long the retry after reconnecting may take.
    pub failed: Duration,
}

#[derive(Debug)]
struct Connection {
    stream: TcpStream,
    buffer: BytesMut,
}

impl Connection {
    async fn send(&mut self, packet: &Packet) -> Result<(), RconError> {
        let bytes = encode(packet)?;
        self.stream.write_all(&bytes).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Packet, RconError> {
        loop {
            if let Some(packet) = decode(&mut self.buffer)? {
                return Ok(packet);
            }
            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(RconError::Closed);
            }
        }
    }
}

/// A single lazily (re)connected RCON session. Queries are serialized.
#[derive(Debug)]
pub struct RconClient {
    settings: RconSettings,
    connection: Mutex<Option<Connection>>,
    next_id: AtomicI32,
}

impl RconClient {
    pub fn new(settings: RconSettings) -> Self {
        Self {
            settings,
            connection: Mutex::new(None),
            next_id: AtomicI32::new(0),
        }
    }

    fn next_id(&self) -> i32 {
        // RCON reserves -1 for auth failure; wrap well before that.
        self.next_id.fetch_add(1, Ordering::SeqCst).rem_euclid(i32::MAX - 1) + 1
    }

    async fn connect(&self) -> Result<Connection, RconError> {
        let stream = TcpStream::connect(&self.settings.address).await?;
        let mut conn = Connection {
            stream,
            buffer: BytesMut::with_capacity(MAX_PACKET_LEN),
        };

        let id = self.next_id();
        conn.send(&Packet::new(id, TYPE_LOGIN, self.settings.password.clone()))
            .await?;

        loop {
            let reply = conn.receive().await?;
            if reply.id == -1 {
                return Err(RconError::AuthFailed);
            }
            // Some servers send an empty RESPONSE_VALUE before the auth reply.
            if reply.kind == TYPE_COMMAND && reply.id == id {
                break;
            }
        }

        info!("RCON connected to {}", self.settings.address);
        Ok(conn)
    }

    async fn roundtrip(&self, command: &str) -> Result<String, RconError> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(RconError::Closed);
        };

        let id = self.next_id();
        let result = async {
            conn.send(&Packet::new(id, TYPE_COMMAND, command)).await?;
            let reply = conn.receive().await?;
            if reply.id != id {
                return Err(RconError::UnexpectedId {
                    expected: id,
                    got: reply.id,
                });
            }
            Ok(reply.body)
        }
        .await;

        if result.is_err() {
            *guard = None;
        }
        result
    }

    /// Runs `command` and returns the server's reply. A query that exceeds
    /// `wait` drops the connection and is retried once with the `failed` budget.
    pub async fn query(&self, command: &str) -> Result<String, RconError> {
        debug!("RCON > {}", command);
        match time::timeout(self.settings.wait, self.roundtrip(command)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("RCON query timed out, reconnecting: {}", command);
                self.disconnect().await;
                time::timeout(self.settings.failed, self.roundtrip(command))
                    .await
                    .map_err(|_| RconError::NoResponse)?
            }
        }
    }

    pub async fn disconnect(&self) {
        self.connection.lock().await.take();
    }
}
