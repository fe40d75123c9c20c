//! Client-side transport connection.
//!
//! One [`Connection`] owns one TCP stream: a writer task drains an mpsc
//! channel of pre-framed messages, a reader task turns inbound frames into
//! [`TransportEvent`]s for the owner to dispatch. Frame buffers are owned by
//! exactly one side at a time, so there is no reclaim step to get wrong.

use crate::error::NetworkError;
use crate::network::rpc::MAX_MESSAGE_SIZE;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Completion events delivered by a connection to its owner.
#[derive(Debug)]
pub enum TransportEvent {
    /// A full frame body arrived.
    Received { conn_id: u64, bytes: Vec<u8> },
    /// An outbound frame was fully written.
    Sent { conn_id: u64 },
    /// The connection was established.
    Connected { conn_id: u64 },
    /// The connection dropped; no further events follow.
    Disconnected { conn_id: u64 },
}

/// A single TCP connection with dedicated reader and writer tasks.
#[derive(Debug)]
pub struct Connection {
    conn_id: u64,
    outgoing_tx: mpsc::UnboundedSender<Vec<u8>>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Connect to `addr` and start the reader/writer tasks.
    ///
    /// Events for this connection are delivered on `events`, starting with
    /// [`TransportEvent::Connected`] and ending with
    /// [`TransportEvent::Disconnected`].
    pub async fn connect(
        conn_id: u64,
        addr: &str,
        connect_timeout: Duration,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self, NetworkError> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| NetworkError::ConnectionFailed {
                addr: addr.to_string(),
                reason: "connect timeout".to_string(),
            })?
            .map_err(|e| NetworkError::ConnectionFailed {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;
        let _ = stream.set_nodelay(true);

        let (read_half, write_half) = stream.into_split();
        let _ = events.send(TransportEvent::Connected { conn_id });

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(conn_id, write_half, outgoing_rx, events.clone()));
        let reader = tokio::spawn(read_loop(conn_id, read_half, events));

        debug!(conn_id, addr, "connection established");
        Ok(Self {
            conn_id,
            outgoing_tx,
            writer,
            reader,
        })
    }

    /// Connection id, unique within the owning client.
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    /// Queue a pre-framed message for transmission.
    ///
    /// Never blocks; the frame is written by the writer task. Fails only if
    /// the connection is already torn down.
    pub fn send(&self, frame: Vec<u8>) -> Result<(), NetworkError> {
        self.outgoing_tx
            .send(frame)
            .map_err(|_| NetworkError::ConnectionClosed)
    }

    /// Tear down both tasks. The reader emits a final `Disconnected` event
    /// if the peer closed first; after `shutdown` no further events arrive.
    pub fn shutdown(&self) {
        self.writer.abort();
        self.reader.abort();
    }
}

async fn write_loop(
    conn_id: u64,
    mut write_half: OwnedWriteHalf,
    mut outgoing_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    while let Some(frame) = outgoing_rx.recv().await {
        if let Err(e) = write_half.write_all(&frame).await {
            debug!(conn_id, error = %e, "write failed, stopping writer");
            break;
        }
        let _ = events.send(TransportEvent::Sent { conn_id });
    }
}

async fn read_loop(
    conn_id: u64,
    mut read_half: OwnedReadHalf,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    loop {
        let mut len_buf = [0u8; 4];
        if read_half.read_exact(&mut len_buf).await.is_err() {
            break;
        }

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_MESSAGE_SIZE {
            warn!(conn_id, len, "inbound frame exceeds size cap, closing");
            break;
        }

        let mut bytes = vec![0u8; len];
        if read_half.read_exact(&mut bytes).await.is_err() {
            break;
        }

        if events
            .send(TransportEvent::Received { conn_id, bytes })
            .is_err()
        {
            // Owner went away; nothing left to deliver to.
            break;
        }
    }
    let _ = events.send(TransportEvent::Disconnected { conn_id });
}
