//! Framed TCP server used by the proxy and data nodes.
//!
//! Accepts connections and runs one read loop per connection. Each inbound
//! frame is handed to a [`FrameHandler`] together with a [`ReplySender`]
//! bound to that connection, so replies are fire-and-forget writes back to
//! the originating peer.

use crate::error::{NetworkError, Result};
use crate::network::rpc::MAX_MESSAGE_SIZE;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Write side of one server connection, shared with handlers.
///
/// Sending is fire-and-forget: if the peer is gone, the frame is dropped
/// and logged, never surfaced as an error into the handler path.
#[derive(Debug, Clone)]
pub struct ReplySender {
    conn_id: u64,
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl ReplySender {
    /// Queue a pre-framed reply for this connection.
    pub fn send(&self, frame: Vec<u8>) {
        if self.tx.send(frame).is_err() {
            debug!(conn_id = self.conn_id, "reply dropped, connection closed");
        }
    }

    /// Id of the connection this sender writes to.
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }
}

#[cfg(test)]
impl ReplySender {
    /// Detached sender plus its receiving end, for tests that need to
    /// observe replies without a socket.
    pub(crate) fn test_pair(conn_id: u64) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { conn_id, tx }, rx)
    }
}

/// Handler for inbound frames.
pub trait FrameHandler: Send + Sync + 'static {
    /// Called once per decoded frame, from the connection's read task.
    /// Must not block; long work belongs on a queue or task.
    fn on_frame(&self, conn_id: u64, frame: Vec<u8>, replies: &ReplySender);

    /// Called when a connection closes.
    fn on_disconnect(&self, _conn_id: u64) {}
}

/// Framed TCP server.
pub struct NetworkServer {
    listener: TcpListener,
    handler: Arc<dyn FrameHandler>,
    shutdown_rx: mpsc::Receiver<()>,
    next_conn_id: Arc<AtomicU64>,
}

impl NetworkServer {
    /// Bind the listener. Returns the server and its shutdown signal.
    pub async fn bind(
        bind_addr: SocketAddr,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<(Self, mpsc::Sender<()>)> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(NetworkError::Io)?;
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let server = Self {
            listener,
            handler,
            shutdown_rx,
            next_conn_id: Arc::new(AtomicU64::new(1)),
        };
        Ok((server, shutdown_tx))
    }

    /// Actual bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr().map_err(NetworkError::Io)?)
    }

    /// Run the accept loop until the shutdown signal arrives.
    pub async fn run(mut self) -> Result<()> {
        info!(addr = %self.local_addr()?, "server listening");

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
                            debug!(conn_id, peer = %peer_addr, "accepted connection");
                            let handler = self.handler.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, conn_id, handler).await;
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    info!("server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn handle_connection(stream: TcpStream, conn_id: u64, handler: Arc<dyn FrameHandler>) {
    let (mut read_half, mut write_half) = stream.into_split();

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = reply_rx.recv().await {
            if let Err(e) = write_half.write_all(&frame).await {
                debug!(conn_id, error = %e, "reply write failed");
                break;
            }
        }
    });

    let replies = ReplySender {
        conn_id,
        tx: reply_tx,
    };

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

        let mut frame = vec![0u8; len];
        if read_half.read_exact(&mut frame).await.is_err() {
            break;
        }

        handler.on_frame(conn_id, frame, &replies);
    }

    handler.on_disconnect(conn_id);
    debug!(conn_id, "connection closed");
    // Dropping `replies` ends the writer after it drains queued replies.
    drop(replies);
    let _ = writer.await;
}
