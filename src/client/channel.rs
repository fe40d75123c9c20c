//! Channels: one connection plus one correlator per remote endpoint.
//!
//! A [`Channel`] bundles a transport connection with its own request
//! correlator and a dispatch task that turns inbound frames into resolved
//! pending entries. The [`ChannelRegistry`] lazily creates and caches one
//! channel per data node; channels for different nodes are fully
//! independent.

use crate::client::correlator::RequestCorrelator;
use crate::error::{NetworkError, Result};
use crate::network::rpc::{decode_message, frame_message, DataReply, RoutingReply};
use crate::network::transport::{Connection, TransportEvent};
use crate::types::{NodeAddr, RequestId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A reply message that can be correlated back to its request.
pub trait ReplyMessage: DeserializeOwned + Debug + Send + 'static {
    /// Request id this reply answers.
    fn rid(&self) -> RequestId;
}

impl ReplyMessage for RoutingReply {
    fn rid(&self) -> RequestId {
        self.rid
    }
}

impl ReplyMessage for DataReply {
    fn rid(&self) -> RequestId {
        self.rid
    }
}

/// One logical connection to a remote endpoint: transport connection plus a
/// dedicated correlator and reply-dispatch task.
#[derive(Debug)]
pub struct Channel<R: ReplyMessage> {
    connection: Connection,
    correlator: Arc<RequestCorrelator<R>>,
    dispatch: JoinHandle<()>,
    request_timeout: Option<Duration>,
    closed: Arc<AtomicBool>,
}

impl<R: ReplyMessage> Channel<R> {
    /// Connect to `addr` and start dispatching replies.
    pub async fn open(
        conn_id: u64,
        addr: &str,
        connect_timeout: Duration,
        request_timeout: Option<Duration>,
    ) -> Result<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connection = Connection::connect(conn_id, addr, connect_timeout, events_tx).await?;
        let correlator = Arc::new(RequestCorrelator::new());
        let closed = Arc::new(AtomicBool::new(false));
        let dispatch = tokio::spawn(dispatch_replies(
            events_rx,
            correlator.clone(),
            closed.clone(),
        ));

        Ok(Self {
            connection,
            correlator,
            dispatch,
            request_timeout,
            closed,
        })
    }

    /// Whether the underlying connection has dropped. A closed channel
    /// rejects every new request; callers redial through the registry.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send `request` and register its pending entry, without waiting.
    ///
    /// The entry is registered before the frame is handed to the writer so
    /// a fast reply can never race past its waiter.
    pub fn add_task<Q: Serialize>(
        &self,
        rid: RequestId,
        request: &Q,
    ) -> Result<tokio::sync::oneshot::Receiver<Result<R>>> {
        if self.is_closed() {
            return Err(NetworkError::ConnectionClosed.into());
        }
        let frame = frame_message(request)?;
        let rx = self.correlator.register(rid);
        if let Err(e) = self.connection.send(frame) {
            self.correlator.discard(rid);
            return Err(e.into());
        }
        // The disconnect may have landed between the first check and the
        // register; entries added after fail_all would otherwise wait on a
        // dead connection.
        if self.is_closed() {
            self.correlator.discard(rid);
            return Err(NetworkError::ConnectionClosed.into());
        }
        Ok(rx)
    }

    /// Send `request` and wait for its reply.
    pub async fn call<Q: Serialize>(&self, rid: RequestId, request: &Q) -> Result<R> {
        let rx = self.add_task(rid, request)?;
        self.correlator.wait(rid, rx, self.request_timeout).await
    }

    /// Number of requests still awaiting a reply on this channel.
    pub fn pending_count(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Tear the channel down, failing every pending entry.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.dispatch.abort();
        self.connection.shutdown();
        self.correlator.fail_all();
    }
}

/// Turn transport events into resolved pending entries.
async fn dispatch_replies<R: ReplyMessage>(
    mut events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    correlator: Arc<RequestCorrelator<R>>,
    closed: Arc<AtomicBool>,
) {
    while let Some(event) = events_rx.recv().await {
        match event {
            TransportEvent::Received { conn_id, bytes } => {
                match decode_message::<R>(&bytes) {
                    Ok(reply) => correlator.resolve(reply.rid(), reply),
                    Err(e) => {
                        warn!(conn_id, error = %e, "dropping undecodable reply");
                    }
                }
            }
            TransportEvent::Disconnected { conn_id } => {
                debug!(conn_id, "connection dropped, failing pending requests");
                // Closed must be visible before fail_all so no new entry can
                // slip in behind the sweep.
                closed.store(true, Ordering::SeqCst);
                correlator.fail_all();
                break;
            }
            TransportEvent::Connected { .. } | TransportEvent::Sent { .. } => {}
        }
    }
}

/// Lazily created, cached channels to data nodes, one per node address.
///
/// The registry lock is scoped to lookup-or-insert; once a channel is
/// handed out it needs no further registry involvement.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: Mutex<HashMap<NodeAddr, Arc<Channel<DataReply>>>>,
    next_conn_id: AtomicU64,
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl ChannelRegistry {
    pub fn new(connect_timeout: Duration, request_timeout: Option<Duration>) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            // conn id 0 is the proxy channel.
            next_conn_id: AtomicU64::new(1),
            connect_timeout,
            request_timeout,
        }
    }

    /// Fetch the channel for `node`, dialing it on first use.
    ///
    /// A cached channel whose connection has dropped is evicted and the
    /// node is redialed, so one dead connection never wedges a node.
    pub async fn get_channel(&self, node: &str) -> Result<Arc<Channel<DataReply>>> {
        let mut channels = self.channels.lock().await;
        if let Some(channel) = channels.get(node) {
            if !channel.is_closed() {
                return Ok(channel.clone());
            }
            debug!(node, "evicting closed data channel");
            if let Some(stale) = channels.remove(node) {
                stale.shutdown();
            }
        }

        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let channel = Arc::new(
            Channel::open(conn_id, node, self.connect_timeout, self.request_timeout).await?,
        );
        channels.insert(node.to_string(), channel.clone());
        debug!(node, conn_id, "opened data channel");
        Ok(channel)
    }

    /// Number of cached channels.
    pub async fn channel_count(&self) -> usize {
        self.channels.lock().await.len()
    }

    /// Tear down every cached channel.
    pub async fn shutdown(&self) {
        let mut channels = self.channels.lock().await;
        for (node, channel) in channels.drain() {
            debug!(node, "closing data channel");
            channel.shutdown();
        }
    }
}
