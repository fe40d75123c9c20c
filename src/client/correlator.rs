//! Request/reply correlation.
//!
//! Matches outstanding requests to their eventual replies by request id.
//! Each pending entry is a oneshot sender, so a reply resolves its waiter
//! exactly once by construction; a second resolve for the same id finds no
//! entry and is dropped as stale. Entries carry a `Result` so a dropped
//! connection resolves its waiters with a network error, never with a
//! fabricated protocol reply.

use crate::error::{Error, NetworkError, Result};
use crate::types::RequestId;
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Pending-request table keyed by request id.
#[derive(Debug, Default)]
pub struct RequestCorrelator<R> {
    pending: DashMap<RequestId, oneshot::Sender<Result<R>>>,
}

impl<R: Send + 'static> RequestCorrelator<R> {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Number of requests still awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Register a pending entry for `rid` before the request is sent.
    ///
    /// At most one entry may exist per id; ids come from a per-client
    /// counter, so a collision here is a caller bug.
    pub fn register(&self, rid: RequestId) -> oneshot::Receiver<Result<R>> {
        let (tx, rx) = oneshot::channel();
        let previous = self.pending.insert(rid, tx);
        debug_assert!(previous.is_none(), "duplicate pending entry for rid {rid}");
        rx
    }

    /// Drop the pending entry for `rid`, e.g. when the send itself failed.
    pub fn discard(&self, rid: RequestId) {
        self.pending.remove(&rid);
    }

    /// Resolve the pending entry for `rid` with `reply`.
    ///
    /// Called from the receive path; a reply with no matching entry is a
    /// stale or duplicate and is logged and dropped, never an error.
    pub fn resolve(&self, rid: RequestId, reply: R) {
        match self.pending.remove(&rid) {
            Some((_, tx)) => {
                // The waiter may have timed out between remove and send;
                // the reply is then dropped with the closed channel.
                let _ = tx.send(Ok(reply));
            }
            None => {
                debug!(rid, "dropping reply with no pending entry");
            }
        }
    }

    /// Resolve every pending entry with [`NetworkError::ConnectionClosed`].
    ///
    /// Used when the underlying connection drops so no waiter hangs forever.
    pub fn fail_all(&self) {
        let rids: Vec<RequestId> = self.pending.iter().map(|entry| *entry.key()).collect();
        for rid in rids {
            if let Some((_, tx)) = self.pending.remove(&rid) {
                let _ = tx.send(Err(NetworkError::ConnectionClosed.into()));
            }
        }
    }

    /// Await the reply for `rid` on its registered receiver.
    ///
    /// With a timeout configured, a lost reply surfaces as [`Error::Timeout`]
    /// and the pending entry is removed so the late reply, if it ever
    /// arrives, is dropped as stale. Without one this waits until the
    /// entry is resolved or the connection fails.
    pub async fn wait(
        &self,
        rid: RequestId,
        rx: oneshot::Receiver<Result<R>>,
        timeout: Option<Duration>,
    ) -> Result<R> {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.discard(rid);
                    return Err(Error::Timeout);
                }
            },
            None => rx.await,
        };
        received.map_err(|_| Error::Network(NetworkError::ConnectionClosed))?
    }
}
