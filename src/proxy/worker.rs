//! Request queue and its single consumer.
//!
//! The network receive path enqueues decoded requests without ever blocking;
//! one dedicated worker task dequeues them with a bounded timed wait so it
//! can observe the stop flag between requests. At most one request is being
//! processed at any instant, which keeps each reply happening-after its
//! triggering request.

use crate::network::rpc::{frame_message, RoutingRequest};
use crate::network::server::ReplySender;
use crate::proxy::router::ProxyRouter;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// One decoded routing request plus the write side of its connection.
#[derive(Debug)]
pub struct QueuedRequest {
    pub request: RoutingRequest,
    pub replies: ReplySender,
}

/// Producer side of the request queue. Cheap to clone, never blocks.
#[derive(Debug, Clone)]
pub struct RequestQueue {
    tx: mpsc::UnboundedSender<QueuedRequest>,
}

impl RequestQueue {
    /// Create the queue, returning the producer and the consumer end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<QueuedRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue a request from the receive path.
    pub fn push(&self, task: QueuedRequest) {
        if self.tx.send(task).is_err() {
            warn!("request dropped, worker queue closed");
        }
    }
}

/// Single-consumer worker draining the request queue.
pub struct Worker {
    stop: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Spawn the worker task over the consumer end of the queue.
    pub fn spawn(
        router: Arc<ProxyRouter>,
        mut rx: mpsc::UnboundedReceiver<QueuedRequest>,
        poll_interval: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = tokio::spawn(async move {
            loop {
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }
                match tokio::time::timeout(poll_interval, rx.recv()).await {
                    Ok(Some(task)) => process(&router, task),
                    // Queue closed: all producers gone, nothing more to do.
                    Ok(None) => break,
                    // Timed out: loop around and re-check the stop flag.
                    Err(_) => continue,
                }
            }
            // Requests still queued at this point are dropped, best effort.
            debug!("worker stopped");
        });

        Self {
            stop,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signal the worker to stop after the current request.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Wait for the worker task to finish. Returns within one poll interval
    /// of [`Worker::stop`] being called.
    pub async fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// Process one request: resolve, encode, fire-and-forget the reply.
fn process(router: &ProxyRouter, task: QueuedRequest) {
    let reply = router.handle_routing_request(&task.request);
    match frame_message(&reply) {
        Ok(frame) => task.replies.send(frame),
        Err(e) => error!(rid = reply.rid, error = %e, "failed to encode routing reply"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::rpc::RoutingRequest;
    use tokio::time::Instant;

    fn test_router() -> Arc<ProxyRouter> {
        Arc::new(ProxyRouter::new(&["a:1".to_string()], 5).unwrap())
    }

    fn reply_sender() -> (ReplySender, mpsc::UnboundedReceiver<Vec<u8>>) {
        crate::network::server::ReplySender::test_pair(1)
    }

    #[tokio::test]
    async fn test_processes_queued_requests() {
        let (queue, rx) = RequestQueue::new();
        let worker = Worker::spawn(test_router(), rx, Duration::from_millis(100));

        let (replies, mut reply_rx) = reply_sender();
        queue.push(QueuedRequest {
            request: RoutingRequest::get_hosts(1, 42),
            replies,
        });

        let frame = tokio::time::timeout(Duration::from_secs(2), reply_rx.recv())
            .await
            .expect("worker must reply")
            .expect("reply channel open");
        // Length-prefixed frame carrying a RoutingReply.
        let reply: crate::network::rpc::RoutingReply =
            crate::network::rpc::decode_message(&frame[4..]).unwrap();
        assert!(reply.success);
        assert_eq!(reply.rid, 1);
        assert_eq!(reply.host, "a:1");

        worker.stop();
        worker.join().await;
    }

    #[tokio::test]
    async fn test_stop_joins_promptly() {
        let (queue, rx) = RequestQueue::new();
        let poll = Duration::from_millis(100);
        let worker = Worker::spawn(test_router(), rx, poll);

        // Leave requests in the queue; stop must not wait for them.
        let (replies, _reply_rx) = reply_sender();
        for rid in 0..3 {
            queue.push(QueuedRequest {
                request: RoutingRequest::get_hosts(rid, rid),
                replies: replies.clone(),
            });
        }

        let start = Instant::now();
        worker.stop();
        tokio::time::timeout(Duration::from_secs(2), worker.join())
            .await
            .expect("join must be bounded by the poll interval");
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_queue_close_stops_worker() {
        let (queue, rx) = RequestQueue::new();
        let worker = Worker::spawn(test_router(), rx, Duration::from_millis(100));

        drop(queue);
        tokio::time::timeout(Duration::from_secs(2), worker.join())
            .await
            .expect("worker must stop when the queue closes");
    }
}
