//! The sharding proxy: routes key hashes to data nodes over the hash ring.
//!
//! Requests flow decode → queue → single worker → reply. The worker is the
//! only place routing requests are processed, so the ring is read from one
//! task at a time per proxy instance while membership changes may arrive
//! concurrently from outside.

pub mod router;
pub mod server;
pub mod worker;

pub use router::ProxyRouter;
pub use server::ProxyServer;
pub use worker::{QueuedRequest, RequestQueue, Worker};
