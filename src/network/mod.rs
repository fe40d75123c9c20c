//! Network layer: wire codecs, framed TCP server and client connections.

pub mod rpc;
pub mod server;
pub mod transport;

pub use rpc::{
    decode_message, encode_message, frame_message, DataOp, DataReply, DataRequest, RoutingOp,
    RoutingReply, RoutingRequest, MAX_MESSAGE_SIZE,
};
pub use server::{FrameHandler, NetworkServer, ReplySender};
pub use transport::{Connection, TransportEvent};
