//! Network Module
//!
//! Client-side socket plumbing.
//!
//! ## Architecture
//! - `resolver`: host and numeric or service-name port to candidate addresses
//! - `transport`: capability interface over the OS socket (connect by name,
//!   send, receive, shutdown) plus the std-net TCP adapter
//! - `connection`: one transport, one receive thread, one delivery callback
//!
//! The connection delivers raw chunks. There is no framing on the wire, so a
//! chunk is whatever a single read returned.

mod connection;
mod resolver;
mod transport;

pub use connection::{Connection, MessageHandler, RunState, RECV_BUFFER_SIZE};
pub use resolver::resolve;
pub use transport::{Connector, TcpConnector, TcpTransport, Transport};
