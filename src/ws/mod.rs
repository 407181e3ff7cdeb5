//! Core WebSocket infrastructure.
//!
//! # Architecture
//!
//! - [`connection`]: the Idle/Connecting/Open/Closed state machine with
//!   backoff-driven reconnection and topic replay
//! - [`transport`]: the [`Connector`] seam and its `tokio-tungstenite` implementation
//! - [`address`]: resolution of the configured address into a `ws(s)://` URL
//! - [`config`]: reconnect policy and heartbeat settings

pub mod address;
pub mod config;
pub mod connection;
pub mod error;
pub mod transport;

pub use config::{Config, ReconnectConfig};
pub use connection::{CloseEvent, ConnectionState, OpenEvent};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use transport::{Connector, Outbound, TransportEvents, TransportHandle, TungsteniteConnector};
