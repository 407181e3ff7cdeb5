#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod binding;
pub mod client;
pub(crate) mod dispatch;
pub mod error;
pub mod topics;
pub mod types;
pub mod ws;

pub use client::Client;
pub use dispatch::HandlerResult;
pub use ws::{CloseEvent, Config, ConnectionState, OpenEvent, ReconnectConfig, WsError};

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Topics published by the system monitor this client is built for.
pub mod topic {
    /// Host facts sent once per connection (OS name, hardware).
    pub const STATIC_INFO: &str = "static_info";
    /// Slowly changing metrics (RAM, uptime).
    pub const SLOW_INFO: &str = "slow_info";
    /// Frequently changing metrics (CPU usage and temperature).
    pub const FAST_INFO: &str = "fast_info";
    pub const SYSTEM_INFO: &str = "system_info";
    pub const BROADCAST: &str = "broadcast";
}
