#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

/// WebSocket error variants.
///
/// None of these are returned to the caller of an event-driven operation; they
/// are published on the client's error channel instead.
#[non_exhaustive]
#[derive(Debug)]
pub enum WsError {
    /// The transport could not be constructed. The connection stays idle.
    TransportConstruction(String),
    /// Error reported by an established or in-flight transport
    Transport(tokio_tungstenite::tungstenite::Error),
    /// Inbound frame was not valid JSON and has been dropped
    MessageParse(serde_json::Error),
    /// A host callback returned an error or panicked
    Handler {
        /// Which callback list the failing callback belongs to
        callback: &'static str,
        /// Registration index of the failing callback
        index: usize,
        /// Error text or panic payload
        reason: String,
    },
    /// Automatic reconnection gave up
    MaxReconnectExceeded {
        /// Attempts made before giving up
        attempts: u32,
    },
    /// Frame could not be sent because the connection is not open
    ConnectionClosed,
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportConstruction(reason) => {
                write!(f, "Unable to construct WebSocket transport: {reason}")
            }
            Self::Transport(e) => write!(f, "WebSocket transport error: {e}"),
            Self::MessageParse(e) => write!(f, "Failed to parse WebSocket message: {e}"),
            Self::Handler {
                callback,
                index,
                reason,
            } => write!(f, "{callback} callback #{index} failed: {reason}"),
            Self::MaxReconnectExceeded { attempts } => {
                write!(f, "Giving up after {attempts} reconnection attempts")
            }
            Self::ConnectionClosed => write!(f, "WebSocket connection closed"),
        }
    }
}

impl StdError for WsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::MessageParse(e) => Some(e),
            _ => None,
        }
    }
}

// Integration with main Error type
impl From<WsError> for crate::error::Error {
    fn from(e: WsError) -> Self {
        crate::error::Error::with_source(crate::error::Kind::WebSocket, e)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for crate::error::Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        crate::error::Error::with_source(crate::error::Kind::WebSocket, WsError::Transport(e))
    }
}
