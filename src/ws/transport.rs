//! Transport seam between the connection state machine and the socket.
//!
//! A [`Connector`] constructs transports. Each transport reports its lifecycle
//! back through the [`TransportEvents`] it was given and is driven through the
//! returned [`TransportHandle`].

use std::sync::Weak;

use futures::{SinkExt as _, StreamExt as _};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::error::WsError;
use crate::Result;

/// Close code sent when the client closes the socket itself.
const NORMAL_CLOSURE: u16 = 1000;

/// Constructs transports for the connection state machine.
pub trait Connector: Send + Sync + 'static {
    /// Start opening a transport to `url`.
    ///
    /// Returning an error means the transport could not even be constructed;
    /// the connection then stays idle. Failures after construction (refused
    /// connection, failed handshake, dropped socket) must be delivered through
    /// `events` as an error followed by a close.
    ///
    /// Events must not be delivered before this method returns.
    fn open(&self, url: &Url, events: TransportEvents) -> Result<TransportHandle>;
}

/// Receiver side of transport lifecycle events.
pub(crate) trait EventTarget: Send + Sync {
    fn on_open(&self, generation: u64);
    fn on_message(&self, generation: u64, text: &str);
    fn on_error(&self, generation: u64, error: WsError);
    fn on_close(&self, generation: u64, code: Option<u16>, reason: String);
}

/// Event sink handed to a [`Connector`] for one transport.
///
/// Events from a transport that has since been replaced by a newer one are
/// ignored by the client.
#[derive(Clone)]
pub struct TransportEvents {
    target: Weak<dyn EventTarget>,
    generation: u64,
}

impl TransportEvents {
    pub(crate) fn new(target: Weak<dyn EventTarget>, generation: u64) -> Self {
        Self { target, generation }
    }

    /// The transport finished its handshake.
    pub fn opened(&self) {
        if let Some(target) = self.target.upgrade() {
            target.on_open(self.generation);
        }
    }

    /// One text frame arrived.
    pub fn message(&self, text: &str) {
        if let Some(target) = self.target.upgrade() {
            target.on_message(self.generation, text);
        }
    }

    /// The transport failed. A [`TransportEvents::closed`] call must follow.
    pub fn error(&self, error: WsError) {
        if let Some(target) = self.target.upgrade() {
            target.on_error(self.generation, error);
        }
    }

    /// The transport is gone.
    pub fn closed(&self, code: Option<u16>, reason: String) {
        if let Some(target) = self.target.upgrade() {
            target.on_close(self.generation, code, reason);
        }
    }
}

/// Command for a live transport.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Send one text frame
    Text(String),
    /// Close the socket
    Close,
}

/// Write side of a transport.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl TransportHandle {
    #[must_use]
    pub fn new(outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { outbound }
    }

    /// Queue one text frame.
    pub fn send_text(&self, text: String) -> Result<()> {
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    /// Ask the transport to close. Closing an already closed transport is a no-op.
    pub fn close(&self) {
        _ = self.outbound.send(Outbound::Close);
    }
}

/// [`Connector`] backed by `tokio-tungstenite`.
///
/// Each transport runs in its own task on the current tokio runtime.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Connector for TungsteniteConnector {
    fn open(&self, url: &Url, events: TransportEvents) -> Result<TransportHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| WsError::TransportConstruction(e.to_string()))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let url = url.clone();

        runtime.spawn(async move {
            run_transport(url, outbound_rx, events).await;
        });

        Ok(TransportHandle::new(outbound_tx))
    }
}

/// Drive one socket until it closes, reporting every lifecycle step to `events`.
async fn run_transport(
    url: Url,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: TransportEvents,
) {
    #[cfg(feature = "tracing")]
    tracing::debug!(%url, "Opening WebSocket transport");

    let connecting = connect_async(url.as_str());
    tokio::pin!(connecting);

    let ws_stream = loop {
        tokio::select! {
            result = &mut connecting => match result {
                Ok((ws_stream, _)) => break ws_stream,
                Err(e) => {
                    events.error(WsError::Transport(e));
                    events.closed(None, String::new());
                    return;
                }
            },
            command = outbound.recv() => match command {
                // Nothing is sent before the handshake completes
                Some(Outbound::Text(_)) => {}
                Some(Outbound::Close) | None => {
                    events.closed(None, "closed before open".to_owned());
                    return;
                }
            },
        }
    };

    events.opened();

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(text = %text.as_str(), "Received WebSocket text message");
                    events.message(text.as_str());
                }
                Some(Ok(Message::Binary(bytes))) => {
                    if let Ok(text) = std::str::from_utf8(&bytes) {
                        events.message(text);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame.map_or((None, String::new()), |f| {
                        (Some(u16::from(f.code)), f.reason.as_str().to_owned())
                    });
                    events.closed(code, reason);
                    return;
                }
                Some(Ok(_)) => {
                    // Ping/pong frames are answered by tungstenite itself.
                }
                Some(Err(e)) => {
                    events.error(WsError::Transport(e));
                    events.closed(None, String::new());
                    return;
                }
                None => {
                    events.closed(None, String::new());
                    return;
                }
            },

            command = outbound.recv() => match command {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        events.error(WsError::Transport(e));
                        events.closed(None, String::new());
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    _ = write.send(Message::Close(None)).await;
                    events.closed(Some(NORMAL_CLOSURE), "closed by client".to_owned());
                    return;
                }
            },
        }
    }
}
