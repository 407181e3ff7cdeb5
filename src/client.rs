use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::Result;
use crate::binding::{BindingEngine, SharedDocument};
use crate::dispatch::{Dispatcher, HandlerResult};
use crate::error::{Error, Reporter};
use crate::topics::TopicRegistry;
use crate::types::{ClientRequest, InboundMessage};
use crate::ws::config::Config;
use crate::ws::connection::{CloseEvent, Connection, ConnectionState, OpenEvent};
use crate::ws::transport::{Connector, TungsteniteConnector};

/// Dashboard WebSocket client.
///
/// Keeps one socket to the server, reconnects with exponential backoff after it
/// closes, replays every registered topic on each open and projects topic
/// messages onto an optional [`SharedDocument`].
///
/// Cloning is cheap and every clone drives the same connection. Dropping the
/// last clone closes the socket.
///
/// # Examples
///
/// ```rust, no_run
/// use std::sync::{Arc, Mutex};
///
/// use dashboard_ws::Client;
/// use dashboard_ws::binding::MemoryDocument;
///
/// #[tokio::main]
/// async fn main() {
///     let document = Arc::new(Mutex::new(MemoryDocument::new()));
///
///     let client = Client::builder()
///         .address("ws://127.0.0.1:8000/ws")
///         .topics(vec!["fast_info".to_owned(), "slow_info".to_owned()])
///         .surface(document)
///         .build();
///
///     client.on_message(|message| {
///         println!("{:?}", message.topic);
///         Ok(())
///     });
///     client.connect();
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    connection: Arc<Connection>,
    reporter: Reporter,
}

#[bon::bon]
impl Client {
    /// Build a client. Nothing is opened until [`Client::connect`].
    ///
    /// `address` may be absolute (`ws://`, `wss://`, `http://`, `https://`) or a
    /// path relative to [`Config::page_origin`].
    #[builder]
    pub fn new(
        #[builder(into)] address: String,
        #[builder(default)] topics: Vec<String>,
        #[builder(default)] config: Config,
        surface: Option<SharedDocument>,
        connector: Option<Arc<dyn Connector>>,
    ) -> Self {
        let reporter = Reporter::new();
        let dispatcher = Dispatcher::new(surface.map(BindingEngine::new), reporter.clone());
        let connector = connector.unwrap_or_else(|| Arc::new(TungsteniteConnector::new()));

        let connection = Connection::new(
            address,
            TopicRegistry::new(topics),
            config,
            connector,
            dispatcher,
            reporter.clone(),
        );

        Self {
            connection,
            reporter,
        }
    }

    /// Open the socket. No-op while connecting or open.
    ///
    /// Must be called from within a tokio runtime. Resolution or construction
    /// failures leave the client [`ConnectionState::Idle`] and are reported on
    /// [`Client::errors`].
    pub fn connect(&self) {
        self.connection.connect();
    }

    /// Close the socket and stop reconnecting until the next [`Client::connect`].
    pub fn disconnect(&self) {
        self.connection.disconnect();
    }

    /// Schedule a connect after the next backoff delay. No-op while connecting.
    pub fn reconnect(&self) {
        self.connection.reconnect();
    }

    /// Register interest in `topic`. Sent now when open, otherwise on the next open.
    pub fn subscribe(&self, topic: &str) {
        self.connection.subscribe(topic);
    }

    /// Drop interest in `topic`. The server is only told while open.
    pub fn unsubscribe(&self, topic: &str) {
        self.connection.unsubscribe(topic);
    }

    /// Register a handler for every parsed inbound message.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(&InboundMessage) -> HandlerResult + Send + Sync + 'static,
    {
        self.connection.dispatcher().register(Arc::new(handler));
    }

    /// Register a callback for every transition into [`ConnectionState::Open`].
    pub fn on_connect<F>(&self, callback: F)
    where
        F: Fn(&OpenEvent) -> HandlerResult + Send + Sync + 'static,
    {
        self.connection.on_connect().register(Arc::new(callback));
    }

    /// Register a callback for every transport close.
    pub fn on_disconnect<F>(&self, callback: F)
    where
        F: Fn(&CloseEvent) -> HandlerResult + Send + Sync + 'static,
    {
        self.connection.on_disconnect().register(Arc::new(callback));
    }

    /// Send an arbitrary frame while open.
    pub fn send<R: Serialize>(&self, request: &R) -> Result<()> {
        self.connection.send(request)
    }

    /// Send `{"action":"ping"}` while open.
    pub fn ping(&self) -> Result<()> {
        self.connection.send(&ClientRequest::Ping)
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.connection.state_receiver()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Registered topics, in registration order.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.connection.topics()
    }

    /// Reconnect attempts since the last successful open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.connection.reconnect_attempts()
    }

    /// Errors raised on event-driven paths (transport, parse, handler, give-up).
    ///
    /// Each call returns a new independent receiver that sees reports made
    /// after it was created.
    #[must_use]
    pub fn errors(&self) -> broadcast::Receiver<Arc<Error>> {
        self.reporter.subscribe()
    }
}
