#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff as _;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep};
use url::Url;

use super::address;
use super::config::Config;
use super::error::WsError;
use super::transport::{Connector, EventTarget, TransportEvents, TransportHandle};
use crate::Result;
use crate::dispatch::{CallbackList, Dispatcher};
use crate::error::{Error, Kind, Reporter};
use crate::topics::TopicRegistry;
use crate::types::ClientRequest;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    /// Never connected, or the last transport could not be constructed
    Idle,
    /// Transport constructed, handshake in flight
    Connecting,
    /// Transport open, frames flow both ways
    Open,
    /// Transport gone; a reconnect may be pending
    Closed,
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Passed to connect callbacks when a transport opens.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEvent {
    /// Resolved endpoint of the transport
    pub url: Url,
    pub at: DateTime<Utc>,
}

/// Passed to disconnect callbacks when a transport closes.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// Resolved endpoint of the transport
    pub url: Url,
    /// Close code, when the peer or the client sent one
    pub code: Option<u16>,
    pub reason: String,
    pub at: DateTime<Utc>,
}

struct PendingReconnect {
    seq: u64,
    task: JoinHandle<()>,
}

/// Everything the state machine mutates, behind one lock.
struct Inner {
    state: ConnectionState,
    transport: Option<TransportHandle>,
    endpoint: Option<Url>,
    /// Identifies the current transport. Events carrying another value are stale.
    generation: u64,
    attempts: u32,
    backoff: ExponentialBackoff,
    reconnect: Option<PendingReconnect>,
    reconnect_seq: u64,
    heartbeat: Option<JoinHandle<()>>,
    topics: TopicRegistry,
    /// Set by `disconnect`, cleared by an explicit `connect` or the next open.
    suppressed: bool,
}

impl Inner {
    fn cancel_reconnect(&mut self) {
        if let Some(pending) = self.reconnect.take() {
            pending.task.abort();
        }
    }

    fn stop_heartbeat(&mut self) {
        if let Some(task) = self.heartbeat.take() {
            task.abort();
        }
    }

    fn is_open(&self) -> bool {
        self.state == ConnectionState::Open && self.transport.is_some()
    }
}

/// Connection lifecycle state machine.
///
/// All state lives behind a single lock. Host callbacks are never invoked
/// while it is held, so they may call back into the connection freely.
pub(crate) struct Connection {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ConnectionState>,
    address: String,
    config: Config,
    connector: Arc<dyn Connector>,
    dispatcher: Dispatcher,
    on_connect: CallbackList<OpenEvent>,
    on_disconnect: CallbackList<CloseEvent>,
    reporter: Reporter,
    this: Weak<Connection>,
}

impl Connection {
    pub(crate) fn new(
        address: String,
        topics: TopicRegistry,
        config: Config,
        connector: Arc<dyn Connector>,
        dispatcher: Dispatcher,
        reporter: Reporter,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let backoff: ExponentialBackoff = config.reconnect.clone().into();

        Arc::new_cyclic(|this| Self {
            inner: Mutex::new(Inner {
                state: ConnectionState::Idle,
                transport: None,
                endpoint: None,
                generation: 0,
                attempts: 0,
                backoff,
                reconnect: None,
                reconnect_seq: 0,
                heartbeat: None,
                topics,
                suppressed: false,
            }),
            state_tx,
            address,
            config,
            connector,
            dispatcher,
            on_connect: CallbackList::new("connect"),
            on_disconnect: CallbackList::new("disconnect"),
            reporter,
            this: Weak::clone(this),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, inner: &mut Inner, state: ConnectionState) {
        if inner.state != state {
            #[cfg(feature = "tracing")]
            tracing::debug!(from = %inner.state, to = %state, "Connection state changed");
            inner.state = state;
        }
        self.state_tx.send_replace(state);
    }

    /// Open a transport unless one is already connecting or open.
    ///
    /// An explicit call lifts the suppression left by [`Connection::disconnect`]
    /// and re-arms an exhausted reconnect budget.
    pub(crate) fn connect(&self) {
        let mut inner = self.lock();
        if matches!(
            inner.state,
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            return;
        }

        inner.suppressed = false;
        inner.cancel_reconnect();
        if inner.attempts >= self.config.reconnect.max_attempts {
            inner.attempts = 0;
            inner.backoff.reset();
        }

        self.open_transport(&mut inner);
    }

    fn open_transport(&self, inner: &mut Inner) {
        if matches!(
            inner.state,
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            return;
        }

        let url = match address::resolve(&self.address, self.config.page_origin.as_ref()) {
            Ok(url) => url,
            Err(e) => {
                self.set_state(inner, ConnectionState::Idle);
                self.reporter.report(e.into());
                return;
            }
        };

        inner.generation = inner.generation.wrapping_add(1);
        let target: Weak<dyn EventTarget> = self.this.clone();
        let events = TransportEvents::new(target, inner.generation);

        #[cfg(feature = "tracing")]
        tracing::debug!(%url, generation = inner.generation, "Connecting");

        match self.connector.open(&url, events) {
            Ok(handle) => {
                inner.transport = Some(handle);
                inner.endpoint = Some(url);
                self.set_state(inner, ConnectionState::Connecting);
            }
            Err(e) => {
                inner.transport = None;
                self.set_state(inner, ConnectionState::Idle);
                self.reporter.report(e);
            }
        }
    }

    /// Schedule a deferred connect after the next backoff delay.
    pub(crate) fn reconnect(&self) {
        let mut inner = self.lock();
        self.schedule_reconnect(&mut inner);
    }

    fn schedule_reconnect(&self, inner: &mut Inner) {
        if inner.state == ConnectionState::Connecting {
            return;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.reporter.report(Error::with_source(Kind::Internal, e));
                return;
            }
        };

        inner.attempts = inner.attempts.saturating_add(1);
        let delay = inner
            .backoff
            .next_backoff()
            .unwrap_or(self.config.reconnect.max_backoff);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempt = inner.attempts,
            delay_ms = delay.as_millis(),
            "Scheduling reconnect"
        );

        inner.cancel_reconnect();
        inner.reconnect_seq = inner.reconnect_seq.wrapping_add(1);
        let seq = inner.reconnect_seq;
        let this = self.this.clone();

        let task = runtime.spawn(async move {
            sleep(delay).await;
            if let Some(connection) = this.upgrade() {
                connection.fire_reconnect(seq);
            }
        });

        inner.reconnect = Some(PendingReconnect { seq, task });
    }

    fn fire_reconnect(&self, seq: u64) {
        let mut inner = self.lock();
        // A cancelled timer may already be past its sleep when aborted.
        if inner.reconnect.as_ref().is_none_or(|p| p.seq != seq) {
            return;
        }
        inner.reconnect = None;
        self.open_transport(&mut inner);
    }

    /// Close the transport and suppress automatic reconnection until the next
    /// explicit [`Connection::connect`].
    pub(crate) fn disconnect(&self) {
        let mut inner = self.lock();

        inner.suppressed = true;
        inner.attempts = self.config.reconnect.max_attempts;
        inner.cancel_reconnect();
        inner.stop_heartbeat();

        if let Some(transport) = inner.transport.take() {
            transport.close();
        }
        if inner.state != ConnectionState::Idle {
            self.set_state(&mut inner, ConnectionState::Closed);
        }
    }

    fn valid_topic(&self, topic: &str) -> bool {
        if topic.trim().is_empty() {
            self.reporter
                .report(Error::validation("topic must not be empty"));
            return false;
        }
        true
    }

    pub(crate) fn subscribe(&self, topic: &str) {
        if !self.valid_topic(topic) {
            return;
        }
        let mut inner = self.lock();
        let open = inner.is_open();
        if let Some(request) = inner.topics.subscribe(topic, open) {
            self.send_or_report(&inner, &request);
        }
    }

    pub(crate) fn unsubscribe(&self, topic: &str) {
        if !self.valid_topic(topic) {
            return;
        }
        let mut inner = self.lock();
        let open = inner.is_open();
        if let Some(request) = inner.topics.unsubscribe(topic, open) {
            self.send_or_report(&inner, &request);
        }
    }

    /// Send one frame. Fails with [`WsError::ConnectionClosed`] unless open.
    pub(crate) fn send<R: Serialize>(&self, request: &R) -> Result<()> {
        let inner = self.lock();
        Self::send_locked(&inner, request)
    }

    fn send_locked<R: Serialize>(inner: &Inner, request: &R) -> Result<()> {
        let transport = match (&inner.transport, inner.state) {
            (Some(transport), ConnectionState::Open) => transport,
            _ => return Err(WsError::ConnectionClosed.into()),
        };

        let json = serde_json::to_string(request)?;
        #[cfg(feature = "tracing")]
        tracing::trace!(%json, "Sending WebSocket frame");
        transport.send_text(json)
    }

    fn send_or_report(&self, inner: &Inner, request: &ClientRequest) {
        if let Err(e) = Self::send_locked(inner, request) {
            self.reporter.report(e);
        }
    }

    fn start_heartbeat(&self, inner: &mut Inner) {
        inner.stop_heartbeat();

        let Some(period) = self.config.heartbeat_interval.filter(|p| !p.is_zero()) else {
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            return;
        };

        let generation = inner.generation;
        let this = self.this.clone();
        inner.heartbeat = Some(runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(connection) = this.upgrade() else {
                    break;
                };
                if !connection.beat(generation) {
                    break;
                }
            }
        }));
    }

    /// Send one heartbeat ping. Returns `false` once the transport is no longer current.
    fn beat(&self, generation: u64) -> bool {
        let inner = self.lock();
        if inner.generation != generation || !inner.is_open() {
            return false;
        }
        self.send_or_report(&inner, &ClientRequest::Ping);
        true
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.lock().state
    }

    pub(crate) fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn topics(&self) -> Vec<String> {
        self.lock().topics.topics().to_vec()
    }

    pub(crate) fn reconnect_attempts(&self) -> u32 {
        self.lock().attempts
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub(crate) fn on_connect(&self) -> &CallbackList<OpenEvent> {
        &self.on_connect
    }

    pub(crate) fn on_disconnect(&self) -> &CallbackList<CloseEvent> {
        &self.on_disconnect
    }

    #[cfg(test)]
    pub(crate) fn reconnect_delay_pending(&self) -> bool {
        self.lock().reconnect.is_some()
    }
}

impl EventTarget for Connection {
    fn on_open(&self, generation: u64) {
        let event = {
            let mut inner = self.lock();
            if inner.generation != generation || inner.transport.is_none() {
                return;
            }
            let Some(url) = inner.endpoint.clone() else {
                return;
            };

            inner.attempts = 0;
            inner.backoff.reset();
            inner.suppressed = false;
            self.set_state(&mut inner, ConnectionState::Open);

            for request in inner.topics.replay() {
                self.send_or_report(&inner, &request);
            }
            self.start_heartbeat(&mut inner);

            #[cfg(feature = "tracing")]
            tracing::info!(%url, topics = inner.topics.len(), "Connection open");

            OpenEvent { url, at: Utc::now() }
        };

        self.on_connect.invoke(&event, &self.reporter);
    }

    fn on_message(&self, generation: u64, text: &str) {
        if self.lock().generation != generation {
            return;
        }
        self.dispatcher.dispatch(text);
    }

    fn on_error(&self, generation: u64, error: WsError) {
        if self.lock().generation != generation {
            #[cfg(feature = "tracing")]
            tracing::debug!(%error, "Ignoring error from a replaced transport");
            return;
        }
        self.reporter.report(error.into());
    }

    fn on_close(&self, generation: u64, code: Option<u16>, reason: String) {
        let event = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            let Some(url) = inner.endpoint.clone() else {
                return;
            };

            // Later events from this transport are stale.
            inner.generation = inner.generation.wrapping_add(1);
            inner.transport = None;
            inner.stop_heartbeat();
            self.set_state(&mut inner, ConnectionState::Closed);

            #[cfg(feature = "tracing")]
            tracing::info!(%url, ?code, %reason, "Connection closed");

            CloseEvent {
                url,
                code,
                reason,
                at: Utc::now(),
            }
        };

        self.on_disconnect.invoke(&event, &self.reporter);

        let mut inner = self.lock();
        let max_attempts = self.config.reconnect.max_attempts;
        if inner.attempts < max_attempts {
            self.schedule_reconnect(&mut inner);
        } else if inner.suppressed {
            #[cfg(feature = "tracing")]
            tracing::debug!("Reconnect suppressed after disconnect");
        } else {
            self.reporter.report(
                WsError::MaxReconnectExceeded {
                    attempts: inner.attempts,
                }
                .into(),
            );
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let inner = self
            .inner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        inner.cancel_reconnect();
        inner.stop_heartbeat();
        if let Some(transport) = inner.transport.take() {
            transport.close();
        }
    }
}
