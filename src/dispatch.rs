//! Inbound frame dispatch and host callback registries.

use std::any::Any;
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use crate::binding::BindingEngine;
use crate::error::Reporter;
use crate::types::InboundMessage;
use crate::ws::WsError;

/// Outcome of a host callback. An `Err` is reported and does not stop dispatch.
pub type HandlerResult = std::result::Result<(), Box<dyn StdError + Send + Sync>>;

type Callback<T> = Arc<dyn Fn(&T) -> HandlerResult + Send + Sync>;

/// Append-only list of host callbacks, invoked in registration order.
///
/// Each callback is isolated: an `Err` or a panic is reported and the
/// remaining callbacks still run.
pub(crate) struct CallbackList<T> {
    name: &'static str,
    callbacks: RwLock<Vec<Callback<T>>>,
}

impl<T> CallbackList<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            callbacks: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn register(&self, callback: Callback<T>) {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    /// Invoke every callback with `arg`. Returns how many succeeded.
    pub(crate) fn invoke(&self, arg: &T, reporter: &Reporter) -> usize {
        // Callbacks may register further callbacks, so no lock is held while they run.
        let snapshot: Vec<Callback<T>> = self
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut succeeded = 0;
        for (index, callback) in snapshot.iter().enumerate() {
            let reason = match panic::catch_unwind(AssertUnwindSafe(|| callback(arg))) {
                Ok(Ok(())) => {
                    succeeded += 1;
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };

            reporter.report(
                WsError::Handler {
                    callback: self.name,
                    index,
                    reason,
                }
                .into(),
            );
        }
        succeeded
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked".to_owned()
    }
}

/// Parses inbound frames and fans them out to handlers and the binding engine.
pub(crate) struct Dispatcher {
    handlers: CallbackList<InboundMessage>,
    binding: Option<BindingEngine>,
    reporter: Reporter,
}

impl Dispatcher {
    pub(crate) fn new(binding: Option<BindingEngine>, reporter: Reporter) -> Self {
        Self {
            handlers: CallbackList::new("message"),
            binding,
            reporter,
        }
    }

    pub(crate) fn register(&self, handler: Callback<InboundMessage>) {
        self.handlers.register(handler);
    }

    /// Dispatch one frame. Unparseable frames are reported and dropped.
    pub(crate) fn dispatch(&self, frame: &str) {
        let message = match InboundMessage::parse(frame) {
            Ok(message) => message,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%frame, error = %e, "Dropping unparseable WebSocket frame");
                self.reporter.report(e);
                return;
            }
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(?message, "Parsed WebSocket message");

        self.handlers.invoke(&message, &self.reporter);

        if let (Some(binding), Some((topic, fields))) = (&self.binding, message.binding()) {
            let updated = binding.apply(topic, fields);

            #[cfg(feature = "tracing")]
            tracing::trace!(topic, updated, "Applied message to bound elements");
            #[cfg(not(feature = "tracing"))]
            let _ = updated;
        }
    }
}
