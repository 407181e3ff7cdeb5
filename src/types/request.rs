use serde::Serialize;

/// Outbound frame sent to the server.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientRequest {
    /// Start receiving messages for `topic`
    Subscribe {
        /// Topic name (e.g., `fast_info`, `static_info`)
        topic: String,
    },
    /// Stop receiving messages for `topic`
    Unsubscribe {
        /// Topic name
        topic: String,
    },
    /// Keepalive
    Ping,
}

impl ClientRequest {
    /// Create a subscribe request.
    #[must_use]
    pub fn subscribe(topic: &str) -> Self {
        Self::Subscribe {
            topic: topic.to_owned(),
        }
    }

    /// Create an unsubscribe request.
    #[must_use]
    pub fn unsubscribe(topic: &str) -> Self {
        Self::Unsubscribe {
            topic: topic.to_owned(),
        }
    }
}
