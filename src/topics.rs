//! Topic registry: the set of topics the client wants to receive.
//!
//! The registry is the single source of truth for what should be subscribed.
//! Subscribe and unsubscribe frames on the wire are a best-effort echo of edits
//! made here, and [`TopicRegistry::replay`] re-sends the whole set whenever the
//! connection opens.

use crate::types::ClientRequest;

/// Ordered, duplicate-free set of topic names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicRegistry {
    topics: Vec<String>,
}

impl TopicRegistry {
    #[must_use]
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for topic in topics {
            registry.insert(topic.into());
        }
        registry
    }

    /// Record interest in `topic`.
    ///
    /// Returns the subscribe frame to send right away when the connection is
    /// open. While not open nothing is returned and the frame is deferred to
    /// the next replay.
    pub fn subscribe(&mut self, topic: &str, open: bool) -> Option<ClientRequest> {
        self.insert(topic.to_owned());
        open.then(|| ClientRequest::subscribe(topic))
    }

    /// Drop interest in `topic`, regardless of connection state.
    ///
    /// Returns the unsubscribe frame to send when the connection is open.
    pub fn unsubscribe(&mut self, topic: &str, open: bool) -> Option<ClientRequest> {
        self.topics.retain(|t| t != topic);
        open.then(|| ClientRequest::unsubscribe(topic))
    }

    /// Subscribe frames for every registered topic, in registration order.
    #[must_use]
    pub fn replay(&self) -> Vec<ClientRequest> {
        self.topics
            .iter()
            .map(|topic| ClientRequest::subscribe(topic))
            .collect()
    }

    #[must_use]
    pub fn contains(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }

    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    fn insert(&mut self, topic: String) {
        if !self.contains(&topic) {
            self.topics.push(topic);
        }
    }
}
