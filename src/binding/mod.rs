//! Declarative binding of topic messages onto a visual tree.
//!
//! Elements opt in with marker attributes:
//!
//! ```html
//! <div data-ws-topic="fast_info">
//!   <div class="progress-bar progress-bar-cpu">
//!     <div class="progress-bar-fill" data-ws-field="cpu_usage"></div>
//!   </div>
//!   <span data-ws-field="cpu_usage"></span>
//!   <div class="progress-bar" data-ws-class="temp_class"></div>
//! </div>
//! ```
//!
//! For a message `{"topic":"fast_info","data":{...}}`, every field is written
//! to the `data-ws-field` elements under each `data-ws-topic` container for that
//! topic (and to the containers themselves), and derives classes on the
//! `data-ws-class` elements. Targets are resolved again for every message.

mod document;
mod memory;
pub mod rules;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::PoisonError;

pub use document::{Document, ElementId, ElementKind, SharedDocument};
pub use memory::MemoryDocument;
pub use rules::{FieldRole, RenderStrategy, TemperatureClass};

use crate::types::FieldValue;

/// Elements bound to one field of one topic.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets {
    /// Elements rendering the value (`data-ws-field`)
    pub values: Vec<ElementId>,
    /// Elements deriving a class from the value (`data-ws-class`)
    pub classes: Vec<ElementId>,
}

impl Targets {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.classes.is_empty()
    }
}

/// Find the elements bound to `field` of `topic`.
///
/// Every container marked with the topic is searched. An element reachable
/// through several nested containers is returned once.
#[must_use]
pub fn resolve_targets(document: &dyn Document, topic: &str, field: &str) -> Targets {
    let containers = document.query_attribute(None, rules::TOPIC_ATTRIBUTE, topic);

    let mut values = BTreeSet::new();
    let mut classes = BTreeSet::new();
    for container in containers {
        values.extend(document.query_attribute(Some(container), rules::FIELD_ATTRIBUTE, field));
        classes.extend(document.query_attribute(Some(container), rules::CLASS_ATTRIBUTE, field));
    }

    Targets {
        values: values.into_iter().collect(),
        classes: classes.into_iter().collect(),
    }
}

/// Applies routable messages to a [`SharedDocument`].
#[derive(Clone)]
pub struct BindingEngine {
    document: SharedDocument,
}

impl fmt::Debug for BindingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingEngine").finish_non_exhaustive()
    }
}

impl BindingEngine {
    #[must_use]
    pub fn new(document: SharedDocument) -> Self {
        Self { document }
    }

    /// Write every field of a `topic` message to its bound elements.
    ///
    /// Returns the number of element updates performed. A topic with no
    /// containers, or fields with no bound elements, update nothing.
    pub fn apply(&self, topic: &str, fields: &[(String, FieldValue)]) -> usize {
        let mut guard = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        let document: &mut dyn Document = &mut *guard;

        let mut updated = 0;
        for (field, value) in fields {
            let targets = resolve_targets(document, topic, field);
            if targets.is_empty() {
                continue;
            }

            let role = FieldRole::of(field);
            for target in targets.values {
                RenderStrategy::select(role, document, target).apply(document, target, value);
                updated += 1;
            }
            for target in targets.classes {
                rules::derive_class(document, target, value);
                updated += 1;
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;

    fn fields(data: serde_json::Value) -> Vec<(String, FieldValue)> {
        data.as_object()
            .unwrap()
            .iter()
            .filter_map(|(k, v)| FieldValue::from_json(v).map(|v| (k.clone(), v)))
            .collect()
    }

    fn engine(doc: &Arc<Mutex<MemoryDocument>>) -> BindingEngine {
        let surface: SharedDocument = doc.clone();
        BindingEngine::new(surface)
    }

    #[test]
    fn renders_a_dashboard_card() {
        let doc = Arc::new(Mutex::new(MemoryDocument::new()));
        let (cpu_fill, cpu_bar, cpu_text, temp_bar, temp_text, temp_badge, uptime) = {
            let mut d = doc.lock().unwrap();
            let root = d.root();
            let card = d.element(root, "div", &[("data-ws-topic", "fast_info")]);
            let cpu_bar = d.element(card, "div", &[("class", "progress-bar progress-bar-cpu")]);
            let cpu_fill = d.element(
                cpu_bar,
                "div",
                &[("class", "progress-bar-fill"), ("data-ws-field", "cpu_usage")],
            );
            let cpu_text = d.element(card, "span", &[("data-ws-field", "cpu_usage")]);
            let temp_bar = d.element(
                card,
                "div",
                &[
                    ("class", "progress-bar progress-bar-temp"),
                    ("data-ws-field", "cpu_temp_percent"),
                    ("data-ws-class", "temp_class"),
                ],
            );
            let temp_text = d.element(card, "span", &[("data-ws-field", "cpu_temp")]);
            let temp_badge = d.element(card, "span", &[("data-ws-class", "temp_class")]);
            let uptime = d.element(card, "span", &[("data-ws-field", "uptime")]);
            (cpu_fill, cpu_bar, cpu_text, temp_bar, temp_text, temp_badge, uptime)
        };

        let updated = engine(&doc).apply(
            "fast_info",
            &fields(json!({
                "cpu_usage": 37.5,
                "cpu_temp": 61,
                "cpu_temp_percent": 61,
                "temp_class": "warm",
                "uptime": "3 hours"
            })),
        );

        let d = doc.lock().unwrap();
        assert_eq!(updated, 7);
        assert_eq!(d.style_property(cpu_fill, "width"), Some("37.5%"));
        assert_eq!(d.style_property(cpu_bar, "--fill-percent"), None);
        assert_eq!(d.text(cpu_text), "37.5%");
        assert_eq!(d.style_property(temp_bar, "--temp-intensity"), Some("61%"));
        assert_eq!(
            d.classes(temp_bar),
            ["progress-bar", "progress-bar-temp", "progress-bar-temp-warm"]
        );
        assert_eq!(d.text(temp_text), "61°C");
        assert_eq!(d.classes(temp_badge), ["warm"]);
        assert_eq!(d.text(uptime), "3 hours");
    }

    #[test]
    fn zero_renders_but_derives_no_class() {
        let doc = Arc::new(Mutex::new(MemoryDocument::new()));
        let (text, badge) = {
            let mut d = doc.lock().unwrap();
            let root = d.root();
            let card = d.element(root, "div", &[("data-ws-topic", "slow_info")]);
            let text = d.element(card, "span", &[("data-ws-field", "ram_percent")]);
            let badge = d.element(
                card,
                "span",
                &[("class", "badge hot"), ("data-ws-class", "ram_percent")],
            );
            (text, badge)
        };

        engine(&doc).apply("slow_info", &fields(json!({ "ram_percent": 0 })));

        let d = doc.lock().unwrap();
        assert_eq!(d.text(text), "0%");
        assert_eq!(d.classes(badge), ["badge", "hot"]);
    }

    #[test]
    fn nested_containers_update_once() {
        let doc = Arc::new(Mutex::new(MemoryDocument::new()));
        let span = {
            let mut d = doc.lock().unwrap();
            let root = d.root();
            let outer = d.element(root, "div", &[("data-ws-topic", "fast_info")]);
            let inner = d.element(outer, "div", &[("data-ws-topic", "fast_info")]);
            d.element(inner, "span", &[("data-ws-field", "cpu_usage")])
        };

        let updated = engine(&doc).apply("fast_info", &fields(json!({ "cpu_usage": 5 })));

        assert_eq!(updated, 1);
        assert_eq!(doc.lock().unwrap().text(span), "5%");
    }

    #[test]
    fn other_topics_are_untouched() {
        let doc = Arc::new(Mutex::new(MemoryDocument::new()));
        let span = {
            let mut d = doc.lock().unwrap();
            let root = d.root();
            let card = d.element(root, "div", &[("data-ws-topic", "slow_info")]);
            d.element(card, "span", &[("data-ws-field", "cpu_usage")])
        };

        let updated = engine(&doc).apply("fast_info", &fields(json!({ "cpu_usage": 5 })));

        assert_eq!(updated, 0);
        assert_eq!(doc.lock().unwrap().text(span), "");
    }

    #[test]
    fn elements_added_later_are_picked_up() {
        let doc = Arc::new(Mutex::new(MemoryDocument::new()));
        let card = {
            let mut d = doc.lock().unwrap();
            let root = d.root();
            d.element(root, "div", &[("data-ws-topic", "fast_info")])
        };
        let engine = engine(&doc);

        assert_eq!(engine.apply("fast_info", &fields(json!({ "cpu_usage": 1 }))), 0);

        let span = doc
            .lock()
            .unwrap()
            .element(card, "span", &[("data-ws-field", "cpu_usage")]);
        engine.apply("fast_info", &fields(json!({ "cpu_usage": 2 })));

        assert_eq!(doc.lock().unwrap().text(span), "2%");
    }

    #[test]
    fn container_may_bind_itself() {
        let doc = Arc::new(Mutex::new(MemoryDocument::new()));
        let span = {
            let mut d = doc.lock().unwrap();
            let root = d.root();
            d.element(
                root,
                "span",
                &[("data-ws-topic", "slow_info"), ("data-ws-field", "hostname")],
            )
        };

        let guard = doc.lock().unwrap();
        let targets = resolve_targets(&*guard, "slow_info", "hostname");
        assert_eq!(targets.values, vec![span]);
        assert!(targets.classes.is_empty());
    }
}
