//! The visual tree the binding engine writes into.

use std::sync::{Arc, Mutex};

/// Opaque handle to an element of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// How an element displays a value.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Shows text content (`span`, `div`, `td`, ...)
    Text,
    /// Holds a form value (`input`, `textarea`, `select`, `progress`, `meter`)
    Input,
}

impl ElementKind {
    /// Classify an element by tag name.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        if ["input", "textarea", "select", "progress", "meter"]
            .iter()
            .any(|t| tag.eq_ignore_ascii_case(t))
        {
            Self::Input
        } else {
            Self::Text
        }
    }
}

/// An externally owned visual tree.
///
/// The binding engine only queries marker attributes and writes style
/// properties, text content, form values, class membership and its own
/// bookkeeping attribute. It never changes the structure of the tree, and it
/// re-runs every query per message, so elements added or removed between
/// messages are picked up.
///
/// Methods taking an [`ElementId`] that does not belong to the tree are
/// expected to do nothing.
pub trait Document {
    /// Elements whose attribute `name` equals `value`, searching `scope` and its
    /// descendants (or the whole tree for `None`), in document order.
    fn query_attribute(&self, scope: Option<ElementId>, name: &str, value: &str)
    -> Vec<ElementId>;

    fn kind(&self, element: ElementId) -> ElementKind;

    fn attribute(&self, element: ElementId, name: &str) -> Option<&str>;

    /// Set an attribute. `class` replaces the class list.
    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str);

    fn has_class(&self, element: ElementId, class: &str) -> bool;

    /// `element` itself or its nearest ancestor carrying `class`.
    fn closest_with_class(&self, element: ElementId, class: &str) -> Option<ElementId>;

    fn class_list(&self, element: ElementId) -> Vec<String>;

    fn add_class(&mut self, element: ElementId, class: &str);

    fn remove_class(&mut self, element: ElementId, class: &str);

    fn set_text(&mut self, element: ElementId, text: &str);

    fn set_value(&mut self, element: ElementId, value: &str);

    /// Set an inline style property or CSS custom property (`width`, `--fill-percent`).
    fn set_style_property(&mut self, element: ElementId, name: &str, value: &str);
}

/// A document shared between the host and the client.
pub type SharedDocument = Arc<Mutex<dyn Document + Send>>;
