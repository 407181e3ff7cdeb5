//! Arena-backed [`Document`] for hosts without a browser tree, and for tests.

use std::collections::BTreeMap;

use super::document::{Document, ElementId, ElementKind};

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    style: BTreeMap<String, String>,
    text: String,
    value: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

/// In-memory element tree rooted at a `body` element.
///
/// Removed elements keep their id but are detached, so whole-tree queries no
/// longer see them.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                tag: "body".to_owned(),
                ..Node::default()
            }],
        }
    }

    #[must_use]
    pub fn root(&self) -> ElementId {
        ElementId::new(0)
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> ElementId {
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            ..Node::default()
        });
        ElementId::new(self.nodes.len() - 1)
    }

    /// Move `child` under `parent`, after its existing children.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        if self.node(parent).is_none() || self.node(child).is_none() || self.contains(child, parent)
        {
            return;
        }
        self.remove(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    /// Detach `element` (and its subtree) from its parent.
    pub fn remove(&mut self, element: ElementId) {
        let Some(parent) = self.node(element).and_then(|n| n.parent) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != element);
        }
        if let Some(node) = self.node_mut(element) {
            node.parent = None;
        }
    }

    /// Create an element with `attributes` and append it to `parent`.
    pub fn element(
        &mut self,
        parent: ElementId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> ElementId {
        let element = self.create_element(tag);
        for (name, value) in attributes {
            self.set_attribute(element, name, value);
        }
        self.append_child(parent, element);
        element
    }

    #[must_use]
    pub fn tag(&self, element: ElementId) -> &str {
        self.node(element).map_or("", |n| n.tag.as_str())
    }

    #[must_use]
    pub fn text(&self, element: ElementId) -> &str {
        self.node(element).map_or("", |n| n.text.as_str())
    }

    #[must_use]
    pub fn value(&self, element: ElementId) -> &str {
        self.node(element).map_or("", |n| n.value.as_str())
    }

    #[must_use]
    pub fn classes(&self, element: ElementId) -> &[String] {
        self.node(element)
            .map(|n| n.classes.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn style_property(&self, element: ElementId, name: &str) -> Option<&str> {
        self.node(element)?.style.get(name).map(String::as_str)
    }

    /// Whether `descendant` is `ancestor` or lies inside its subtree.
    fn contains(&self, ancestor: ElementId, descendant: ElementId) -> bool {
        let mut current = Some(descendant);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).and_then(|n| n.parent);
        }
        false
    }

    fn node(&self, element: ElementId) -> Option<&Node> {
        self.nodes.get(element.index())
    }

    fn node_mut(&mut self, element: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(element.index())
    }
}

impl Document for MemoryDocument {
    fn query_attribute(
        &self,
        scope: Option<ElementId>,
        name: &str,
        value: &str,
    ) -> Vec<ElementId> {
        let start = scope.unwrap_or_else(|| self.root());
        if self.node(start).is_none() {
            return Vec::new();
        }

        let mut matches = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if node.attributes.get(name).is_some_and(|v| v == value) {
                matches.push(id);
            }
            stack.extend(node.children.iter().rev());
        }
        matches
    }

    fn kind(&self, element: ElementId) -> ElementKind {
        ElementKind::from_tag(self.tag(element))
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<&str> {
        self.node(element)?.attributes.get(name).map(String::as_str)
    }

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str) {
        let Some(node) = self.node_mut(element) else {
            return;
        };
        if name == "class" {
            node.classes = value.split_whitespace().map(ToOwned::to_owned).collect();
        } else {
            node.attributes.insert(name.to_owned(), value.to_owned());
        }
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.classes(element).iter().any(|c| c == class)
    }

    fn closest_with_class(&self, element: ElementId, class: &str) -> Option<ElementId> {
        let mut current = Some(element);
        while let Some(id) = current {
            let node = self.node(id)?;
            if node.classes.iter().any(|c| c == class) {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    fn class_list(&self, element: ElementId) -> Vec<String> {
        self.classes(element).to_vec()
    }

    fn add_class(&mut self, element: ElementId, class: &str) {
        if let Some(node) = self.node_mut(element)
            && !node.classes.iter().any(|c| c == class)
        {
            node.classes.push(class.to_owned());
        }
    }

    fn remove_class(&mut self, element: ElementId, class: &str) {
        if let Some(node) = self.node_mut(element) {
            node.classes.retain(|c| c != class);
        }
    }

    fn set_text(&mut self, element: ElementId, text: &str) {
        if let Some(node) = self.node_mut(element) {
            text.clone_into(&mut node.text);
        }
    }

    fn set_value(&mut self, element: ElementId, value: &str) {
        if let Some(node) = self.node_mut(element) {
            value.clone_into(&mut node.value);
        }
    }

    fn set_style_property(&mut self, element: ElementId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(element) {
            node.style.insert(name.to_owned(), value.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_returns_document_order_and_includes_scope() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let card = doc.element(root, "div", &[("data-ws-topic", "fast_info")]);
        let first = doc.element(card, "span", &[("data-ws-field", "cpu_usage")]);
        let nested = doc.element(card, "div", &[]);
        let second = doc.element(nested, "span", &[("data-ws-field", "cpu_usage")]);
        let other = doc.element(root, "span", &[("data-ws-field", "cpu_usage")]);

        assert_eq!(
            doc.query_attribute(Some(card), "data-ws-field", "cpu_usage"),
            vec![first, second]
        );
        assert_eq!(
            doc.query_attribute(None, "data-ws-field", "cpu_usage"),
            vec![first, second, other]
        );
        assert_eq!(
            doc.query_attribute(Some(card), "data-ws-topic", "fast_info"),
            vec![card]
        );
    }

    #[test]
    fn removed_elements_are_not_found() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let card = doc.element(root, "div", &[("data-ws-topic", "fast_info")]);

        doc.remove(card);

        assert!(doc.query_attribute(None, "data-ws-topic", "fast_info").is_empty());
    }

    #[test]
    fn closest_walks_up_the_tree() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let bar = doc.element(root, "div", &[("class", "progress-bar progress-bar-cpu")]);
        let inner = doc.element(bar, "div", &[]);
        let label = doc.element(inner, "span", &[]);

        assert_eq!(doc.closest_with_class(label, "progress-bar-cpu"), Some(bar));
        assert_eq!(doc.closest_with_class(bar, "progress-bar-cpu"), Some(bar));
        assert_eq!(doc.closest_with_class(label, "progress-bar-ram"), None);
    }

    #[test]
    fn class_edits_keep_the_list_unique() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let el = doc.element(root, "div", &[("class", "card  wide")]);

        doc.add_class(el, "wide");
        doc.add_class(el, "hot");
        doc.remove_class(el, "card");

        assert_eq!(doc.classes(el), ["wide", "hot"]);
    }

    #[test]
    fn append_child_moves_an_element() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let a = doc.element(root, "div", &[]);
        let b = doc.element(root, "div", &[]);
        let child = doc.element(a, "span", &[("data-ws-field", "uptime")]);

        doc.append_child(b, child);

        assert!(doc.query_attribute(Some(a), "data-ws-field", "uptime").is_empty());
        assert_eq!(
            doc.query_attribute(Some(b), "data-ws-field", "uptime"),
            vec![child]
        );
    }

    #[test]
    fn append_child_refuses_cycles() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let outer = doc.element(root, "div", &[]);
        let inner = doc.element(outer, "div", &[]);

        doc.append_child(inner, outer);

        assert_eq!(doc.closest_with_class(inner, "missing"), None);
        assert_eq!(doc.query_attribute(None, "id", "none"), vec![]);
        doc.set_attribute(inner, "id", "inner");
        assert_eq!(doc.query_attribute(Some(outer), "id", "inner"), vec![inner]);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut doc = MemoryDocument::new();
        let ghost = ElementId::new(99);

        doc.set_text(ghost, "x");
        doc.add_class(ghost, "x");

        assert_eq!(doc.text(ghost), "");
        assert!(doc.query_attribute(Some(ghost), "data-ws-field", "x").is_empty());
    }
}
