//! DOM snapshot model.
//!
//! A [`DomSnapshot`] is the element tree a [`PageDriver`](crate::PageDriver)
//! captures from the live page. Every query takes a fresh snapshot; nodes are
//! addressed by [`NodePath`] (child indices from the document body), which is
//! only meaningful for the snapshot it came from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tags whose text never contributes to rendered text
const NON_RENDERED_TAGS: [&str; 3] = ["script", "style", "template"];

/// Address of a node: child indices starting at the document body
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    /// The document body itself
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`-th child of this node
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Append a path relative to this one
    #[must_use]
    pub fn join(&self, relative: &Self) -> Self {
        let mut indices = self.0.clone();
        indices.extend_from_slice(&relative.0);
        Self(indices)
    }

    /// Whether `other` lies strictly inside the subtree rooted here
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// Nesting depth below the body
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body")?;
        for index in &self.0 {
            write!(f, ">{index}")?;
        }
        Ok(())
    }
}

/// Constraint-validation state of a form control
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidity {
    /// `validity.valid`
    pub valid: bool,
    /// `validity.valueMissing`
    #[serde(default)]
    pub value_missing: bool,
    /// `validationMessage` as rendered by the platform
    #[serde(default)]
    pub message: String,
}

impl FieldValidity {
    /// A field that passes validation
    #[must_use]
    pub fn valid() -> Self {
        Self {
            valid: true,
            value_missing: false,
            message: String::new(),
        }
    }

    /// A required field left empty
    #[must_use]
    pub fn missing(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            value_missing: true,
            message: message.into(),
        }
    }
}

fn default_visible() -> bool {
    true
}

/// One element of a DOM snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomNode {
    /// Lower-case tag name
    pub tag: String,
    /// `id` attribute
    #[serde(default)]
    pub id: Option<String>,
    /// Class list
    #[serde(default)]
    pub classes: Vec<String>,
    /// Remaining attributes
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Text of the element's own text nodes
    #[serde(default)]
    pub text: String,
    /// Whether the element itself is rendered
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Current value of form controls
    #[serde(default)]
    pub value: Option<String>,
    /// Validation state of form controls
    #[serde(default)]
    pub validity: Option<FieldValidity>,
    /// Child elements
    #[serde(default)]
    pub children: Vec<DomNode>,
}

impl DomNode {
    /// Create an element with the given tag
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            text: String::new(),
            visible: true,
            value: None,
            validity: None,
            children: Vec::new(),
        }
    }

    /// Set the id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add whitespace-separated classes
    #[must_use]
    pub fn with_class(mut self, classes: &str) -> Self {
        self.classes
            .extend(classes.split_whitespace().map(str::to_string));
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attrs.insert(name.into(), value.into());
        self
    }

    /// Set the element's own text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the form value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the validation state
    #[must_use]
    pub fn with_validity(mut self, validity: FieldValidity) -> Self {
        self.validity = Some(validity);
        self
    }

    /// Append a child
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Mark the element as not rendered
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Attribute lookup; `id` and `class` are answered from their fields
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            _ => self.attrs.get(name).map(String::as_str),
        }
    }

    /// Whether the element carries `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Whether the element carries the `required` attribute
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.attrs.contains_key("required")
    }

    /// Whether the element's text never renders
    #[must_use]
    pub fn is_non_rendered(&self) -> bool {
        NON_RENDERED_TAGS.contains(&self.tag.as_str())
    }

    /// Own text with whitespace collapsed
    #[must_use]
    pub fn own_text(&self) -> String {
        normalize_whitespace(&self.text)
    }

    /// Rendered text of the whole subtree with whitespace collapsed
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut raw = String::new();
        self.push_text(&mut raw);
        normalize_whitespace(&raw)
    }

    fn push_text(&self, out: &mut String) {
        if self.is_non_rendered() {
            return;
        }
        if !self.text.is_empty() {
            out.push(' ');
            out.push_str(&self.text);
        }
        for child in &self.children {
            child.push_text(out);
        }
    }

    /// Node at `path` relative to this one
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<&Self> {
        let mut node = self;
        for &index in &path.0 {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    /// Mutable node at `path` relative to this one
    pub fn get_mut(&mut self, path: &NodePath) -> Option<&mut Self> {
        let mut node = self;
        for &index in &path.0 {
            node = node.children.get_mut(index)?;
        }
        Some(node)
    }

    /// Nodes from this one down to the node at `path`, inclusive
    #[must_use]
    pub fn chain(&self, path: &NodePath) -> Option<Vec<&Self>> {
        let mut chain = Vec::with_capacity(path.depth() + 1);
        let mut node = self;
        chain.push(node);
        for &index in &path.0 {
            node = node.children.get(index)?;
            chain.push(node);
        }
        Some(chain)
    }

    /// Pre-order walk of this subtree, including the node itself.
    ///
    /// Paths are relative to this node; visibility is effective visibility
    /// (an element inside a hidden ancestor is hidden).
    #[must_use]
    pub fn walk(&self) -> Vec<NodeRef<'_>> {
        let mut out = Vec::new();
        self.walk_into(NodePath::root(), true, &mut out);
        out
    }

    fn walk_into<'a>(&'a self, path: NodePath, parent_visible: bool, out: &mut Vec<NodeRef<'a>>) {
        let visible = parent_visible && self.visible;
        out.push(NodeRef {
            path: path.clone(),
            node: self,
            visible,
        });
        for (index, child) in self.children.iter().enumerate() {
            child.walk_into(path.child(index), visible, out);
        }
    }
}

/// A node visited during a walk
#[derive(Debug, Clone)]
pub struct NodeRef<'a> {
    /// Path relative to the walk root
    pub path: NodePath,
    /// The node
    pub node: &'a DomNode,
    /// Effective visibility
    pub visible: bool,
}

/// A point-in-time capture of the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomSnapshot {
    /// URL the snapshot was taken at
    #[serde(default)]
    pub url: String,
    /// The document body
    pub root: DomNode,
}

impl DomSnapshot {
    /// Create a snapshot
    #[must_use]
    pub fn new(url: impl Into<String>, root: DomNode) -> Self {
        Self {
            url: url.into(),
            root,
        }
    }

    /// Node at `path`
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<&DomNode> {
        self.root.get(path)
    }

    /// Effective visibility of the node at `path`
    #[must_use]
    pub fn is_visible(&self, path: &NodePath) -> bool {
        let mut node = &self.root;
        if !node.visible {
            return false;
        }
        for &index in &path.0 {
            match node.children.get(index) {
                Some(child) if child.visible => node = child,
                _ => return false,
            }
        }
        true
    }

    /// Pre-order walk of the whole document
    #[must_use]
    pub fn walk(&self) -> Vec<NodeRef<'_>> {
        self.root.walk()
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of `text` (never splits a code point)
#[must_use]
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn card() -> DomNode {
        DomNode::element("div")
            .with_class("p-6 rounded-lg shadow-md")
            .with_child(DomNode::element("h3").with_text("Buy milk 1700000000000"))
            .with_child(DomNode::element("p").with_text("  two   litres "))
            .with_child(DomNode::element("script").with_text("alert(1)"))
            .with_child(
                DomNode::element("div")
                    .hidden()
                    .with_child(DomNode::element("button").with_text("Delete")),
            )
    }

    mod node_path_tests {
        use super::*;

        #[test]
        fn test_child_and_join() {
            let base = NodePath::root().child(2);
            assert_eq!(base.child(0), NodePath(vec![2, 0]));
            assert_eq!(base.join(&NodePath(vec![1, 3])), NodePath(vec![2, 1, 3]));
        }

        #[test]
        fn test_is_ancestor_of_is_strict() {
            let a = NodePath(vec![1]);
            assert!(a.is_ancestor_of(&NodePath(vec![1, 0])));
            assert!(!a.is_ancestor_of(&a));
            assert!(!a.is_ancestor_of(&NodePath(vec![2, 0])));
        }

        #[test]
        fn test_display() {
            assert_eq!(NodePath(vec![0, 4]).to_string(), "body>0>4");
        }
    }

    mod text_tests {
        use super::*;

        #[test]
        fn test_text_content_skips_script() {
            let text = card().text_content();
            assert_eq!(text, "Buy milk 1700000000000 two litres Delete");
            assert!(!text.contains("alert"));
        }

        #[test]
        fn test_own_text_is_normalized() {
            let node = DomNode::element("p").with_text("  a \n  b ");
            assert_eq!(node.own_text(), "a b");
        }

        #[test]
        fn test_char_prefix_respects_code_points() {
            assert_eq!(char_prefix("héllo", 2), "hé");
            assert_eq!(char_prefix("abc", 10), "abc");
        }
    }

    mod walk_tests {
        use super::*;

        #[test]
        fn test_walk_is_preorder_with_effective_visibility() {
            let node = card();
            let walked = node.walk();
            assert_eq!(walked.len(), 6);
            assert_eq!(walked[0].path, NodePath::root());
            let button = walked.iter().find(|n| n.node.tag == "button").unwrap();
            assert_eq!(button.path, NodePath(vec![3, 0]));
            assert!(!button.visible);
        }

        #[test]
        fn test_snapshot_visibility_follows_ancestors() {
            let snapshot = DomSnapshot::new("http://app/dashboard", card());
            assert!(snapshot.is_visible(&NodePath(vec![0])));
            assert!(!snapshot.is_visible(&NodePath(vec![3, 0])));
            assert!(!snapshot.is_visible(&NodePath(vec![9])));
        }

        #[test]
        fn test_get_mut_edits_in_place() {
            let mut node = card();
            node.get_mut(&NodePath(vec![1])).unwrap().text = "one litre".to_string();
            assert_eq!(node.get(&NodePath(vec![1])).unwrap().own_text(), "one litre");
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn test_deserialize_sparse_node() {
            let json = r#"{"tag":"input","id":"email","attrs":{"required":""},
                "value":"","validity":{"valid":false,"valueMissing":true,
                "message":"Please fill out this field."}}"#;
            let node: DomNode = serde_json::from_str(json).unwrap();
            assert!(node.visible);
            assert!(node.is_required());
            assert_eq!(node.attr("id"), Some("email"));
            assert!(node.validity.unwrap().value_missing);
        }
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(s in "[a-z \\t\\n]{0,40}") {
            let once = normalize_whitespace(&s);
            prop_assert_eq!(normalize_whitespace(&once), once.clone());
            prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        }

        #[test]
        fn prop_char_prefix_is_prefix(s in "\\PC{0,60}", n in 0usize..80) {
            let prefix = char_prefix(&s, n);
            prop_assert!(s.starts_with(prefix));
            prop_assert!(prefix.chars().count() <= n);
        }
    }
}
