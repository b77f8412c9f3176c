//! PageDriver - the seam between the harness and a live page.
//!
//! A driver does two things: it captures the page as a [`DomSnapshot`], and it
//! acts on one node of the most recent snapshot, addressed by an
//! [`ElementTarget`]. All matching happens in Rust over snapshots, so a
//! driver never has to understand selectors.
//!
//! ```text
//! ┌──────────────┐   snapshot()    ┌──────────────────┐
//! │  Locator /   │ ◀────────────── │  PageDriver      │
//! │  Resolver    │                 │  ├ ChromiumDriver │ (CDP, `browser` feature)
//! │              │ ──────────────▶ │  └ FakeTaskApp    │ (in-memory)
//! └──────────────┘ click(target)   └──────────────────┘
//! ```

use crate::dialog::Dialog;
use crate::dom::{DomNode, DomSnapshot, NodePath};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The node an interaction is aimed at.
///
/// `tag` is the fingerprint checked at interaction time: if the node at
/// `path` no longer carries it, the driver reports
/// [`ProbeError::StaleElement`] and the caller re-resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementTarget {
    /// Path from the document body
    pub path: NodePath,
    /// Expected tag at `path`
    pub tag: String,
    /// What was looked up, for error messages
    pub description: String,
}

impl ElementTarget {
    /// Create a target
    #[must_use]
    pub fn new(path: NodePath, tag: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path,
            tag: tag.into(),
            description: description.into(),
        }
    }

    /// Find the target under `root`, checking the fingerprint
    pub fn locate<'a>(&self, root: &'a DomNode) -> ProbeResult<&'a DomNode> {
        match root.get(&self.path) {
            Some(node) if node.tag == self.tag => Ok(node),
            _ => Err(self.stale()),
        }
    }

    /// Mutable variant of [`Self::locate`]
    pub fn locate_mut<'a>(&self, root: &'a mut DomNode) -> ProbeResult<&'a mut DomNode> {
        let stale = self.stale();
        match root.get_mut(&self.path) {
            Some(node) if node.tag == self.tag => Ok(node),
            _ => Err(stale),
        }
    }

    fn stale(&self) -> ProbeError {
        ProbeError::StaleElement {
            target: self.to_string(),
        }
    }
}

impl fmt::Display for ElementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> at {}", self.description, self.tag, self.path)
    }
}

/// Abstract page driver
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to an absolute URL and wait for the load to finish
    async fn navigate(&self, url: &str) -> ProbeResult<()>;

    /// Current page URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Reload the page
    async fn reload(&self) -> ProbeResult<()>;

    /// Capture the document body
    async fn snapshot(&self) -> ProbeResult<DomSnapshot>;

    /// Click the target.
    ///
    /// Must return without waiting for any native dialog the click opens.
    async fn click(&self, target: &ElementTarget) -> ProbeResult<()>;

    /// Replace the value of a form control, firing input events
    async fn fill(&self, target: &ElementTarget, value: &str) -> ProbeResult<()>;

    /// Empty a form control
    async fn clear(&self, target: &ElementTarget) -> ProbeResult<()>;

    /// Choose an option of a `<select>` by value or label
    async fn select_option(&self, target: &ElementTarget, value: &str) -> ProbeResult<()>;

    /// Wait up to `timeout` for a native dialog to be open
    async fn wait_for_dialog(&self, timeout: Duration) -> ProbeResult<Option<Dialog>>;

    /// Accept or dismiss the open native dialog
    async fn handle_dialog(&self, accept: bool) -> ProbeResult<()>;
}

/// Shared handle to a driver, as held by the harness components
pub type SharedDriver = Arc<dyn PageDriver>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn form() -> DomNode {
        DomNode::element("body").with_child(
            DomNode::element("form")
                .with_child(DomNode::element("input").with_id("title"))
                .with_child(DomNode::element("button").with_text("Add Task")),
        )
    }

    #[test]
    fn test_locate_checks_fingerprint() {
        let root = form();
        let target = ElementTarget::new(NodePath(vec![0, 1]), "button", "submit");
        assert_eq!(target.locate(&root).unwrap().own_text(), "Add Task");

        let wrong_tag = ElementTarget::new(NodePath(vec![0, 0]), "button", "submit");
        assert!(wrong_tag.locate(&root).unwrap_err().is_stale());

        let gone = ElementTarget::new(NodePath(vec![0, 5]), "button", "submit");
        assert!(gone.locate(&root).unwrap_err().is_stale());
    }

    #[test]
    fn test_locate_mut_allows_edits() {
        let mut root = form();
        let target = ElementTarget::new(NodePath(vec![0, 0]), "input", "title input");
        target.locate_mut(&mut root).unwrap().value = Some("Buy milk".to_string());
        assert_eq!(
            root.get(&NodePath(vec![0, 0])).unwrap().value.as_deref(),
            Some("Buy milk")
        );
    }

    #[test]
    fn test_display_names_description_and_path() {
        let target = ElementTarget::new(NodePath(vec![2, 0]), "button", "Delete for \"x\"");
        assert_eq!(target.to_string(), "Delete for \"x\" <button> at body>2>0");
    }
}
