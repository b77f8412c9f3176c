//! A driver over a fixed DOM tree.

use crate::dialog::Dialog;
use crate::dom::{DomNode, DomSnapshot, NodePath};
use crate::driver::{ElementTarget, PageDriver};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
struct PageState {
    url: String,
    root: DomNode,
    clicks: Vec<NodePath>,
}

/// Serves one DOM tree; fills and selections update node values, clicks are
/// only recorded.
#[derive(Debug)]
pub struct StaticPage {
    state: Mutex<PageState>,
}

impl StaticPage {
    /// Serve `snapshot`
    #[must_use]
    pub fn new(snapshot: DomSnapshot) -> Self {
        Self {
            state: Mutex::new(PageState {
                url: snapshot.url,
                root: snapshot.root,
                clicks: Vec::new(),
            }),
        }
    }

    /// Swap the served tree, as if the page re-rendered
    pub fn set_root(&self, root: DomNode) {
        if let Ok(mut state) = self.state.lock() {
            state.root = root;
        }
    }

    /// Paths clicked so far
    #[must_use]
    pub fn clicks(&self) -> Vec<NodePath> {
        self.state.lock().map(|s| s.clicks.clone()).unwrap_or_default()
    }

    fn lock(&self) -> ProbeResult<MutexGuard<'_, PageState>> {
        self.state
            .lock()
            .map_err(|_| ProbeError::page("static page state poisoned"))
    }
}

#[async_trait]
impl PageDriver for StaticPage {
    async fn navigate(&self, url: &str) -> ProbeResult<()> {
        self.lock()?.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.lock()?.url.clone())
    }

    async fn reload(&self) -> ProbeResult<()> {
        Ok(())
    }

    async fn snapshot(&self) -> ProbeResult<DomSnapshot> {
        let state = self.lock()?;
        Ok(DomSnapshot::new(state.url.clone(), state.root.clone()))
    }

    async fn click(&self, target: &ElementTarget) -> ProbeResult<()> {
        let mut state = self.lock()?;
        let _ = target.locate(&state.root)?;
        state.clicks.push(target.path.clone());
        Ok(())
    }

    async fn fill(&self, target: &ElementTarget, value: &str) -> ProbeResult<()> {
        let mut state = self.lock()?;
        target.locate_mut(&mut state.root)?.value = Some(value.to_string());
        Ok(())
    }

    async fn clear(&self, target: &ElementTarget) -> ProbeResult<()> {
        self.fill(target, "").await
    }

    async fn select_option(&self, target: &ElementTarget, value: &str) -> ProbeResult<()> {
        let mut state = self.lock()?;
        let node = target.locate_mut(&mut state.root)?;
        let option = node
            .children
            .iter()
            .find(|o| o.attr("value") == Some(value) || o.own_text() == value)
            .map(|o| o.attr("value").map_or_else(|| o.own_text(), str::to_string))
            .ok_or_else(|| ProbeError::page(format!("no option {value:?} in {target}")))?;
        node.value = Some(option);
        Ok(())
    }

    async fn wait_for_dialog(&self, timeout: Duration) -> ProbeResult<Option<Dialog>> {
        tokio::time::sleep(timeout).await;
        Ok(None)
    }

    async fn handle_dialog(&self, _accept: bool) -> ProbeResult<()> {
        Err(ProbeError::invalid_state("no dialog is open"))
    }
}
