//! Locator abstraction for element selection and interaction.
//!
//! Locators are strict and auto-wait, and they are never cached: every use
//! takes a fresh [`DomSnapshot`] from the driver and re-evaluates the
//! selector against it, so a locator built before a re-render still finds the
//! re-rendered element.
//!
//! - **Strict**: a strict locator that matches several elements fails with
//!   [`ProbeError::AmbiguousMatch`] instead of picking one.
//! - **Scoped**: [`Locator::within`] restricts matching to the subtree of
//!   another locator's (single) match.
//! - **Stale-tolerant**: interactions whose target changed between the
//!   snapshot and the action are re-resolved.

use crate::css::CssSelector;
use crate::dom::{normalize_whitespace, DomNode, DomSnapshot, NodePath};
use crate::driver::{ElementTarget, PageDriver};
use crate::resolver::CardQuery;
use crate::result::{ProbeError, ProbeResult};
use crate::retry::{retry, CheckOutcome, RetryConfig, Retried};
use std::fmt;
use std::time::Duration;

/// Default timeout for auto-waiting (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval for auto-waiting
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// How often an interaction re-resolves a target that went stale
const STALE_RETRIES: usize = 3;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector (e.g., `button[type="submit"]`)
    Css(String),
    /// Innermost elements whose rendered text matches
    Text {
        /// Text to look for
        text: String,
        /// Exact (case-sensitive, whole) match instead of case-insensitive
        /// containment
        exact: bool,
    },
    /// Elements by accessible role and name
    Role {
        /// ARIA role (`button`, `link`, `textbox`, ...)
        role: String,
        /// Accessible name filter
        name: Option<String>,
        /// Whole-name match instead of case-insensitive containment
        exact: bool,
    },
    /// Task card containers
    Card(CardQuery),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a containment text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: false,
        }
    }

    /// Create an exact text selector
    #[must_use]
    pub fn text_exact(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: true,
        }
    }

    /// Create a role selector; the name is matched by containment
    #[must_use]
    pub fn role(role: impl Into<String>, name: Option<&str>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.map(str::to_string),
            exact: false,
        }
    }

    /// Create a role selector with an exact name
    #[must_use]
    pub fn role_exact(role: impl Into<String>, name: &str) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name.to_string()),
            exact: true,
        }
    }

    /// Paths (relative to `root`, excluding `root` itself) of matching nodes
    /// in document order
    pub fn find_in(&self, root: &DomNode) -> ProbeResult<Vec<NodePath>> {
        match self {
            Self::Css(source) => {
                let css = CssSelector::parse(source)?;
                Ok(descendants(root)
                    .filter(|(path, _)| css.matches(root, path))
                    .map(|(path, _)| path)
                    .collect())
            }
            Self::Text { text, exact } => Ok(find_text(root, text, *exact)),
            Self::Role { role, name, exact } => Ok(descendants(root)
                .filter(|(_, node)| role_of(node) == Some(role.as_str()))
                .filter(|(_, node)| {
                    name.as_deref()
                        .map_or(true, |n| text_matches(&accessible_name(node), n, *exact))
                })
                .map(|(path, _)| path)
                .collect()),
            Self::Card(query) => Ok(query.find(root)),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css {s:?}"),
            Self::Text { text, exact: true } => write!(f, "text ={text:?}"),
            Self::Text { text, exact: false } => write!(f, "text {text:?}"),
            Self::Role { role, name: None, .. } => write!(f, "role {role}"),
            Self::Role {
                role,
                name: Some(name),
                ..
            } => write!(f, "role {role} named {name:?}"),
            Self::Card(query) => write!(f, "card {:?}", query.title),
        }
    }
}

fn descendants(root: &DomNode) -> impl Iterator<Item = (NodePath, &DomNode)> {
    root.walk()
        .into_iter()
        .skip(1)
        .map(|node_ref| (node_ref.path, node_ref.node))
}

fn text_matches(actual: &str, wanted: &str, exact: bool) -> bool {
    let wanted = normalize_whitespace(wanted);
    if exact {
        normalize_whitespace(actual) == wanted
    } else {
        normalize_whitespace(actual)
            .to_lowercase()
            .contains(&wanted.to_lowercase())
    }
}

/// Innermost rendered elements whose text matches
fn find_text(root: &DomNode, text: &str, exact: bool) -> Vec<NodePath> {
    let matched: Vec<NodePath> = descendants(root)
        .filter(|(_, node)| !node.is_non_rendered())
        .filter(|(_, node)| text_matches(&node.text_content(), text, exact))
        .map(|(path, _)| path)
        .collect();
    matched
        .iter()
        .filter(|path| !matched.iter().any(|other| path.is_ancestor_of(other)))
        .cloned()
        .collect()
}

/// Explicit or implicit ARIA role
fn role_of(node: &DomNode) -> Option<&str> {
    if let Some(role) = node.attr("role") {
        return Some(role);
    }
    let input_type = node.attr("type").unwrap_or("text");
    match node.tag.as_str() {
        "button" => Some("button"),
        "input" => match input_type {
            "button" | "submit" | "reset" => Some("button"),
            "checkbox" => Some("checkbox"),
            "radio" => Some("radio"),
            "hidden" => None,
            _ => Some("textbox"),
        },
        "textarea" => Some("textbox"),
        "select" => Some("combobox"),
        "a" if node.attr("href").is_some() => Some("link"),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some("heading"),
        "dialog" => Some("dialog"),
        _ => None,
    }
}

/// `aria-label`, else the button value, else the rendered text
fn accessible_name(node: &DomNode) -> String {
    if let Some(label) = node.attr("aria-label") {
        return label.to_string();
    }
    if node.tag == "input" {
        return node
            .value
            .clone()
            .or_else(|| node.attr("value").map(str::to_string))
            .unwrap_or_default();
    }
    node.text_content()
}

/// Options for locator behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Timeout for auto-waiting
    pub timeout: Duration,
    /// Polling interval for auto-waiting
    pub poll_interval: Duration,
    /// Whether to require strict single-element match
    pub strict: bool,
    /// Whether the element must be visible
    pub visible: bool,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            strict: true,
            visible: true,
        }
    }
}

impl LocatorOptions {
    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Retry budget derived from these options
    #[must_use]
    pub const fn retry(&self) -> RetryConfig {
        RetryConfig::new(self.timeout).with_poll_interval(self.poll_interval)
    }
}

#[derive(Debug, Clone, Copy)]
enum Interaction<'v> {
    Click,
    Fill(&'v str),
    Clear,
    Select(&'v str),
}

/// A locator for finding and interacting with elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    selector: Selector,
    scope: Option<Box<Locator>>,
    options: LocatorOptions,
}

impl Locator {
    /// Create a new locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create a locator from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            scope: None,
            options: LocatorOptions::default(),
        }
    }

    /// Restrict matching to the subtree of `scope`'s match
    #[must_use]
    pub fn within(mut self, scope: Self) -> Self {
        self.scope = Some(Box::new(scope));
        self
    }

    /// A locator for `selector` inside this locator's match, sharing its
    /// options
    #[must_use]
    pub fn locator(&self, selector: Selector) -> Self {
        Self {
            selector,
            scope: Some(Box::new(self.clone())),
            options: self.options,
        }
    }

    /// Set a custom timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Disable strict mode (allow multiple matches)
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Set visibility requirement
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.options.visible = visible;
        self
    }

    /// Replace all options
    #[must_use]
    pub const fn with_options(mut self, options: LocatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Human-readable description used in errors and logs
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{} within {}", self.selector, scope.describe()),
            None => self.selector.to_string(),
        }
    }

    /// Absolute paths of all matches in `snapshot`, honouring scope and
    /// visibility
    pub fn matches(&self, snapshot: &DomSnapshot) -> ProbeResult<Vec<NodePath>> {
        let base = match &self.scope {
            None => NodePath::root(),
            Some(scope) => match scope.pick(snapshot)? {
                Some(path) => path,
                None => return Ok(Vec::new()),
            },
        };
        let Some(root) = snapshot.get(&base) else {
            return Ok(Vec::new());
        };
        let paths = self
            .selector
            .find_in(root)?
            .into_iter()
            .map(|relative| base.join(&relative))
            .filter(|path| !self.options.visible || snapshot.is_visible(path))
            .collect();
        Ok(paths)
    }

    /// The single match a strict locator needs, or the first of a lax one
    fn pick(&self, snapshot: &DomSnapshot) -> ProbeResult<Option<NodePath>> {
        let mut paths = self.matches(snapshot)?;
        if self.options.strict && paths.len() > 1 {
            return Err(ProbeError::AmbiguousMatch {
                target: self.describe(),
                count: paths.len(),
            });
        }
        if paths.is_empty() {
            Ok(None)
        } else {
            Ok(Some(paths.swap_remove(0)))
        }
    }

    /// One resolution attempt against `snapshot`
    pub fn resolve_in(&self, snapshot: &DomSnapshot) -> ProbeResult<CheckOutcome<ElementTarget>> {
        match self.pick(snapshot)? {
            Some(path) => {
                let tag = snapshot
                    .get(&path)
                    .map(|node| node.tag.clone())
                    .unwrap_or_default();
                Ok(CheckOutcome::Pass(ElementTarget::new(path, tag, self.describe())))
            }
            None => Ok(CheckOutcome::Fail(format!("no element matches {}", self.describe()))),
        }
    }

    /// Wait until the locator resolves.
    ///
    /// Fails with [`ProbeError::ElementNotFound`] when nothing matches within
    /// the timeout, and immediately with [`ProbeError::AmbiguousMatch`] when a
    /// strict locator matches several elements.
    pub async fn resolve(&self, driver: &dyn PageDriver) -> ProbeResult<ElementTarget> {
        let this = self;
        let outcome = retry(self.options.retry(), move || async move {
            let snapshot = driver.snapshot().await?;
            this.resolve_in(&snapshot)
        })
        .await?;
        match outcome {
            Retried::Passed(result) => {
                tracing::debug!(element = %result.value, attempts = result.attempts, "resolved");
                Ok(result.value)
            }
            Retried::Exhausted(_) => Err(ProbeError::ElementNotFound {
                target: self.describe(),
                timeout_ms: self.options.retry().timeout_ms(),
            }),
        }
    }

    /// Resolve and return a copy of the matched node
    pub async fn node(&self, driver: &dyn PageDriver) -> ProbeResult<DomNode> {
        let target = self.resolve(driver).await?;
        let snapshot = driver.snapshot().await?;
        target.locate(&snapshot.root).cloned()
    }

    /// Number of matches right now (no waiting, never strict)
    pub async fn count(&self, driver: &dyn PageDriver) -> ProbeResult<usize> {
        let snapshot = driver.snapshot().await?;
        Ok(self.matches(&snapshot)?.len())
    }

    /// Whether the locator has a visible match right now
    pub async fn is_visible(&self, driver: &dyn PageDriver) -> ProbeResult<bool> {
        let snapshot = driver.snapshot().await?;
        let visible = self.clone().with_visible(true).with_strict(false);
        Ok(!visible.matches(&snapshot)?.is_empty())
    }

    /// First match right now, ignoring strictness
    pub async fn first_match(&self, driver: &dyn PageDriver) -> ProbeResult<Option<ElementTarget>> {
        let snapshot = driver.snapshot().await?;
        let lax = self.clone().with_strict(false);
        match lax.resolve_in(&snapshot)? {
            CheckOutcome::Pass(target) => Ok(Some(target)),
            CheckOutcome::Fail(_) => Ok(None),
        }
    }

    /// Rendered text of the match
    pub async fn text_content(&self, driver: &dyn PageDriver) -> ProbeResult<String> {
        Ok(self.node(driver).await?.text_content())
    }

    /// Current value of a form control
    pub async fn input_value(&self, driver: &dyn PageDriver) -> ProbeResult<String> {
        Ok(self.node(driver).await?.value.unwrap_or_default())
    }

    /// Click the match
    pub async fn click(&self, driver: &dyn PageDriver) -> ProbeResult<()> {
        self.interact(driver, Interaction::Click).await
    }

    /// Replace the value of the match
    pub async fn fill(&self, driver: &dyn PageDriver, value: &str) -> ProbeResult<()> {
        self.interact(driver, Interaction::Fill(value)).await
    }

    /// Empty the match
    pub async fn clear(&self, driver: &dyn PageDriver) -> ProbeResult<()> {
        self.interact(driver, Interaction::Clear).await
    }

    /// Choose an option of the matched `<select>`
    pub async fn select_option(&self, driver: &dyn PageDriver, value: &str) -> ProbeResult<()> {
        self.interact(driver, Interaction::Select(value)).await
    }

    async fn interact(&self, driver: &dyn PageDriver, interaction: Interaction<'_>) -> ProbeResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let target = self.resolve(driver).await?;
            let result = match interaction {
                Interaction::Click => driver.click(&target).await,
                Interaction::Fill(value) => driver.fill(&target, value).await,
                Interaction::Clear => driver.clear(&target).await,
                Interaction::Select(value) => driver.select_option(&target, value).await,
            };
            match result {
                Err(err) if err.is_stale() && attempt < STALE_RETRIES => {
                    tracing::debug!(element = %target, attempt, "target went stale, re-resolving");
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::StaticPage;

    fn page() -> DomNode {
        DomNode::element("body")
            .with_child(
                DomNode::element("form")
                    .with_child(DomNode::element("input").with_id("title"))
                    .with_child(
                        DomNode::element("select")
                            .with_id("priority")
                            .with_children(["Low", "Medium", "High"].map(|p| {
                                DomNode::element("option").with_attr("value", p).with_text(p)
                            })),
                    )
                    .with_child(
                        DomNode::element("button")
                            .with_attr("type", "submit")
                            .with_text("Add Task"),
                    ),
            )
            .with_child(
                DomNode::element("div")
                    .with_id("list")
                    .with_child(
                        DomNode::element("div")
                            .with_class("card")
                            .with_child(DomNode::element("h3").with_text("Write report"))
                            .with_child(DomNode::element("button").with_text("Edit"))
                            .with_child(DomNode::element("button").with_text("Delete")),
                    )
                    .with_child(
                        DomNode::element("div")
                            .with_class("card")
                            .with_child(DomNode::element("h3").with_text("Edit report"))
                            .with_child(DomNode::element("button").with_text("Edit"))
                            .with_child(DomNode::element("button").with_text("Delete")),
                    ),
            )
            .with_child(DomNode::element("div").hidden().with_child(
                DomNode::element("button").with_attr("aria-label", "Close modal"),
            ))
    }

    fn snapshot() -> DomSnapshot {
        DomSnapshot::new("http://app/dashboard", page())
    }

    fn fast(locator: Locator) -> Locator {
        locator.with_options(
            LocatorOptions::default()
                .with_timeout(Duration::from_millis(200))
                .with_poll_interval(Duration::from_millis(10)),
        )
    }

    mod selector_tests {
        use super::*;

        #[test]
        fn test_css_find() {
            let found = Selector::css("select#priority option").find_in(&page()).unwrap();
            assert_eq!(found.len(), 3);
        }

        #[test]
        fn test_invalid_css_is_reported() {
            let err = Selector::css("button:hover").find_in(&page()).unwrap_err();
            assert!(matches!(err, ProbeError::InvalidSelector { .. }));
        }

        #[test]
        fn test_text_is_innermost_and_case_insensitive() {
            let found = Selector::text("write REPORT").find_in(&page()).unwrap();
            assert_eq!(found, vec![NodePath(vec![1, 0, 0])]);
        }

        #[test]
        fn test_exact_text() {
            let found = Selector::text_exact("Edit").find_in(&page()).unwrap();
            assert_eq!(found, vec![NodePath(vec![1, 0, 1]), NodePath(vec![1, 1, 1])]);
            let loose = Selector::text("Edit").find_in(&page()).unwrap();
            assert_eq!(loose.len(), 3);
        }

        #[test]
        fn test_role_button_with_name() {
            let found = Selector::role("button", Some("add")).find_in(&page()).unwrap();
            assert_eq!(found, vec![NodePath(vec![0, 2])]);
            let by_label = Selector::role_exact("button", "Close modal")
                .find_in(&page())
                .unwrap();
            assert_eq!(by_label, vec![NodePath(vec![2, 0])]);
        }

        #[test]
        fn test_roles_of_form_controls() {
            assert_eq!(Selector::role("textbox", None).find_in(&page()).unwrap().len(), 1);
            assert_eq!(Selector::role("combobox", None).find_in(&page()).unwrap().len(), 1);
            assert_eq!(Selector::role("heading", None).find_in(&page()).unwrap().len(), 2);
        }

        #[test]
        fn test_display() {
            assert_eq!(Selector::css("a").to_string(), "css \"a\"");
            assert_eq!(
                Selector::role("button", Some("OK")).to_string(),
                "role button named \"OK\""
            );
        }
    }

    mod matching_tests {
        use super::*;

        #[test]
        fn test_hidden_elements_are_filtered() {
            let locator = Locator::from_selector(Selector::role("button", Some("Close modal")));
            assert!(locator.matches(&snapshot()).unwrap().is_empty());
            let any = locator.with_visible(false);
            assert_eq!(any.matches(&snapshot()).unwrap().len(), 1);
        }

        #[test]
        fn test_scoped_matching() {
            let card = Locator::new("div.card:has-text(\"Edit report\")");
            let edit = card.locator(Selector::text_exact("Edit"));
            assert_eq!(
                edit.matches(&snapshot()).unwrap(),
                vec![NodePath(vec![1, 1, 1])]
            );
            assert_eq!(edit.describe(), "text =\"Edit\" within css \"div.card:has-text(\\\"Edit report\\\")\"");
        }

        #[test]
        fn test_ambiguous_scope_fails() {
            let edit = Locator::new("div.card").locator(Selector::text_exact("Edit"));
            let err = edit.matches(&snapshot()).unwrap_err();
            assert!(matches!(err, ProbeError::AmbiguousMatch { count: 2, .. }));
        }

        #[test]
        fn test_missing_scope_matches_nothing() {
            let edit = Locator::new("div.card:has-text(\"nope\")").locator(Selector::text("Edit"));
            assert!(edit.matches(&snapshot()).unwrap().is_empty());
        }

        #[test]
        fn test_resolve_in_strictness() {
            let strict = Locator::from_selector(Selector::text_exact("Delete"));
            assert!(matches!(
                strict.resolve_in(&snapshot()),
                Err(ProbeError::AmbiguousMatch { count: 2, .. })
            ));
            let lax = strict.with_strict(false);
            match lax.resolve_in(&snapshot()).unwrap() {
                CheckOutcome::Pass(target) => {
                    assert_eq!(target.path, NodePath(vec![1, 0, 2]));
                    assert_eq!(target.tag, "button");
                }
                CheckOutcome::Fail(msg) => panic!("{msg}"),
            }
        }
    }

    mod driver_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_resolve_times_out_with_element_not_found() {
            let driver = StaticPage::new(snapshot());
            let err = fast(Locator::new("input#missing"))
                .resolve(&driver)
                .await
                .unwrap_err();
            match err {
                ProbeError::ElementNotFound { target, timeout_ms } => {
                    assert!(target.contains("input#missing"));
                    assert_eq!(timeout_ms, 200);
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_fill_and_read_back() {
            let driver = StaticPage::new(snapshot());
            let title = fast(Locator::new("input#title"));
            title.fill(&driver, "Buy milk").await.unwrap();
            assert_eq!(title.input_value(&driver).await.unwrap(), "Buy milk");
            title.clear(&driver).await.unwrap();
            assert_eq!(title.input_value(&driver).await.unwrap(), "");
        }

        #[tokio::test]
        async fn test_select_option() {
            let driver = StaticPage::new(snapshot());
            let priority = fast(Locator::new("select#priority"));
            priority.select_option(&driver, "High").await.unwrap();
            assert_eq!(priority.input_value(&driver).await.unwrap(), "High");
        }

        #[tokio::test]
        async fn test_click_is_recorded() {
            let driver = StaticPage::new(snapshot());
            fast(Locator::new("button[type=\"submit\"]"))
                .click(&driver)
                .await
                .unwrap();
            assert_eq!(driver.clicks(), vec![NodePath(vec![0, 2])]);
        }

        #[tokio::test]
        async fn test_count_visible_and_first() {
            let driver = StaticPage::new(snapshot());
            let delete = Locator::from_selector(Selector::text_exact("Delete"));
            assert_eq!(delete.count(&driver).await.unwrap(), 2);
            assert!(delete.is_visible(&driver).await.unwrap());
            let first = delete.first_match(&driver).await.unwrap().unwrap();
            assert_eq!(first.path, NodePath(vec![1, 0, 2]));

            let close = Locator::from_selector(Selector::role("button", Some("Close")));
            assert!(!close.is_visible(&driver).await.unwrap());
            assert!(close.first_match(&driver).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_text_content() {
            let driver = StaticPage::new(snapshot());
            let card = fast(Locator::new("div.card:has-text(\"Write report\")"));
            assert_eq!(
                card.text_content(&driver).await.unwrap(),
                "Write report Edit Delete"
            );
        }
    }
}
