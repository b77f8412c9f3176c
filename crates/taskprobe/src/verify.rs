//! Verification Layer: post-condition checks that poll until they hold.
//!
//! Checks only read the page. Each one re-snapshots the DOM every poll
//! interval until it passes or the expect timeout runs out, then fails with
//! [`ProbeError::AssertionFailed`] (or [`ProbeError::ValidationMismatch`] for
//! field validity).

use crate::config::HarnessConfig;
use crate::dom::{char_prefix, normalize_whitespace, DomNode, DomSnapshot};
use crate::driver::SharedDriver;
use crate::locator::{Locator, Selector};
use crate::page_object::{AppPage, PageObject};
use crate::resolver::{CardAction, ElementResolver, Field};
use crate::result::{ProbeError, ProbeResult};
use crate::retry::{retry, CheckOutcome, Retried, RetryConfig};
use crate::title::TaskRef;
use regex::Regex;
use std::fmt;

type Check<T> = CheckOutcome<T>;

/// Polled assertions against the page
#[derive(Clone)]
pub struct Verifier {
    driver: SharedDriver,
    config: HarnessConfig,
    resolver: ElementResolver,
    completed_marker: Regex,
    retry: RetryConfig,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    /// Verifier over `driver` using the expect budget of `config`
    ///
    /// # Errors
    ///
    /// Fails when the card container selector or the completed-marker regex
    /// does not parse.
    pub fn new(driver: SharedDriver, config: HarnessConfig) -> ProbeResult<Self> {
        let resolver = ElementResolver::new(
            config.conventions.clone(),
            config.text.clone(),
            config.timeouts.expect_locator(),
        )?;
        let completed_marker = Regex::new(&config.conventions.completed_marker)
            .map_err(|e| ProbeError::config(format!("completed_marker: {e}")))?;
        let retry = config.timeouts.expect_retry();
        Ok(Self {
            driver,
            config,
            resolver,
            completed_marker,
            retry,
        })
    }

    /// Same verifier with a different polling budget
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Poll `check` against fresh snapshots until it passes
    async fn poll<T, F>(&self, check: &'static str, target: &str, f: F) -> ProbeResult<T>
    where
        F: Fn(&DomSnapshot) -> ProbeResult<Check<T>>,
    {
        let driver = self.driver.as_ref();
        let f = &f;
        let outcome = retry(self.retry, move || async move {
            let snapshot = driver.snapshot().await?;
            f(&snapshot)
        })
        .await?;
        match outcome {
            Retried::Passed(result) => {
                tracing::debug!(check, target, attempts = result.attempts, "check passed");
                Ok(result.value)
            }
            Retried::Exhausted(e) => Err(ProbeError::AssertionFailed {
                check,
                target: target.to_string(),
                message: e.message.clone(),
                attempts: e.attempts,
                elapsed_ms: e.elapsed_ms(),
            }),
        }
    }

    /// The card of `task` in `snapshot`, if resolvable
    fn card_in<'s>(&self, snapshot: &'s DomSnapshot, task: &TaskRef) -> ProbeResult<Option<&'s DomNode>> {
        Ok(match self.resolver.card(task).resolve_in(snapshot)? {
            CheckOutcome::Pass(target) => snapshot.get(&target.path),
            CheckOutcome::Fail(_) => None,
        })
    }

    fn with_card<T>(
        &self,
        snapshot: &DomSnapshot,
        task: &TaskRef,
        f: impl FnOnce(&DomNode) -> Check<T>,
    ) -> ProbeResult<Check<T>> {
        Ok(match self.card_in(snapshot, task)? {
            Some(card) => f(card),
            None => CheckOutcome::Fail(format!("no card for {task}")),
        })
    }

    // ---- card checks -----------------------------------------------------

    /// The card of `task` is on the page
    pub async fn assert_exists(&self, task: &TaskRef) -> ProbeResult<()> {
        self.poll("exists", task.title(), |snapshot| {
            self.with_card(snapshot, task, |_| CheckOutcome::Pass(()))
        })
        .await
    }

    /// No card matches `task`
    pub async fn assert_absent(&self, task: &TaskRef) -> ProbeResult<()> {
        let cards = self.resolver.card(task).with_strict(false).with_visible(false);
        self.poll("absent", task.title(), |snapshot| {
            let count = cards.matches(snapshot)?.len();
            Ok(if count == 0 {
                CheckOutcome::Pass(())
            } else {
                CheckOutcome::Fail(format!("{count} card(s) still present"))
            })
        })
        .await
    }

    /// The card or something inside it carries the completed marker
    pub async fn assert_completed(&self, task: &TaskRef) -> ProbeResult<()> {
        self.poll("completed", task.title(), |snapshot| {
            self.with_card(snapshot, task, |card| {
                if card.walk().iter().any(|n| self.is_marked_completed(n.node)) {
                    CheckOutcome::Pass(())
                } else {
                    CheckOutcome::Fail("no completed marker in card".to_string())
                }
            })
        })
        .await
    }

    fn is_marked_completed(&self, node: &DomNode) -> bool {
        node.classes.iter().any(|c| self.completed_marker.is_match(c))
            || node.attr("style").is_some_and(|s| s.contains("line-through"))
    }

    /// Each supplied value is visible inside the card of `task`
    pub async fn assert_fields_visible(
        &self,
        task: &TaskRef,
        description: Option<&str>,
        priority: Option<&str>,
    ) -> ProbeResult<()> {
        let card = self.resolver.card(task);
        let wanted: Vec<(&str, Locator)> = [description, priority]
            .into_iter()
            .flatten()
            .filter(|v| !v.is_empty())
            .map(|v| (v, card.locator(Selector::text(v)).with_strict(false)))
            .collect();
        self.poll("fields visible", task.title(), |snapshot| {
            if self.card_in(snapshot, task)?.is_none() {
                return Ok(CheckOutcome::Fail(format!("no card for {task}")));
            }
            for (value, locator) in &wanted {
                if locator.matches(snapshot)?.is_empty() {
                    return Ok(CheckOutcome::Fail(format!("{value:?} not visible in card")));
                }
            }
            Ok(CheckOutcome::Pass(()))
        })
        .await
    }

    /// Long `text` shows in the card: verbatim, else by its leading
    /// characters, else by containment of a shorter prefix
    pub async fn assert_long_text(&self, task: &TaskRef, text: &str) -> ProbeResult<()> {
        let wanted = normalize_whitespace(text);
        let prefix = char_prefix(&wanted, self.config.text.exact_prefix_chars).to_string();
        let contained = char_prefix(&wanted, self.config.text.containment_prefix_chars).to_string();
        self.poll("long text", task.title(), |snapshot| {
            self.with_card(snapshot, task, |card| {
                let nodes = card.walk();
                let visible = || nodes.iter().filter(|n| n.visible).map(|n| n.node.text_content());
                if visible().any(|t| t == wanted) {
                    tracing::debug!("long text matched verbatim");
                    CheckOutcome::Pass(())
                } else if visible().any(|t| t.starts_with(&prefix)) {
                    tracing::debug!("long text matched by prefix");
                    CheckOutcome::Pass(())
                } else if card.text_content().contains(&contained) {
                    tracing::debug!("long text matched by containment");
                    CheckOutcome::Pass(())
                } else {
                    CheckOutcome::Fail("text not found in card".to_string())
                }
            })
        })
        .await
    }

    /// The card of `task` currently shows `action`'s button
    pub async fn assert_toggle_label(&self, task: &TaskRef, action: CardAction) -> ProbeResult<()> {
        let button = self.resolver.action_button(task, action);
        self.poll("toggle label", task.title(), |snapshot| {
            Ok(match button.resolve_in(snapshot)? {
                CheckOutcome::Pass(_) => CheckOutcome::Pass(()),
                CheckOutcome::Fail(_) => CheckOutcome::Fail(format!(
                    "no {:?} button",
                    action.label(self.resolver.conventions())
                )),
            })
        })
        .await
    }

    /// Exactly `expected` cards match `title`
    pub async fn assert_card_count(&self, title: &str, expected: usize) -> ProbeResult<()> {
        let cards = Locator::from_selector(Selector::Card(self.resolver.card_query(title)))
            .with_strict(false);
        self.poll("card count", title, |snapshot| {
            let count = cards.matches(snapshot)?.len();
            Ok(if count == expected {
                CheckOutcome::Pass(())
            } else {
                CheckOutcome::Fail(format!("expected {expected} card(s), found {count}"))
            })
        })
        .await
    }

    /// Markup in the card's text was not turned into a `<script>` element
    pub async fn assert_no_script_in_card(&self, task: &TaskRef) -> ProbeResult<()> {
        self.poll("no script", task.title(), |snapshot| {
            self.with_card(snapshot, task, |card| {
                if card.walk().iter().any(|n| n.node.tag == "script") {
                    CheckOutcome::Fail("card contains a <script> element".to_string())
                } else {
                    CheckOutcome::Pass(())
                }
            })
        })
        .await
    }

    /// Number of visible delete controls on the page
    pub async fn assert_delete_control_count(&self, expected: usize) -> ProbeResult<()> {
        let controls = self.resolver.delete_controls();
        self.poll("delete control count", "page", |snapshot| {
            let count = controls.matches(snapshot)?.len();
            Ok(if count == expected {
                CheckOutcome::Pass(())
            } else {
                CheckOutcome::Fail(format!("expected {expected}, found {count}"))
            })
        })
        .await
    }

    /// Visible delete controls right now, without waiting
    pub async fn delete_control_count(&self) -> ProbeResult<usize> {
        let snapshot = self.driver.snapshot().await?;
        Ok(self.resolver.delete_controls().matches(&snapshot)?.len())
    }

    /// The `<select>` for `field` offers exactly `expected`, in order
    pub async fn assert_select_options(&self, field: Field, expected: &[String]) -> ProbeResult<()> {
        let locator = self.resolver.field(field);
        self.poll("select options", &field.to_string(), |snapshot| {
            let node = match locator.resolve_in(snapshot)? {
                CheckOutcome::Pass(target) => target.locate(&snapshot.root)?,
                CheckOutcome::Fail(message) => return Ok(CheckOutcome::Fail(message)),
            };
            let offered: Vec<String> = node
                .children
                .iter()
                .filter(|child| child.tag == "option")
                .map(DomNode::text_content)
                .collect();
            Ok(if offered == expected {
                CheckOutcome::Pass(())
            } else {
                CheckOutcome::Fail(format!("expected {expected:?}, found {offered:?}"))
            })
        })
        .await
    }

    // ---- page checks -----------------------------------------------------

    /// `text` is visible somewhere on the page
    pub async fn assert_text_visible(&self, text: &str) -> ProbeResult<()> {
        let locator = self.resolver.text(text).with_strict(false);
        self.poll("text visible", text, |snapshot| {
            Ok(if locator.matches(snapshot)?.is_empty() {
                CheckOutcome::Fail("not visible".to_string())
            } else {
                CheckOutcome::Pass(())
            })
        })
        .await
    }

    /// `text` is not visible anywhere on the page
    pub async fn assert_text_absent(&self, text: &str) -> ProbeResult<()> {
        let locator = self.resolver.text(text).with_strict(false);
        self.poll("text absent", text, |snapshot| {
            let count = locator.matches(snapshot)?.len();
            Ok(if count == 0 {
                CheckOutcome::Pass(())
            } else {
                CheckOutcome::Fail(format!("visible {count} time(s)"))
            })
        })
        .await
    }

    /// The URL belongs to `page` and its heading is visible
    pub async fn assert_on_page(&self, page: &impl PageObject) -> ProbeResult<()> {
        let heading = page
            .heading()
            .map(|h| self.resolver.text(h).with_strict(false));
        self.poll("on page", page.page_name(), |snapshot| {
            if !page.matches_url(&snapshot.url) {
                return Ok(CheckOutcome::Fail(format!("at {}", snapshot.url)));
            }
            if let Some(heading) = &heading {
                if heading.matches(snapshot)?.is_empty() {
                    return Ok(CheckOutcome::Fail("heading not visible".to_string()));
                }
            }
            Ok(CheckOutcome::Pass(()))
        })
        .await
    }

    /// On the dashboard with its heading visible
    pub async fn assert_on_dashboard(&self) -> ProbeResult<()> {
        self.assert_on_page(&AppPage::dashboard(&self.config)).await
    }

    /// On the login page with its heading visible
    pub async fn assert_on_login_page(&self) -> ProbeResult<()> {
        self.assert_on_page(&AppPage::login(&self.config)).await
    }

    /// On the landing page with the welcome text visible
    pub async fn assert_on_home_page(&self) -> ProbeResult<()> {
        self.assert_on_page(&AppPage::home(&self.config)).await
    }

    /// The URL equals `expected` (absolute, or relative to the base URL)
    pub async fn assert_url(&self, expected: &str) -> ProbeResult<()> {
        let expected = self.config.url_for(expected);
        let want = expected.trim_end_matches('/');
        self.poll("url", &expected, |snapshot| {
            Ok(if snapshot.url.trim_end_matches('/') == want {
                CheckOutcome::Pass(())
            } else {
                CheckOutcome::Fail(format!("at {}", snapshot.url))
            })
        })
        .await
    }

    // ---- form validation -------------------------------------------------

    /// Current validation message of `field`
    pub async fn field_validation_message(&self, field: Field) -> ProbeResult<String> {
        let node = self.resolver.field(field).node(self.driver.as_ref()).await?;
        Ok(node.validity.map(|v| v.message).unwrap_or_default())
    }

    /// `field` is invalid: its message contains `expected` or a known locale
    /// variant, or failing that it is required and reports invalid
    pub async fn assert_field_invalid(&self, field: Field, expected: &str) -> ProbeResult<()> {
        let locator = self.resolver.field(field);
        let mut accepted = vec![expected.to_string()];
        accepted.extend(
            self.config
                .text
                .validation_variants
                .iter()
                .filter(|v| v.as_str() != expected)
                .cloned(),
        );
        let result = self
            .poll("field invalid", &field.to_string(), |snapshot| {
                let node = match locator.resolve_in(snapshot)? {
                    CheckOutcome::Pass(target) => target.locate(&snapshot.root)?,
                    CheckOutcome::Fail(message) => return Ok(CheckOutcome::Fail(message)),
                };
                let validity = node.validity.clone().unwrap_or_default();
                let state = format!(
                    "message={:?} valid={} required={}",
                    validity.message,
                    validity.valid,
                    node.is_required()
                );
                let message_matches = !validity.message.is_empty()
                    && accepted.iter().any(|a| validity.message.contains(a.as_str()));
                Ok(if message_matches || (!validity.valid && node.is_required()) {
                    CheckOutcome::Pass(())
                } else {
                    CheckOutcome::Fail(state)
                })
            })
            .await;
        match result {
            Err(ProbeError::AssertionFailed { message, .. }) => Err(ProbeError::ValidationMismatch {
                field: field.to_string(),
                expected: accepted,
                actual: message,
            }),
            other => other,
        }
    }
}
