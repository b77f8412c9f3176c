//! Confirmation Protocol: accept (or decline) whatever confirmation step a
//! destructive action triggers.
//!
//! The application either opens a native `confirm()` dialog or renders an
//! in-page control. Both are watched at once and the first to show up is
//! answered; the other watcher is dropped. When neither appears within its
//! budget the action is taken to have needed no confirmation.
//!
//! ```text
//! Idle --arm--> AwaitingConfirmation --confirm--> Accepted(mechanism)
//!                                     \            Declined(Timeout)
//!                                      --cancel--> Declined(Cancelled(mechanism))
//!                                                  Declined(Timeout)
//! ```

use crate::config::{Conventions, Timeouts};
use crate::css::CssSelector;
use crate::dom::{DomNode, DomSnapshot, NodePath};
use crate::driver::{ElementTarget, PageDriver};
use crate::locator::Selector;
use crate::resolver::ElementResolver;
use crate::result::{ProbeError, ProbeResult};
use crate::retry::{retry, CheckOutcome, Retried, RetryConfig};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

const CLICK_ATTEMPTS: usize = 3;

/// How a confirmation request was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    /// A native browser dialog
    NativeDialog,
    /// A button rendered by the application
    InAppControl,
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NativeDialog => write!(f, "native dialog"),
            Self::InAppControl => write!(f, "in-app control"),
        }
    }
}

/// Why a request ended without acceptance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// Nothing appeared in time
    Timeout,
    /// The request was explicitly declined
    Cancelled(Mechanism),
}

/// Protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmationState {
    #[default]
    /// Not armed yet
    Idle,
    /// Armed; the destructive action may have been triggered
    AwaitingConfirmation,
    /// A confirmation was accepted through the given mechanism
    Accepted(Mechanism),
    /// Nothing was accepted
    Declined(DeclineReason),
}

impl ConfirmationState {
    /// Whether the protocol has finished
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted(_) | Self::Declined(_))
    }
}

/// Final state of one confirmation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationOutcome {
    /// Terminal state reached
    pub state: ConfirmationState,
    /// Time from the start of the wait to the answer
    pub elapsed: Duration,
}

impl ConfirmationOutcome {
    /// Accepted through either mechanism
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self.state, ConfirmationState::Accepted(_))
    }

    /// Mechanism that answered, if any
    #[must_use]
    pub const fn mechanism(&self) -> Option<Mechanism> {
        match self.state {
            ConfirmationState::Accepted(m)
            | ConfirmationState::Declined(DeclineReason::Cancelled(m)) => Some(m),
            _ => None,
        }
    }

    /// Ended because nothing appeared
    #[must_use]
    pub const fn timed_out(&self) -> bool {
        matches!(self.state, ConfirmationState::Declined(DeclineReason::Timeout))
    }
}

/// One confirmation request against a page
pub struct ConfirmationProtocol<'d> {
    driver: &'d dyn PageDriver,
    state: ConfirmationState,
    confirm_labels: Vec<String>,
    cancel_label: String,
    edit_label: String,
    container: Option<CssSelector>,
    dialog_timeout: Duration,
    in_app_timeout: Duration,
    poll_interval: Duration,
}

impl fmt::Debug for ConfirmationProtocol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationProtocol")
            .field("state", &self.state)
            .field("confirm_labels", &self.confirm_labels)
            .field("dialog_timeout", &self.dialog_timeout)
            .field("in_app_timeout", &self.in_app_timeout)
            .finish_non_exhaustive()
    }
}

impl<'d> ConfirmationProtocol<'d> {
    /// A protocol in [`ConfirmationState::Idle`]
    #[must_use]
    pub fn new(driver: &'d dyn PageDriver, resolver: &ElementResolver, timeouts: &Timeouts) -> Self {
        let conventions: &Conventions = resolver.conventions();
        Self {
            driver,
            state: ConfirmationState::Idle,
            confirm_labels: conventions.confirm_synonyms.clone(),
            cancel_label: conventions.cancel_label.clone(),
            edit_label: conventions.edit_label.clone(),
            container: resolver.container().cloned(),
            dialog_timeout: timeouts.dialog(),
            in_app_timeout: timeouts.in_app_confirm(),
            poll_interval: timeouts.poll_interval(),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> ConfirmationState {
        self.state
    }

    /// Enter [`ConfirmationState::AwaitingConfirmation`]; call right before
    /// triggering the destructive action
    pub fn arm(&mut self) -> ProbeResult<()> {
        if self.state != ConfirmationState::Idle {
            return Err(self.illegal("arm"));
        }
        self.state = ConfirmationState::AwaitingConfirmation;
        Ok(())
    }

    /// Accept whichever confirmation appears first
    pub async fn confirm(&mut self) -> ProbeResult<ConfirmationOutcome> {
        self.expect_awaiting("confirm")?;
        let started = Instant::now();
        let winner = self.race(true, &self.confirm_labels).await?;
        self.state = winner.map_or(
            ConfirmationState::Declined(DeclineReason::Timeout),
            ConfirmationState::Accepted,
        );
        Ok(self.finish(started))
    }

    /// Decline whichever of the in-app Cancel control or a native dialog
    /// appears first
    pub async fn cancel(&mut self) -> ProbeResult<ConfirmationOutcome> {
        self.expect_awaiting("cancel")?;
        let started = Instant::now();
        let labels = [self.cancel_label.clone()];
        let winner = self.race(false, &labels).await?;
        self.state = ConfirmationState::Declined(
            winner.map_or(DeclineReason::Timeout, DeclineReason::Cancelled),
        );
        Ok(self.finish(started))
    }

    fn finish(&self, started: Instant) -> ConfirmationOutcome {
        let outcome = ConfirmationOutcome {
            state: self.state,
            elapsed: started.elapsed(),
        };
        tracing::info!(state = ?outcome.state, elapsed_ms = outcome.elapsed.as_millis() as u64, "confirmation resolved");
        outcome
    }

    fn expect_awaiting(&self, transition: &str) -> ProbeResult<()> {
        if self.state == ConfirmationState::AwaitingConfirmation {
            Ok(())
        } else {
            Err(self.illegal(transition))
        }
    }

    fn illegal(&self, transition: &str) -> ProbeError {
        ProbeError::invalid_state(format!("cannot {transition} a confirmation in state {:?}", self.state))
    }

    /// Run both watchers; the first to answer wins
    async fn race(&self, accept: bool, labels: &[String]) -> ProbeResult<Option<Mechanism>> {
        let native = self.answer_native(accept);
        let in_app = self.answer_in_app(labels);
        tokio::pin!(native, in_app);
        let (mut native_done, mut in_app_done) = (false, false);
        loop {
            tokio::select! {
                answered = &mut native, if !native_done => {
                    native_done = true;
                    if answered? {
                        return Ok(Some(Mechanism::NativeDialog));
                    }
                }
                answered = &mut in_app, if !in_app_done => {
                    in_app_done = true;
                    if answered? {
                        return Ok(Some(Mechanism::InAppControl));
                    }
                }
                else => return Ok(None),
            }
        }
    }

    async fn answer_native(&self, accept: bool) -> ProbeResult<bool> {
        match self.driver.wait_for_dialog(self.dialog_timeout).await? {
            Some(dialog) => {
                tracing::debug!(kind = %dialog.dialog_type(), message = dialog.message(), accept, "answering native dialog");
                self.driver.handle_dialog(accept).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn answer_in_app(&self, labels: &[String]) -> ProbeResult<bool> {
        let config = RetryConfig::new(self.in_app_timeout).with_poll_interval(self.poll_interval);
        for attempt in 1..=CLICK_ATTEMPTS {
            let driver = self.driver;
            let found = retry(config, move || async move {
                let snapshot = driver.snapshot().await?;
                Ok(self.find_control(&snapshot, labels).map_or_else(
                    || CheckOutcome::Fail("no in-app confirmation control".to_string()),
                    CheckOutcome::Pass,
                ))
            })
            .await?;
            let Retried::Passed(found) = found else {
                return Ok(false);
            };
            tracing::debug!(element = %found.value, attempt, "answering in-app confirmation");
            match self.driver.click(&found.value).await {
                Ok(()) => return Ok(true),
                Err(e) if e.is_stale() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    /// A visible button labelled with one of `labels` that is not part of a
    /// task card
    fn find_control(&self, snapshot: &DomSnapshot, labels: &[String]) -> Option<ElementTarget> {
        labels.iter().find_map(|label| {
            Selector::role_exact("button", label)
                .find_in(&snapshot.root)
                .ok()?
                .into_iter()
                .filter(|path| snapshot.is_visible(path))
                .find(|path| !self.inside_card(snapshot, path))
                .and_then(|path| {
                    let tag = snapshot.get(&path)?.tag.clone();
                    Some(ElementTarget::new(path, tag, format!("confirmation control {label:?}")))
                })
        })
    }

    /// With a container shape, any ancestor of that shape; without one, any
    /// ancestor below the body that also holds an Edit button. Ancestors
    /// above the nearest enclosing dialog are not considered.
    fn inside_card(&self, snapshot: &DomSnapshot, path: &NodePath) -> bool {
        let root = &snapshot.root;
        let ancestor = |depth: usize| NodePath(path.0[..depth].to_vec());
        let floor = (1..path.depth())
            .rev()
            .find(|&depth| root.get(&ancestor(depth)).is_some_and(is_dialog))
            .map_or(1, |depth| depth + 1);
        (floor..path.depth()).any(|depth| {
            let at = ancestor(depth);
            match &self.container {
                Some(css) => css.matches(root, &at),
                None => root.get(&at).is_some_and(|node| {
                    Selector::role_exact("button", &self.edit_label)
                        .find_in(node)
                        .is_ok_and(|found| !found.is_empty())
                }),
            }
        })
    }
}

fn is_dialog(node: &DomNode) -> bool {
    node.tag == "dialog" || node.attr("role") == Some("dialog") || node.attr("aria-modal") == Some("true")
}
