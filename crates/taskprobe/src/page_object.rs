//! Action Executor: user-intent operations against the task manager.
//!
//! Every operation composes fresh resolver lookups with driver primitives;
//! nothing resolved before an action is reused after it. An input the
//! operation needs that never resolves is reported as
//! [`ProbeError::PreconditionMissing`]. Operations that create or change a
//! task return only once the change is visible.

use crate::config::HarnessConfig;
use crate::confirm::{ConfirmationOutcome, ConfirmationProtocol};
use crate::driver::SharedDriver;
use crate::locator::{Locator, Selector};
use crate::resolver::{CardAction, ElementResolver, Field};
use crate::result::{ProbeError, ProbeResult};
use crate::retry::{retry, CheckOutcome, Retried};
use crate::title::{carry_disambiguator, TaskRef};
use std::fmt;

/// A page of the application, recognised by URL and heading
pub trait PageObject {
    /// URL fragment that identifies this page
    fn url_pattern(&self) -> &str;

    /// Heading shown once the page has rendered
    fn heading(&self) -> Option<&str> {
        None
    }

    /// Name for logs and failure messages
    fn page_name(&self) -> &str;

    /// Whether `url` belongs to this page
    fn matches_url(&self, url: &str) -> bool {
        let pattern = self.url_pattern();
        if pattern == "/" {
            let path = url.split("://").nth(1).map_or(url, |rest| {
                rest.find('/').map_or("/", |i| &rest[i..])
            });
            return path == "/" || path.is_empty();
        }
        url.contains(pattern)
    }
}

/// The application's pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPage {
    name: &'static str,
    url_pattern: String,
    heading: Option<String>,
}

impl AppPage {
    /// Public landing page
    #[must_use]
    pub fn home(config: &HarnessConfig) -> Self {
        Self {
            name: "home",
            url_pattern: "/".to_string(),
            heading: Some(config.text.welcome_text.clone()),
        }
    }

    /// Login form
    #[must_use]
    pub fn login(config: &HarnessConfig) -> Self {
        Self {
            name: "login",
            url_pattern: config.paths.login.clone(),
            heading: Some(config.text.login_heading.clone()),
        }
    }

    /// Task dashboard
    #[must_use]
    pub fn dashboard(config: &HarnessConfig) -> Self {
        Self {
            name: "dashboard",
            url_pattern: config.paths.dashboard.clone(),
            heading: Some(config.text.dashboard_heading.clone()),
        }
    }
}

impl PageObject for AppPage {
    fn url_pattern(&self) -> &str {
        &self.url_pattern
    }

    fn heading(&self) -> Option<&str> {
        self.heading.as_deref()
    }

    fn page_name(&self) -> &str {
        self.name
    }
}

/// Optional task attributes; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFields {
    /// Description text
    pub description: Option<String>,
    /// `YYYY-MM-DD`
    pub due_date: Option<String>,
    /// Priority option label
    pub priority: Option<String>,
}

impl TaskFields {
    #[must_use]
    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    /// Set the due date
    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    #[must_use]
    /// Set the priority
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }
}

/// Changes applied by [`TaskManagerPage::edit_task`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdits {
    /// New base title; the task's disambiguator is carried over
    pub title: Option<String>,
    /// Other attributes to change
    pub fields: TaskFields,
}

impl TaskEdits {
    #[must_use]
    /// Rename the task
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    /// Change other attributes
    pub fn with_fields(mut self, fields: TaskFields) -> Self {
        self.fields = fields;
        self
    }
}

/// What a best-effort bulk deletion achieved
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Deletions started
    pub attempted: usize,
    /// Deletions that went through
    pub deleted: usize,
    /// [`ProbeError::CleanupFailure`]s, one per target that resisted
    pub failures: Vec<ProbeError>,
}

impl CleanupReport {
    /// No failures recorded
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, target: &str, error: &ProbeError) {
        tracing::warn!(task = target, %error, "cleanup failed");
        self.failures.push(ProbeError::CleanupFailure {
            target: target.to_string(),
            message: error.to_string(),
        });
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} deleted, {} failure(s)",
            self.deleted,
            self.attempted,
            self.failures.len()
        )
    }
}

/// Executes user actions on the task manager
#[derive(Clone)]
pub struct TaskManagerPage {
    driver: SharedDriver,
    config: HarnessConfig,
    resolver: ElementResolver,
}

impl fmt::Debug for TaskManagerPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskManagerPage")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl TaskManagerPage {
    /// Executor over `driver`
    ///
    /// # Errors
    ///
    /// Fails when the configured card container selector does not parse.
    pub fn new(driver: SharedDriver, config: HarnessConfig) -> ProbeResult<Self> {
        let resolver = ElementResolver::from_config(&config)?;
        Ok(Self {
            driver,
            config,
            resolver,
        })
    }

    /// The driver
    #[must_use]
    pub fn driver(&self) -> &SharedDriver {
        &self.driver
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Resolver used for action lookups
    #[must_use]
    pub const fn resolver(&self) -> &ElementResolver {
        &self.resolver
    }

    // ---- navigation ------------------------------------------------------

    /// Open `path` relative to the base URL
    #[tracing::instrument(skip(self))]
    pub async fn goto(&self, path: &str) -> ProbeResult<()> {
        self.driver.navigate(&self.config.url_for(path)).await
    }

    /// Reload the current page
    #[tracing::instrument(skip(self))]
    pub async fn reload(&self) -> ProbeResult<()> {
        self.driver.reload().await
    }

    /// Current URL
    pub async fn current_url(&self) -> ProbeResult<String> {
        self.driver.current_url().await
    }

    // ---- authentication --------------------------------------------------

    /// Submit the login form. Whether it succeeded is for the caller to check.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ProbeResult<()> {
        self.goto(&self.config.paths.login).await?;
        self.fill_field(Field::Email, email).await?;
        self.fill_field(Field::Password, password).await?;
        self.submit().await?;
        tracing::info!(email, "login submitted");
        Ok(())
    }

    /// Follow the sign-up link from the login page
    #[tracing::instrument(skip(self))]
    pub async fn open_sign_up(&self) -> ProbeResult<()> {
        let link = Locator::from_selector(Selector::text(self.resolver.conventions().sign_up_text.clone()))
            .with_options(*self.resolver.options())
            .with_strict(false);
        self.act("open_sign_up", link.click(self.driver.as_ref())).await
    }

    /// Register an account through the sign-up form
    #[tracing::instrument(skip(self, password))]
    pub async fn sign_up(&self, username: &str, email: &str, password: &str) -> ProbeResult<()> {
        self.goto(&self.config.paths.login).await?;
        self.open_sign_up().await?;
        self.fill_field(Field::Username, username).await?;
        self.fill_field(Field::Email, email).await?;
        self.fill_field(Field::Password, password).await?;
        self.submit().await?;
        tracing::info!(username, email, "sign-up submitted");
        Ok(())
    }

    /// Open the collapsed navigation, then log out
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> ProbeResult<()> {
        let conventions = self.resolver.conventions();
        let toggle = self.resolver.css(&conventions.nav_toggle);
        self.act("logout", toggle.click(self.driver.as_ref())).await?;
        let logout = self.resolver.button(&conventions.logout_label);
        self.act("logout", logout.click(self.driver.as_ref())).await?;
        tracing::info!("logged out");
        Ok(())
    }

    // ---- form primitives -------------------------------------------------

    /// Type into a form control
    pub async fn fill_field(&self, field: Field, value: &str) -> ProbeResult<()> {
        self.act("fill_field", self.resolver.field(field).fill(self.driver.as_ref(), value))
            .await
    }

    /// Empty a form control
    pub async fn clear_field(&self, field: Field) -> ProbeResult<()> {
        self.act("clear_field", self.resolver.field(field).clear(self.driver.as_ref()))
            .await
    }

    /// Choose a priority in the creation form
    pub async fn select_priority(&self, priority: &str) -> ProbeResult<()> {
        self.act(
            "select_priority",
            self.resolver
                .field(Field::Priority)
                .select_option(self.driver.as_ref(), priority),
        )
        .await
    }

    /// Click the visible form's submit button
    pub async fn submit(&self) -> ProbeResult<()> {
        let submit = self.resolver.css(&self.resolver.conventions().fields.submit);
        self.act("submit", submit.click(self.driver.as_ref())).await
    }

    // ---- tasks -----------------------------------------------------------

    /// Create a task titled `base_title` plus a fresh disambiguator and wait
    /// for its card
    #[tracing::instrument(skip(self, fields))]
    pub async fn create_task(&self, base_title: &str, fields: &TaskFields) -> ProbeResult<TaskRef> {
        let task = TaskRef::mint(base_title);
        self.fill_field(Field::Title, task.title()).await?;
        self.fill_fields(fields, Field::Description, Field::DueDate, Field::Priority)
            .await?;
        self.submit().await?;
        self.resolver.card(&task).resolve(self.driver.as_ref()).await?;
        tracing::info!(task = %task, "task created");
        Ok(task)
    }

    /// Open the edit modal of `task`
    #[tracing::instrument(skip_all, fields(task = %task))]
    pub async fn open_edit(&self, task: &TaskRef) -> ProbeResult<()> {
        let edit = self.resolver.action_button(task, CardAction::Edit);
        self.act("open_edit", edit.click(self.driver.as_ref())).await?;
        self.wait_for_edit_modal(true).await
    }

    /// Edit `task`. A new title keeps the disambiguator minted at creation and
    /// `task` is repointed at it.
    #[tracing::instrument(skip_all, fields(task = %task))]
    pub async fn edit_task(&self, task: &mut TaskRef, edits: &TaskEdits) -> ProbeResult<()> {
        self.open_edit(task).await?;
        let title_input = self.resolver.field(Field::EditTitle);
        let current = self
            .act("edit_task", title_input.input_value(self.driver.as_ref()))
            .await?;
        let title = match &edits.title {
            Some(base) => carry_disambiguator(&current, base),
            None => current,
        };
        self.fill_field(Field::EditTitle, &title).await?;
        self.fill_fields(
            &edits.fields,
            Field::EditDescription,
            Field::EditDueDate,
            Field::EditPriority,
        )
        .await?;
        self.save_changes().await?;
        task.reassign(title);
        self.resolver.card(task).resolve(self.driver.as_ref()).await?;
        tracing::info!(task = %task, "task edited");
        Ok(())
    }

    /// Click "Save Changes", by accessible name or, failing that, by text
    pub async fn save_changes(&self) -> ProbeResult<()> {
        let label = &self.resolver.conventions().save_label;
        match self.resolver.button(label).click(self.driver.as_ref()).await {
            Err(ProbeError::ElementNotFound { .. }) => {
                let fallback = self.resolver.css(&format!("button:has-text({label:?})"));
                self.act("save_changes", fallback.click(self.driver.as_ref())).await
            }
            other => other.map_err(|e| e.into_precondition("save_changes")),
        }
    }

    /// Discard the edit modal with its Cancel button
    pub async fn cancel_edit(&self) -> ProbeResult<()> {
        let cancel = self.resolver.button(&self.resolver.conventions().cancel_label);
        self.act("cancel_edit", cancel.click(self.driver.as_ref())).await?;
        self.wait_for_edit_modal(false).await
    }

    /// Close the edit modal with its close control
    pub async fn close_edit_modal(&self) -> ProbeResult<()> {
        let close = self.resolver.button(&self.resolver.conventions().close_modal_label);
        self.act("close_edit_modal", close.click(self.driver.as_ref())).await?;
        self.wait_for_edit_modal(false).await
    }

    /// Click whichever of Mark Complete / Mark Incomplete the card shows
    #[tracing::instrument(skip_all, fields(task = %task))]
    pub async fn toggle_completion(&self, task: &TaskRef) -> ProbeResult<()> {
        let conventions = self.resolver.conventions();
        let toggle = self.resolver.card(task).locator(Selector::css(format!(
            "button:has-text({:?}), button:has-text({:?})",
            conventions.mark_complete_label, conventions.mark_incomplete_label
        )));
        self.act("toggle_completion", toggle.click(self.driver.as_ref())).await?;
        tracing::info!(task = %task, "completion toggled");
        Ok(())
    }

    /// Click the card's delete control without answering the confirmation
    #[tracing::instrument(skip_all, fields(task = %task))]
    pub async fn trigger_delete(&self, task: &TaskRef) -> ProbeResult<()> {
        let delete = self.resolver.action_button(task, CardAction::Delete);
        self.act("delete_task", delete.click(self.driver.as_ref())).await
    }

    /// Decline a confirmation opened by [`Self::trigger_delete`]
    pub async fn cancel_deletion(&self) -> ProbeResult<ConfirmationOutcome> {
        let mut protocol = self.confirmation();
        protocol.arm()?;
        protocol.cancel().await
    }

    /// Delete `task`, accepting whatever confirmation appears, and wait for
    /// the card to go away
    #[tracing::instrument(skip_all, fields(task = %task))]
    pub async fn delete_task(&self, task: TaskRef) -> ProbeResult<ConfirmationOutcome> {
        let mut protocol = self.confirmation();
        protocol.arm()?;
        self.trigger_delete(&task).await?;
        let outcome = protocol.confirm().await?;
        self.wait_until_gone(&task).await?;
        tracing::info!(task = %task, state = ?outcome.state, "task deleted");
        Ok(outcome)
    }

    /// Delete every listed task that still exists; failures are recorded,
    /// never raised
    #[tracing::instrument(skip_all, fields(count = tasks.len()))]
    pub async fn delete_many(&self, tasks: Vec<TaskRef>) -> CleanupReport {
        let mut report = CleanupReport::default();
        for task in tasks {
            let card = self.resolver.card(&task);
            match card.first_match(self.driver.as_ref()).await {
                Ok(None) => continue,
                Ok(Some(_)) => {}
                Err(e) => {
                    report.record_failure(task.title(), &e);
                    continue;
                }
            }
            report.attempted += 1;
            let title = task.title().to_string();
            match self.delete_task(task).await {
                Ok(_) => report.deleted += 1,
                Err(e) => report.record_failure(&title, &e),
            }
        }
        tracing::info!(%report, "bulk delete finished");
        report
    }

    /// Delete whatever tasks are on the dashboard, first delete control
    /// first, bounded by the number present at the start
    #[tracing::instrument(skip(self))]
    pub async fn delete_all_tasks(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        let controls = self.resolver.delete_controls();
        let initial = match controls.count(self.driver.as_ref()).await {
            Ok(n) => n,
            Err(e) => {
                report.record_failure("task list", &e);
                return report;
            }
        };
        for round in 0..initial {
            report.attempted += 1;
            match self.delete_first().await {
                Ok(true) => report.deleted += 1,
                Ok(false) => {
                    report.attempted -= 1;
                    break;
                }
                Err(e) => report.record_failure(&format!("delete control #{round}"), &e),
            }
            tokio::time::sleep(self.config.timeouts.cleanup_settle()).await;
        }
        tracing::info!(initial, %report, "cleanup finished");
        report
    }

    async fn delete_first(&self) -> ProbeResult<bool> {
        let Some(target) = self
            .resolver
            .delete_controls()
            .first_match(self.driver.as_ref())
            .await?
        else {
            return Ok(false);
        };
        let mut protocol = self.confirmation();
        protocol.arm()?;
        self.driver.click(&target).await?;
        protocol.confirm().await?;
        Ok(true)
    }

    // ---- helpers ---------------------------------------------------------

    /// A confirmation protocol over this page
    #[must_use]
    pub fn confirmation(&self) -> ConfirmationProtocol<'_> {
        ConfirmationProtocol::new(self.driver.as_ref(), &self.resolver, &self.config.timeouts)
    }

    async fn act<T>(
        &self,
        operation: &'static str,
        step: impl std::future::Future<Output = ProbeResult<T>>,
    ) -> ProbeResult<T> {
        step.await.map_err(|e| e.into_precondition(operation))
    }

    /// Fill the supplied, non-empty fields
    async fn fill_fields(
        &self,
        fields: &TaskFields,
        description: Field,
        due_date: Field,
        priority: Field,
    ) -> ProbeResult<()> {
        if let Some(value) = fields.description.as_deref().filter(|v| !v.is_empty()) {
            self.fill_field(description, value).await?;
        }
        if let Some(value) = fields.due_date.as_deref().filter(|v| !v.is_empty()) {
            self.fill_field(due_date, value).await?;
        }
        if let Some(value) = fields.priority.as_deref().filter(|v| !v.is_empty()) {
            let select = self.resolver.field(priority);
            self.act("select_priority", select.select_option(self.driver.as_ref(), value))
                .await?;
        }
        Ok(())
    }

    async fn wait_for_edit_modal(&self, open: bool) -> ProbeResult<()> {
        let heading = Locator::from_selector(Selector::text_exact(
            self.resolver.conventions().edit_modal_heading.clone(),
        ))
        .with_strict(false);
        self.wait_for("edit modal", &heading, open).await
    }

    async fn wait_until_gone(&self, task: &TaskRef) -> ProbeResult<()> {
        let card = self.resolver.card(task).with_strict(false);
        self.wait_for(task.title(), &card, false).await
    }

    async fn wait_for(&self, what: &str, locator: &Locator, present: bool) -> ProbeResult<()> {
        let driver = self.driver.as_ref();
        let outcome = retry(self.resolver.options().retry(), move || async move {
            let snapshot = driver.snapshot().await?;
            let found = !locator.matches(&snapshot)?.is_empty();
            Ok(if found == present {
                CheckOutcome::Pass(())
            } else {
                CheckOutcome::Fail(format!("still {}", if present { "absent" } else { "present" }))
            })
        })
        .await?;
        match outcome {
            Retried::Passed(_) => Ok(()),
            Retried::Exhausted(e) => Err(ProbeError::AssertionFailed {
                check: if present { "appears" } else { "disappears" },
                target: what.to_string(),
                elapsed_ms: e.elapsed_ms(),
                attempts: e.attempts,
                message: e.message,
            }),
        }
    }
}
