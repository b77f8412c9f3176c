//! An in-memory task manager served through [`PageDriver`].
//!
//! Renders the same DOM conventions as the real application (login and
//! sign-up forms, a collapsible navbar, task cards with Mark Complete / Edit /
//! Delete, an edit modal) from its state on every driver call. The live DOM is
//! the latest render, so a target resolved before the page re-rendered goes
//! stale exactly like it would in a browser.
//!
//! Knobs for exercising the harness:
//!
//! - [`ConfirmationMode`]: how deletions are confirmed
//! - render lag: task list changes show up only after N further driver calls
//! - a confirm label other than `OK`, a fixed "today" for past-date checks and
//!   an unsafe renderer that turns `<script>` in descriptions into elements
//! - an in-app confirm modal rendered inside `main` next to the task list
//! - browser-like native dialogs: the dialog event reaches the driver late,
//!   and snapshots hang while a dialog is open

use crate::dialog::{Dialog, DialogHistory};
use crate::dom::{DomNode, DomSnapshot, FieldValidity};
use crate::driver::{ElementTarget, PageDriver};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Prompt of the delete confirmation, native or in-app
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this task?";
/// Platform message for an empty required field
pub const REQUIRED_MESSAGE: &str = "Please fill out this field.";
/// Platform message for a pattern mismatch
pub const PATTERN_MESSAGE: &str = "Please match the requested format.";
/// Welcome heading of the landing page
pub const WELCOME_TEXT: &str = "QA Challenge: Simple Task Manager - E2E Black-Box";

const PRIORITIES: [&str; 3] = ["Low", "Medium", "High"];
const DEFAULT_PRIORITY: &str = "Medium";
const DIALOG_POLL: Duration = Duration::from_millis(10);
const SNAPSHOT_BLOCK: Duration = Duration::from_secs(5);
const CARD_CLASSES: &str = "p-6 rounded-lg shadow-md bg-white";

/// How the application confirms a deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmationMode {
    /// `window.confirm()`
    #[default]
    NativeDialog,
    /// An in-page modal with a confirm and a Cancel button
    InAppModal,
    /// Delete immediately
    None,
}

/// A task as stored by the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeTask {
    /// Server-assigned id, also rendered as `data-task-id`
    pub id: u64,
    /// Title as submitted
    pub title: String,
    /// Free text, possibly empty
    pub description: String,
    /// `YYYY-MM-DD` or empty
    pub due_date: String,
    /// `Low`, `Medium` or `High`
    pub priority: String,
    /// Completion flag
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct User {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Home,
    Login,
    SignUp,
    Dashboard,
    NotFound,
}

impl Route {
    fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "" => Self::Home,
            "/auth/login" => Self::Login,
            "/auth/signup" => Self::SignUp,
            "/dashboard" => Self::Dashboard,
            _ => Self::NotFound,
        }
    }

    const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/auth/login",
            Self::SignUp => "/auth/signup",
            Self::Dashboard => "/dashboard",
            Self::NotFound => "/404",
        }
    }
}

#[derive(Debug, Clone)]
struct Flash {
    text: String,
    error: bool,
}

#[derive(Debug, Clone)]
struct FakeOptions {
    base_url: String,
    confirmation: ConfirmationMode,
    render_lag: usize,
    confirm_label: String,
    today: Option<String>,
    raw_html: bool,
    dialog_event_delay: Duration,
    blocking_dialogs: bool,
    nested_confirm_modal: bool,
}

#[derive(Debug)]
struct AppState {
    route: Route,
    users: Vec<User>,
    session: Option<String>,
    tasks: Vec<FakeTask>,
    rendered: Vec<FakeTask>,
    pending_frames: usize,
    next_id: u64,
    values: BTreeMap<String, String>,
    flash: Option<Flash>,
    nav_open: bool,
    editing: Option<u64>,
    pending_delete: Option<u64>,
    dialog: Option<Dialog>,
    /// When the open dialog's event reaches the driver
    dialog_reported_at: Option<Instant>,
    actions: Vec<String>,
}

/// What a click landed on, after bubbling to the nearest button or link
#[derive(Debug, Clone, PartialEq, Eq)]
enum Control {
    Link(String),
    NavToggle,
    Logout,
    Submit(String),
    CardButton(u64, String),
    CloseEdit,
    CancelEdit,
    ConfirmAccept,
    ConfirmCancel,
    Inert,
}

/// In-memory task manager application
#[derive(Debug)]
pub struct FakeTaskApp {
    options: FakeOptions,
    state: Mutex<AppState>,
    dialogs: DialogHistory,
}

impl Default for FakeTaskApp {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}

impl FakeTaskApp {
    /// A fresh application at `base_url` with the admin account seeded
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            options: FakeOptions {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                confirmation: ConfirmationMode::default(),
                render_lag: 0,
                confirm_label: "OK".to_string(),
                today: None,
                raw_html: false,
                dialog_event_delay: Duration::ZERO,
                blocking_dialogs: false,
                nested_confirm_modal: false,
            },
            state: Mutex::new(AppState {
                route: Route::Home,
                users: vec![User {
                    username: "admin".to_string(),
                    email: "admin@cc.com".to_string(),
                    password: "admin123".to_string(),
                }],
                session: None,
                tasks: Vec::new(),
                rendered: Vec::new(),
                pending_frames: 0,
                next_id: 1,
                values: BTreeMap::new(),
                flash: None,
                nav_open: false,
                editing: None,
                pending_delete: None,
                dialog: None,
                dialog_reported_at: None,
                actions: Vec::new(),
            }),
            dialogs: DialogHistory::new(),
        }
    }

    /// Set the confirmation mechanism
    #[must_use]
    pub fn with_confirmation(mut self, mode: ConfirmationMode) -> Self {
        self.options.confirmation = mode;
        self
    }

    /// Delay task list updates by `calls` driver calls
    #[must_use]
    pub fn with_render_lag(mut self, calls: usize) -> Self {
        self.options.render_lag = calls;
        self
    }

    /// Label of the in-app confirm button
    #[must_use]
    pub fn with_confirm_label(mut self, label: impl Into<String>) -> Self {
        self.options.confirm_label = label.into();
        self
    }

    /// Reject due dates before `today` (`YYYY-MM-DD`)
    #[must_use]
    pub fn with_today(mut self, today: impl Into<String>) -> Self {
        self.options.today = Some(today.into());
        self
    }

    /// Render `<script>` tags in descriptions as elements instead of text
    #[must_use]
    pub fn with_raw_html(mut self, raw: bool) -> Self {
        self.options.raw_html = raw;
        self
    }

    /// Report native dialogs to the driver only `delay` after they open
    #[must_use]
    pub fn with_dialog_event_delay(mut self, delay: Duration) -> Self {
        self.options.dialog_event_delay = delay;
        self
    }

    /// Make snapshots wait while a native dialog is open, failing after a
    /// few seconds, like a page evaluation does in a browser
    #[must_use]
    pub fn with_blocking_dialogs(mut self) -> Self {
        self.options.blocking_dialogs = true;
        self
    }

    /// Render the in-app confirm modal inside `main` instead of at body level
    #[must_use]
    pub fn with_nested_confirm_modal(mut self) -> Self {
        self.options.nested_confirm_modal = true;
        self
    }

    /// Base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.options.base_url
    }

    /// Register an account
    pub fn add_user(&self, username: &str, email: &str, password: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.users.push(User {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            });
        }
    }

    /// Store a task directly, bypassing the UI and render lag
    pub fn seed_task(&self, title: &str, description: &str, due_date: &str, priority: &str) -> u64 {
        let Ok(mut state) = self.state.lock() else {
            return 0;
        };
        let id = state.next_id;
        state.next_id += 1;
        state.tasks.push(FakeTask {
            id,
            title: title.to_string(),
            description: description.to_string(),
            due_date: due_date.to_string(),
            priority: priority.to_string(),
            completed: false,
        });
        state.rendered = state.tasks.clone();
        id
    }

    /// Stored tasks
    #[must_use]
    pub fn tasks(&self) -> Vec<FakeTask> {
        self.state.lock().map(|s| s.tasks.clone()).unwrap_or_default()
    }

    /// Email of the signed-in user
    #[must_use]
    pub fn session(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.session.clone())
    }

    /// Path of the current route
    #[must_use]
    pub fn path(&self) -> String {
        self.state
            .lock()
            .map(|s| s.route.path().to_string())
            .unwrap_or_default()
    }

    /// Native dialogs handled so far
    #[must_use]
    pub fn dialogs(&self) -> DialogHistory {
        self.dialogs.clone()
    }

    /// Controls activated so far, in order
    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        self.state.lock().map(|s| s.actions.clone()).unwrap_or_default()
    }

    fn lock(&self) -> ProbeResult<MutexGuard<'_, AppState>> {
        self.state
            .lock()
            .map_err(|_| ProbeError::page("application state poisoned"))
    }

    /// Tick the render clock and return the live DOM
    fn live(&self, state: &mut AppState) -> DomNode {
        state.tick();
        state.render(&self.options)
    }

    async fn wait_until_unblocked(&self) -> ProbeResult<()> {
        let deadline = Instant::now() + SNAPSHOT_BLOCK;
        loop {
            let blocked = self.lock()?.dialog.is_some();
            if !blocked {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ProbeError::page("evaluation blocked by an open dialog"));
            }
            tokio::time::sleep(DIALOG_POLL).await;
        }
    }

    fn path_of(&self, url: &str) -> ProbeResult<String> {
        let rest = url
            .strip_prefix(&self.options.base_url)
            .ok_or_else(|| ProbeError::Navigation {
                url: url.to_string(),
                message: "host unreachable".to_string(),
            })?;
        let path = rest.split(['?', '#']).next().unwrap_or_default();
        Ok(if path.is_empty() { "/".to_string() } else { path.to_string() })
    }
}

#[async_trait]
impl PageDriver for FakeTaskApp {
    async fn navigate(&self, url: &str) -> ProbeResult<()> {
        let path = self.path_of(url)?;
        let mut state = self.lock()?;
        state.go(Route::from_path(&path));
        state.flash = None;
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        let state = self.lock()?;
        Ok(format!("{}{}", self.options.base_url, state.route.path()))
    }

    async fn reload(&self) -> ProbeResult<()> {
        let mut state = self.lock()?;
        let route = state.route;
        state.go(route);
        state.flash = None;
        state.rendered = state.tasks.clone();
        state.pending_frames = 0;
        Ok(())
    }

    async fn snapshot(&self) -> ProbeResult<DomSnapshot> {
        if self.options.blocking_dialogs {
            self.wait_until_unblocked().await?;
        }
        let mut state = self.lock()?;
        let root = self.live(&mut state);
        Ok(DomSnapshot::new(
            format!("{}{}", self.options.base_url, state.route.path()),
            root,
        ))
    }

    async fn click(&self, target: &ElementTarget) -> ProbeResult<()> {
        let mut state = self.lock()?;
        state.ensure_unblocked()?;
        let live = self.live(&mut state);
        let _ = target.locate(&live)?;
        let control = live
            .chain(&target.path)
            .map_or(Control::Inert, |chain| identify(&chain));
        state.actions.push(format!("click {control:?}"));
        state.apply(control, &self.options);
        Ok(())
    }

    async fn fill(&self, target: &ElementTarget, value: &str) -> ProbeResult<()> {
        let mut state = self.lock()?;
        state.ensure_unblocked()?;
        let live = self.live(&mut state);
        let node = target.locate(&live)?;
        if !matches!(node.tag.as_str(), "input" | "textarea") {
            return Err(ProbeError::page(format!("{target} is not fillable")));
        }
        let id = node
            .id
            .clone()
            .ok_or_else(|| ProbeError::page(format!("{target} has no id")))?;
        state.actions.push(format!("fill {id}"));
        let _ = state.values.insert(id, value.to_string());
        Ok(())
    }

    async fn clear(&self, target: &ElementTarget) -> ProbeResult<()> {
        self.fill(target, "").await
    }

    async fn select_option(&self, target: &ElementTarget, value: &str) -> ProbeResult<()> {
        let mut state = self.lock()?;
        state.ensure_unblocked()?;
        let live = self.live(&mut state);
        let node = target.locate(&live)?;
        if node.tag != "select" {
            return Err(ProbeError::page(format!("{target} is not a <select>")));
        }
        let option = node
            .children
            .iter()
            .find(|o| o.attr("value") == Some(value) || o.own_text() == value)
            .and_then(|o| o.attr("value"))
            .ok_or_else(|| ProbeError::page(format!("no option {value:?} in {target}")))?
            .to_string();
        let id = node.id.clone().unwrap_or_default();
        state.actions.push(format!("select {id}={option}"));
        let _ = state.values.insert(id, option);
        Ok(())
    }

    async fn wait_for_dialog(&self, timeout: Duration) -> ProbeResult<Option<Dialog>> {
        let deadline = Instant::now() + timeout;
        loop {
            let open = self.lock()?.reported_dialog().cloned();
            if open.is_some() {
                return Ok(open);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(DIALOG_POLL.min(deadline - now)).await;
        }
    }

    async fn handle_dialog(&self, accept: bool) -> ProbeResult<()> {
        let mut state = self.lock()?;
        let dialog = state
            .dialog
            .take()
            .ok_or_else(|| ProbeError::invalid_state("no dialog is open"))?;
        self.dialogs.record(dialog.resolved(accept));
        state.actions.push(format!("dialog accept={accept}"));
        let pending = state.pending_delete.take();
        if accept {
            if let Some(id) = pending {
                state.delete(id, &self.options);
            }
        }
        Ok(())
    }
}

/// Bubble from the clicked node to the nearest button or link and name it
fn identify(chain: &[&DomNode]) -> Control {
    let Some(index) = chain.iter().rposition(|n| matches!(n.tag.as_str(), "button" | "a")) else {
        return Control::Inert;
    };
    let node = chain[index];
    let ancestors = &chain[..index];
    let text = node.text_content();

    if node.tag == "a" {
        return node
            .attr("href")
            .map_or(Control::Inert, |href| Control::Link(href.to_string()));
    }
    if node.attr("data-collapse-toggle").is_some() {
        return Control::NavToggle;
    }
    if ancestors.iter().any(|a| a.id.as_deref() == Some("confirm-modal")) {
        return if text == "Cancel" {
            Control::ConfirmCancel
        } else {
            Control::ConfirmAccept
        };
    }
    if text == "Close modal" || node.attr("aria-label") == Some("Close modal") {
        return Control::CloseEdit;
    }
    let form = ancestors.iter().rev().find(|a| a.tag == "form").and_then(|f| f.id.clone());
    if let Some(form) = form {
        if node.attr("type") == Some("submit") {
            return Control::Submit(form);
        }
        if form == "edit-form" && text == "Cancel" {
            return Control::CancelEdit;
        }
    }
    if let Some(id) = ancestors
        .iter()
        .rev()
        .find_map(|a| a.attr("data-task-id"))
        .and_then(|id| id.parse().ok())
    {
        return Control::CardButton(id, text);
    }
    if text == "Logout" {
        return Control::Logout;
    }
    Control::Inert
}

fn email_validity(value: &str) -> FieldValidity {
    if value.is_empty() {
        FieldValidity::missing(REQUIRED_MESSAGE)
    } else if !value.contains('@') {
        FieldValidity {
            valid: false,
            value_missing: false,
            message: format!(
                "Please include an '@' in the email address. '{value}' is missing an '@'."
            ),
        }
    } else {
        FieldValidity::valid()
    }
}

fn required_validity(value: &str) -> FieldValidity {
    if value.is_empty() {
        FieldValidity::missing(REQUIRED_MESSAGE)
    } else {
        FieldValidity::valid()
    }
}

/// `required` plus `pattern="\S(.*\S)?"`
fn title_validity(value: &str) -> FieldValidity {
    if value.is_empty() {
        FieldValidity::missing(REQUIRED_MESSAGE)
    } else if value.trim().is_empty() {
        FieldValidity {
            valid: false,
            value_missing: false,
            message: PATTERN_MESSAGE.to_string(),
        }
    } else {
        FieldValidity::valid()
    }
}

impl AppState {
    fn value(&self, id: &str) -> String {
        self.values.get(id).cloned().unwrap_or_default()
    }

    fn reported_dialog(&self) -> Option<&Dialog> {
        match self.dialog_reported_at {
            Some(at) if Instant::now() < at => None,
            _ => self.dialog.as_ref(),
        }
    }

    fn ensure_unblocked(&self) -> ProbeResult<()> {
        if self.dialog.is_some() {
            return Err(ProbeError::page("page is blocked by an open dialog"));
        }
        Ok(())
    }

    fn tick(&mut self) {
        if self.pending_frames > 0 {
            self.pending_frames -= 1;
            if self.pending_frames == 0 {
                self.rendered = self.tasks.clone();
            }
        }
    }

    fn tasks_changed(&mut self, options: &FakeOptions) {
        self.pending_frames = options.render_lag;
        if options.render_lag == 0 {
            self.rendered = self.tasks.clone();
        }
    }

    fn go(&mut self, route: Route) {
        self.route = if route == Route::Dashboard && self.session.is_none() {
            Route::Login
        } else {
            route
        };
        self.values.clear();
        self.nav_open = false;
        self.editing = None;
        self.pending_delete = None;
        self.dialog = None;
        self.dialog_reported_at = None;
    }

    fn apply(&mut self, control: Control, options: &FakeOptions) {
        match control {
            Control::Link(href) => {
                self.go(Route::from_path(&href));
                self.flash = None;
            }
            Control::NavToggle => self.nav_open = !self.nav_open,
            Control::Logout => {
                self.session = None;
                self.go(Route::Home);
                self.flash = None;
            }
            Control::Submit(form) => self.submit(&form, options),
            Control::CardButton(id, label) => match label.as_str() {
                "Mark Complete" | "Mark Incomplete" => {
                    if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                        task.completed = !task.completed;
                    }
                    self.tasks_changed(options);
                }
                "Edit" => self.open_edit(id),
                "Delete" => self.request_delete(id, options),
                _ => {}
            },
            Control::CloseEdit | Control::CancelEdit => self.close_edit(),
            Control::ConfirmAccept => {
                if let Some(id) = self.pending_delete.take() {
                    self.delete(id, options);
                }
            }
            Control::ConfirmCancel => self.pending_delete = None,
            Control::Inert => {}
        }
    }

    fn request_delete(&mut self, id: u64, options: &FakeOptions) {
        match options.confirmation {
            ConfirmationMode::None => self.delete(id, options),
            ConfirmationMode::InAppModal => self.pending_delete = Some(id),
            ConfirmationMode::NativeDialog => {
                self.pending_delete = Some(id);
                self.dialog = Some(Dialog::confirm(DELETE_PROMPT));
                self.dialog_reported_at = Some(Instant::now() + options.dialog_event_delay);
            }
        }
    }

    fn delete(&mut self, id: u64, options: &FakeOptions) {
        self.tasks.retain(|t| t.id != id);
        self.tasks_changed(options);
    }

    fn open_edit(&mut self, id: u64) {
        let Some(task) = self.tasks.iter().find(|t| t.id == id).cloned() else {
            return;
        };
        self.editing = Some(id);
        let _ = self.values.insert("edit-title".to_string(), task.title);
        let _ = self.values.insert("edit-description".to_string(), task.description);
        let _ = self.values.insert("edit-dueDate".to_string(), task.due_date);
        let _ = self.values.insert("edit-priority".to_string(), task.priority);
    }

    fn close_edit(&mut self) {
        self.editing = None;
        self.values.retain(|id, _| !id.starts_with("edit-"));
    }

    fn submit(&mut self, form: &str, options: &FakeOptions) {
        match form {
            "login-form" => self.submit_login(),
            "signup-form" => self.submit_signup(),
            "task-form" => self.submit_task(options),
            "edit-form" => self.submit_edit(options),
            _ => {}
        }
    }

    fn blocked(&mut self, form: &str) {
        self.actions.push(format!("{form} blocked by validation"));
    }

    fn submit_login(&mut self) {
        let email = self.value("email");
        let password = self.value("password");
        if !email_validity(&email).valid || !required_validity(&password).valid {
            return self.blocked("login-form");
        }
        if self
            .users
            .iter()
            .any(|u| u.email == email && u.password == password)
        {
            self.session = Some(email);
            self.go(Route::Dashboard);
            self.flash = None;
        } else {
            self.flash = Some(Flash {
                text: "Invalid email or password.".to_string(),
                error: true,
            });
        }
    }

    fn submit_signup(&mut self) {
        let username = self.value("username");
        let email = self.value("email");
        let password = self.value("password");
        if !required_validity(&username).valid
            || !email_validity(&email).valid
            || !required_validity(&password).valid
        {
            return self.blocked("signup-form");
        }
        let error = if password.chars().count() < 6 {
            Some("Password must be at least 6 characters.")
        } else if self.users.iter().any(|u| u.username == username) {
            Some("Username already taken")
        } else if self.users.iter().any(|u| u.email == email) {
            Some("Email already registered")
        } else {
            None
        };
        if let Some(text) = error {
            self.flash = Some(Flash {
                text: text.to_string(),
                error: true,
            });
            return;
        }
        self.users.push(User {
            username,
            email,
            password,
        });
        self.go(Route::Login);
        self.flash = Some(Flash {
            text: "User registered successfully".to_string(),
            error: false,
        });
    }

    fn past_due(due_date: &str, options: &FakeOptions) -> bool {
        options
            .today
            .as_deref()
            .is_some_and(|today| !due_date.is_empty() && due_date < today)
    }

    fn submit_task(&mut self, options: &FakeOptions) {
        let title = self.value("title");
        if !title_validity(&title).valid {
            return self.blocked("task-form");
        }
        let due_date = self.value("dueDate");
        if Self::past_due(&due_date, options) {
            self.flash = Some(Flash {
                text: "Due date cannot be in the past.".to_string(),
                error: true,
            });
            return;
        }
        let priority = self
            .values
            .get("priority")
            .cloned()
            .unwrap_or_else(|| DEFAULT_PRIORITY.to_string());
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.insert(
            0,
            FakeTask {
                id,
                title: title.trim().to_string(),
                description: self.value("description"),
                due_date,
                priority,
                completed: false,
            },
        );
        for field in ["title", "description", "dueDate", "priority"] {
            let _ = self.values.remove(field);
        }
        self.flash = None;
        self.tasks_changed(options);
    }

    fn submit_edit(&mut self, options: &FakeOptions) {
        let Some(id) = self.editing else {
            return;
        };
        let title = self.value("edit-title");
        if !title_validity(&title).valid {
            return self.blocked("edit-form");
        }
        let description = self.value("edit-description");
        let due_date = self.value("edit-dueDate");
        let priority = self.value("edit-priority");
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.title = title.trim().to_string();
            task.description = description;
            task.due_date = due_date;
            if !priority.is_empty() {
                task.priority = priority;
            }
        }
        self.close_edit();
        self.tasks_changed(options);
    }

    // ---- rendering ---------------------------------------------------------

    fn render(&self, options: &FakeOptions) -> DomNode {
        let mut body = DomNode::element("body").with_child(self.render_nav());
        let mut main = match self.route {
            Route::Home => Self::render_home(),
            Route::Login => self.render_login(),
            Route::SignUp => self.render_signup(),
            Route::Dashboard => self.render_dashboard(options),
            Route::NotFound => DomNode::element("main")
                .with_child(DomNode::element("h1").with_text("404 - Page not found")),
        };
        let confirm = (self.route == Route::Dashboard
            && options.confirmation == ConfirmationMode::InAppModal
            && self.pending_delete.is_some())
        .then(|| Self::render_confirm_modal(options));
        let (nested, top) = if options.nested_confirm_modal { (confirm, None) } else { (None, confirm) };
        if let Some(modal) = nested {
            main = main.with_child(modal);
        }
        body = body.with_child(main);
        if self.route == Route::Dashboard {
            if let Some(modal) = self.render_edit_modal() {
                body = body.with_child(modal);
            }
        }
        if let Some(modal) = top {
            body = body.with_child(modal);
        }
        body
    }

    fn render_nav(&self) -> DomNode {
        let entry = if self.session.is_some() {
            DomNode::element("button")
                .with_attr("type", "button")
                .with_class("block py-2 px-3")
                .with_text("Logout")
        } else {
            DomNode::element("a")
                .with_attr("href", "/auth/login")
                .with_text("Login")
        };
        let mut menu = DomNode::element("div")
            .with_id("navbar-default")
            .with_class("w-full md:block md:w-auto")
            .with_child(DomNode::element("ul").with_child(DomNode::element("li").with_child(entry)));
        if !self.nav_open {
            menu = menu.with_class("hidden").hidden();
        }
        DomNode::element("nav").with_child(
            DomNode::element("div")
                .with_child(DomNode::element("a").with_attr("href", "/").with_text("Task Manager"))
                .with_child(
                    DomNode::element("button")
                        .with_attr("type", "button")
                        .with_attr("data-collapse-toggle", "navbar-default")
                        .with_attr("aria-controls", "navbar-default")
                        .with_attr("aria-expanded", if self.nav_open { "true" } else { "false" })
                        .with_child(DomNode::element("span").with_class("sr-only").with_text("Open main menu")),
                )
                .with_child(menu),
        )
    }

    fn render_flash(&self) -> Option<DomNode> {
        self.flash.as_ref().map(|flash| {
            let class = if flash.error { "text-red-600" } else { "text-green-600" };
            DomNode::element("p")
                .with_attr("role", "alert")
                .with_class(class)
                .with_text(flash.text.clone())
        })
    }

    fn render_home() -> DomNode {
        DomNode::element("main")
            .with_child(DomNode::element("h1").with_text(WELCOME_TEXT))
            .with_child(DomNode::element("p").with_text("Organise your work, one task at a time."))
            .with_child(DomNode::element("a").with_attr("href", "/auth/login").with_text("Get started"))
    }

    fn input(&self, id: &str, input_type: &str, validity: fn(&str) -> FieldValidity) -> DomNode {
        let value = self.value(id);
        DomNode::element("input")
            .with_id(id)
            .with_attr("name", id)
            .with_attr("type", input_type)
            .with_attr("required", "")
            .with_validity(validity(&value))
            .with_value(value)
    }

    fn labelled(label: &str, control: DomNode) -> DomNode {
        DomNode::element("div")
            .with_child(DomNode::element("label").with_text(label))
            .with_child(control)
    }

    fn render_login(&self) -> DomNode {
        let mut main = DomNode::element("main")
            .with_child(DomNode::element("h1").with_text("Sign in to your account"));
        if let Some(flash) = self.render_flash() {
            main = main.with_child(flash);
        }
        main.with_child(
            DomNode::element("form")
                .with_id("login-form")
                .with_child(Self::labelled("Your email", self.input("email", "email", email_validity)))
                .with_child(Self::labelled(
                    "Password",
                    self.input("password", "password", required_validity),
                ))
                .with_child(
                    DomNode::element("button")
                        .with_attr("type", "submit")
                        .with_text("Sign in"),
                )
                .with_child(
                    DomNode::element("p")
                        .with_text("Don't have an account yet?")
                        .with_child(
                            DomNode::element("a")
                                .with_attr("href", "/auth/signup")
                                .with_text("sign up"),
                        ),
                ),
        )
    }

    fn render_signup(&self) -> DomNode {
        let mut main =
            DomNode::element("main").with_child(DomNode::element("h1").with_text("Create an account"));
        if let Some(flash) = self.render_flash() {
            main = main.with_child(flash);
        }
        main.with_child(
            DomNode::element("form")
                .with_id("signup-form")
                .with_child(Self::labelled(
                    "Username",
                    self.input("username", "text", required_validity),
                ))
                .with_child(Self::labelled("Your email", self.input("email", "email", email_validity)))
                .with_child(Self::labelled(
                    "Password",
                    self.input("password", "password", required_validity),
                ))
                .with_child(
                    DomNode::element("button")
                        .with_attr("type", "submit")
                        .with_text("Create account"),
                ),
        )
    }

    fn title_input(&self, id: &str) -> DomNode {
        self.input(id, "text", title_validity)
            .with_attr("pattern", "\\S(.*\\S)?")
    }

    fn textarea(&self, id: &str) -> DomNode {
        DomNode::element("textarea")
            .with_id(id)
            .with_attr("name", id)
            .with_validity(FieldValidity::valid())
            .with_value(self.value(id))
    }

    fn date_input(&self, id: &str) -> DomNode {
        DomNode::element("input")
            .with_id(id)
            .with_attr("name", id)
            .with_attr("type", "date")
            .with_validity(FieldValidity::valid())
            .with_value(self.value(id))
    }

    fn priority_select(&self, id: &str) -> DomNode {
        let current = self
            .values
            .get(id)
            .cloned()
            .unwrap_or_else(|| DEFAULT_PRIORITY.to_string());
        DomNode::element("select")
            .with_id(id)
            .with_attr("name", id)
            .with_value(current)
            .with_children(
                PRIORITIES.map(|p| DomNode::element("option").with_attr("value", p).with_text(p)),
            )
    }

    fn render_dashboard(&self, options: &FakeOptions) -> DomNode {
        let mut main = DomNode::element("main").with_child(DomNode::element("h1").with_text("My Tasks"));
        if let Some(flash) = self.render_flash() {
            main = main.with_child(flash);
        }
        let form = DomNode::element("form")
            .with_id("task-form")
            .with_child(Self::labelled("Title", self.title_input("title")))
            .with_child(Self::labelled("Description", self.textarea("description")))
            .with_child(Self::labelled("Due Date", self.date_input("dueDate")))
            .with_child(Self::labelled("Priority", self.priority_select("priority")))
            .with_child(
                DomNode::element("button")
                    .with_attr("type", "submit")
                    .with_text("Add Task"),
            );
        let list = DomNode::element("div")
            .with_id("task-list")
            .with_children(self.rendered.iter().map(|t| Self::render_card(t, options)));
        main.with_child(form).with_child(list)
    }

    fn render_card(task: &FakeTask, options: &FakeOptions) -> DomNode {
        let mut heading = DomNode::element("h3")
            .with_class("text-lg font-semibold")
            .with_text(task.title.clone());
        if task.completed {
            heading = heading.with_class("line-through");
        }
        let mut card = DomNode::element("div")
            .with_class(CARD_CLASSES)
            .with_attr("data-task-id", task.id.to_string())
            .with_child(heading);
        if !task.description.is_empty() {
            card = card.with_child(Self::render_description(&task.description, options));
        }
        if !task.due_date.is_empty() {
            card = card.with_child(DomNode::element("p").with_text(format!("Due: {}", task.due_date)));
        }
        let toggle = if task.completed {
            "Mark Incomplete"
        } else {
            "Mark Complete"
        };
        card.with_child(
            DomNode::element("span")
                .with_class("priority")
                .with_text(task.priority.clone()),
        )
        .with_child(
            DomNode::element("span")
                .with_class("status")
                .with_text(if task.completed { "Completed" } else { "Pending" }),
        )
        .with_child(
            DomNode::element("div")
                .with_child(DomNode::element("button").with_text(toggle))
                .with_child(DomNode::element("button").with_text("Edit"))
                .with_child(DomNode::element("button").with_text("Delete")),
        )
    }

    fn render_description(description: &str, options: &FakeOptions) -> DomNode {
        let paragraph = DomNode::element("p").with_class("description");
        if !options.raw_html {
            return paragraph.with_text(description);
        }
        match (description.find("<script>"), description.find("</script>")) {
            (Some(open), Some(close)) if open < close => paragraph
                .with_text(&description[..open])
                .with_child(DomNode::element("script").with_text(&description[open + 8..close])),
            _ => paragraph.with_text(description),
        }
    }

    fn render_edit_modal(&self) -> Option<DomNode> {
        self.editing?;
        Some(
            DomNode::element("div")
                .with_id("edit-modal")
                .with_class("fixed inset-0")
                .with_child(
                    DomNode::element("div")
                        .with_child(DomNode::element("h3").with_text("Edit Task"))
                        .with_child(
                            DomNode::element("button").with_attr("type", "button").with_child(
                                DomNode::element("span").with_class("sr-only").with_text("Close modal"),
                            ),
                        ),
                )
                .with_child(
                    DomNode::element("form")
                        .with_id("edit-form")
                        .with_child(Self::labelled("Title", self.title_input("edit-title")))
                        .with_child(Self::labelled("Description", self.textarea("edit-description")))
                        .with_child(Self::labelled("Due Date", self.date_input("edit-dueDate")))
                        .with_child(Self::labelled("Priority", self.priority_select("edit-priority")))
                        .with_child(
                            DomNode::element("button")
                                .with_attr("type", "submit")
                                .with_text("Save Changes"),
                        )
                        .with_child(
                            DomNode::element("button")
                                .with_attr("type", "button")
                                .with_text("Cancel"),
                        ),
                ),
        )
    }

    fn render_confirm_modal(options: &FakeOptions) -> DomNode {
        DomNode::element("div")
            .with_id("confirm-modal")
            .with_attr("role", "dialog")
            .with_child(DomNode::element("p").with_text(DELETE_PROMPT))
            .with_child(
                DomNode::element("div")
                    .with_child(DomNode::element("button").with_text(options.confirm_label.clone()))
                    .with_child(DomNode::element("button").with_text("Cancel")),
            )
    }
}
