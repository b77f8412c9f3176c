//! Harness configuration.
//!
//! Layered the usual way: built-in defaults, then an optional YAML file, then
//! environment overrides. Callers (the CLI) apply their own flags last and
//! finish with [`HarnessConfig::validate`].

use crate::browser::BrowserConfig;
use crate::locator::LocatorOptions;
use crate::result::{ProbeError, ProbeResult};
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`HarnessConfig::base_url`]
pub const ENV_BASE_URL: &str = "TASKPROBE_BASE_URL";
/// Environment variable overriding [`BrowserConfig::headless`]
pub const ENV_HEADLESS: &str = "TASKPROBE_HEADLESS";
/// Environment variable overriding [`BrowserConfig::chromium_path`]
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";

/// Application paths, relative to the base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppPaths {
    /// Login page
    pub login: String,
    /// Task dashboard
    pub dashboard: String,
}

impl Default for AppPaths {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            dashboard: "/dashboard".to_string(),
        }
    }
}

/// Timeouts, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Budget for an action's element lookups
    pub action_ms: u64,
    /// Budget for page loads
    pub navigation_ms: u64,
    /// Budget for verification polls
    pub expect_ms: u64,
    /// Interval between polls
    pub poll_interval_ms: u64,
    /// How long to wait for a native dialog after a destructive click
    pub dialog_ms: u64,
    /// How long to poll for an in-app confirm control
    pub in_app_confirm_ms: u64,
    /// Pause after each bulk-cleanup deletion
    pub cleanup_settle_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: 30_000,
            navigation_ms: 30_000,
            expect_ms: 10_000,
            poll_interval_ms: 100,
            dialog_ms: 1_000,
            in_app_confirm_ms: 1_500,
            cleanup_settle_ms: 500,
        }
    }
}

impl Timeouts {
    /// Shrink every budget, for suites run against an in-memory app
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            action_ms: 2_000,
            navigation_ms: 2_000,
            expect_ms: 2_000,
            poll_interval_ms: 10,
            dialog_ms: 100,
            in_app_confirm_ms: 150,
            cleanup_settle_ms: 0,
        }
    }

    /// Poll interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Native dialog wait
    #[must_use]
    pub const fn dialog(&self) -> Duration {
        Duration::from_millis(self.dialog_ms)
    }

    /// In-app confirm poll budget
    #[must_use]
    pub const fn in_app_confirm(&self) -> Duration {
        Duration::from_millis(self.in_app_confirm_ms)
    }

    /// Bulk cleanup settle pause
    #[must_use]
    pub const fn cleanup_settle(&self) -> Duration {
        Duration::from_millis(self.cleanup_settle_ms)
    }

    /// Retry budget for verification polls
    #[must_use]
    pub const fn expect_retry(&self) -> RetryConfig {
        RetryConfig::new(Duration::from_millis(self.expect_ms)).with_poll_interval(self.poll_interval())
    }

    /// Locator options for action lookups
    #[must_use]
    pub fn action_locator(&self) -> LocatorOptions {
        LocatorOptions::default()
            .with_timeout(Duration::from_millis(self.action_ms))
            .with_poll_interval(self.poll_interval())
    }

    /// Locator options for verification lookups
    #[must_use]
    pub fn expect_locator(&self) -> LocatorOptions {
        LocatorOptions::default()
            .with_timeout(Duration::from_millis(self.expect_ms))
            .with_poll_interval(self.poll_interval())
    }
}

/// Text the harness looks for on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Prefix length of the second title tier
    pub exact_prefix_chars: usize,
    /// Prefix length of the containment tier
    pub containment_prefix_chars: usize,
    /// Heading of the public landing page
    pub welcome_text: String,
    /// Heading of the dashboard
    pub dashboard_heading: String,
    /// Heading of the login page
    pub login_heading: String,
    /// Locale variants of the platform's "required" message
    pub validation_variants: Vec<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            exact_prefix_chars: 100,
            containment_prefix_chars: 50,
            welcome_text: "QA Challenge: Simple Task Manager - E2E Black-Box".to_string(),
            dashboard_heading: "My Tasks".to_string(),
            login_heading: "Sign in to your account".to_string(),
            validation_variants: vec![
                "Please fill out this field.".to_string(),
                "Please fill in this field.".to_string(),
                "This field is required.".to_string(),
                "Veuillez remplir ce champ.".to_string(),
            ],
        }
    }
}

/// CSS selectors of the application's form controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelectors {
    /// Sign-up username
    pub username: String,
    /// Email on the login and sign-up forms
    pub email: String,
    /// Password on the login and sign-up forms
    pub password: String,
    /// Create form title
    pub title: String,
    /// Create form description
    pub description: String,
    /// Create form due date
    pub due_date: String,
    /// Create form priority select
    pub priority: String,
    /// Edit modal title
    pub edit_title: String,
    /// Edit modal description
    pub edit_description: String,
    /// Edit modal due date
    pub edit_due_date: String,
    /// Edit modal priority select
    pub edit_priority: String,
    /// Form submit button
    pub submit: String,
}

impl Default for FieldSelectors {
    fn default() -> Self {
        Self {
            username: "input#username".to_string(),
            email: "input#email".to_string(),
            password: "input#password".to_string(),
            title: "input#title".to_string(),
            description: "textarea#description".to_string(),
            due_date: "input#dueDate".to_string(),
            priority: "select#priority".to_string(),
            edit_title: "input#edit-title".to_string(),
            edit_description: "textarea#edit-description".to_string(),
            edit_due_date: "input#edit-dueDate".to_string(),
            edit_priority: "select#edit-priority".to_string(),
            submit: "button[type=\"submit\"]".to_string(),
        }
    }
}

/// DOM conventions of the application under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conventions {
    /// Card container shape; `None` means "innermost element holding the
    /// title and the delete affordance"
    pub card_container: Option<String>,
    /// Card delete button
    pub delete_label: String,
    /// Card edit button
    pub edit_label: String,
    /// Toggle label on an open task
    pub mark_complete_label: String,
    /// Toggle label on a completed task
    pub mark_incomplete_label: String,
    /// Form control selectors
    pub fields: FieldSelectors,
    /// Labels accepted as an in-app confirm control
    pub confirm_synonyms: Vec<String>,
    /// Dismisses the edit modal and in-app confirmations
    pub cancel_label: String,
    /// Edit modal submit
    pub save_label: String,
    /// Accessible name of the edit modal close icon
    pub close_modal_label: String,
    /// Heading shown while the edit modal is open
    pub edit_modal_heading: String,
    /// Collapsed navigation toggle
    pub nav_toggle: String,
    /// Navigation logout entry
    pub logout_label: String,
    /// Link from the login page to sign-up
    pub sign_up_text: String,
    /// Regex over the class list marking a completed card
    pub completed_marker: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            card_container: Some("div.p-6.rounded-lg.shadow-md".to_string()),
            delete_label: "Delete".to_string(),
            edit_label: "Edit".to_string(),
            mark_complete_label: "Mark Complete".to_string(),
            mark_incomplete_label: "Mark Incomplete".to_string(),
            fields: FieldSelectors::default(),
            confirm_synonyms: vec!["OK".to_string(), "Confirm".to_string(), "Delete".to_string()],
            cancel_label: "Cancel".to_string(),
            save_label: "Save Changes".to_string(),
            close_modal_label: "Close modal".to_string(),
            edit_modal_heading: "Edit Task".to_string(),
            nav_toggle: "button[data-collapse-toggle=\"navbar-default\"]".to_string(),
            logout_label: "Logout".to_string(),
            sign_up_text: "sign up".to_string(),
            completed_marker: "completed|line-through".to_string(),
        }
    }
}

/// Complete harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Address of the application under test
    pub base_url: String,
    /// Route paths
    pub paths: AppPaths,
    /// Wait budgets
    pub timeouts: Timeouts,
    /// Expected user-facing texts
    pub text: TextConfig,
    /// DOM conventions
    pub conventions: Conventions,
    /// Browser launch settings
    pub browser: BrowserConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            paths: AppPaths::default(),
            timeouts: Timeouts::default(),
            text: TextConfig::default(),
            conventions: Conventions::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Defaults with a different base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the timeouts
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the card container selector
    #[must_use]
    pub fn with_card_container(mut self, selector: Option<String>) -> Self {
        self.conventions.card_container = selector;
        self
    }

    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml(source: &str) -> ProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(source)?)
    }

    /// Load a YAML file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> ProbeResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a lookup function
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ProbeResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            self.browser.headless = parse_bool(&raw).ok_or_else(|| {
                ProbeError::config(format!("{ENV_HEADLESS} must be a boolean, got {raw:?}"))
            })?;
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH) {
            self.browser.chromium_path = Some(path);
        }
        Ok(())
    }

    /// Reject configurations no run could succeed with
    pub fn validate(&self) -> ProbeResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ProbeError::config("base_url must not be empty"));
        }
        let t = &self.timeouts;
        let budgets = [
            ("action_ms", t.action_ms),
            ("navigation_ms", t.navigation_ms),
            ("expect_ms", t.expect_ms),
            ("poll_interval_ms", t.poll_interval_ms),
            ("dialog_ms", t.dialog_ms),
            ("in_app_confirm_ms", t.in_app_confirm_ms),
        ];
        if let Some((name, _)) = budgets.iter().find(|(_, ms)| *ms == 0) {
            return Err(ProbeError::config(format!("timeouts.{name} must be positive")));
        }
        if t.poll_interval_ms > t.expect_ms {
            return Err(ProbeError::config(format!(
                "timeouts.poll_interval_ms ({}) exceeds timeouts.expect_ms ({})",
                t.poll_interval_ms, t.expect_ms
            )));
        }
        if self.text.containment_prefix_chars == 0 || self.text.exact_prefix_chars == 0 {
            return Err(ProbeError::config("text prefix lengths must be positive"));
        }
        if self.conventions.confirm_synonyms.is_empty() {
            return Err(ProbeError::config("conventions.confirm_synonyms must not be empty"));
        }
        regex::Regex::new(&self.conventions.completed_marker).map_err(|e| {
            ProbeError::config(format!("conventions.completed_marker: {e}"))
        })?;
        Ok(())
    }

    /// Absolute URL of an application path
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    mod default_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = HarnessConfig::default();
            assert_eq!(config.paths.login, "/auth/login");
            assert_eq!(config.timeouts.expect_ms, 10_000);
            assert_eq!(config.timeouts.dialog_ms, 1_000);
            assert_eq!(config.timeouts.in_app_confirm_ms, 1_500);
            assert_eq!(config.text.exact_prefix_chars, 100);
            assert_eq!(config.text.containment_prefix_chars, 50);
            assert_eq!(config.browser.viewport_width, 1920);
            assert_eq!(
                config.conventions.card_container.as_deref(),
                Some("div.p-6.rounded-lg.shadow-md")
            );
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_fast_timeouts_validate() {
            let config = HarnessConfig::default().with_timeouts(Timeouts::fast());
            assert!(config.validate().is_ok());
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let config = HarnessConfig::from_yaml(
                "base_url: https://tasks.example.com\ntimeouts:\n  expect_ms: 5000\n",
            )
            .unwrap();
            assert_eq!(config.base_url, "https://tasks.example.com");
            assert_eq!(config.timeouts.expect_ms, 5_000);
            assert_eq!(config.timeouts.poll_interval_ms, 100);
            assert_eq!(config.conventions.delete_label, "Delete");
        }

        #[test]
        fn test_null_container_means_innermost() {
            let config = HarnessConfig::from_yaml("conventions:\n  card_container: null\n").unwrap();
            assert!(config.conventions.card_container.is_none());
        }

        #[test]
        fn test_load_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "base_url: http://127.0.0.1:8080").unwrap();
            let config = HarnessConfig::load(file.path()).unwrap();
            assert_eq!(config.base_url, "http://127.0.0.1:8080");
        }

        #[test]
        fn test_yaml_roundtrip() {
            let config = HarnessConfig::new("http://app");
            let back = HarnessConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
            assert_eq!(back, config);
        }

        #[test]
        fn test_malformed_yaml() {
            let err = HarnessConfig::from_yaml("timeouts: [1, 2").unwrap_err();
            assert!(matches!(err, ProbeError::Yaml(_)));
        }
    }

    mod override_tests {
        use super::*;

        fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
            let map: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            move |key| map.get(key).cloned()
        }

        #[test]
        fn test_env_overrides() {
            let mut config = HarnessConfig::default();
            config
                .apply_overrides(env(&[
                    (ENV_BASE_URL, "http://staging"),
                    (ENV_HEADLESS, "false"),
                    (ENV_CHROMIUM_PATH, "/usr/bin/chromium"),
                ]))
                .unwrap();
            assert_eq!(config.base_url, "http://staging");
            assert!(!config.browser.headless);
            assert_eq!(config.browser.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        }

        #[test]
        fn test_bad_headless_value() {
            let mut config = HarnessConfig::default();
            let err = config.apply_overrides(env(&[(ENV_HEADLESS, "maybe")])).unwrap_err();
            assert!(err.to_string().contains(ENV_HEADLESS));
        }
    }

    mod validate_tests {
        use super::*;

        #[test]
        fn test_rejects_empty_base_url() {
            let config = HarnessConfig::new("  ");
            assert!(config.validate().is_err());
        }

        #[test]
        fn test_rejects_zero_timeout() {
            let mut config = HarnessConfig::default();
            config.timeouts.dialog_ms = 0;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("dialog_ms"));
        }

        #[test]
        fn test_rejects_poll_longer_than_expect() {
            let mut config = HarnessConfig::default();
            config.timeouts.poll_interval_ms = 20_000;
            assert!(config.validate().is_err());
        }

        #[test]
        fn test_rejects_bad_marker_regex() {
            let mut config = HarnessConfig::default();
            config.conventions.completed_marker = "(".to_string();
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_url_for() {
        let config = HarnessConfig::new("http://localhost:3000/");
        assert_eq!(config.url_for("/dashboard"), "http://localhost:3000/dashboard");
        assert_eq!(config.url_for("auth/login"), "http://localhost:3000/auth/login");
        assert_eq!(config.url_for("https://other/x"), "https://other/x");
    }
}
