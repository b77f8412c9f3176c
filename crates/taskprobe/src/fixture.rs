//! Scenario test data.
//!
//! Accounts, sample tasks and expected message texts live in YAML so suites
//! can be pointed at another deployment without code changes. The built-in
//! set is compiled in from `fixtures/default.yaml`.
//!
//! Due dates written as `today+N` (or `today-N`) are resolved to
//! `YYYY-MM-DD` when the data set is loaded.

use crate::page_object::TaskFields;
use crate::result::{ProbeError, ProbeResult};
use crate::title::next_disambiguator;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_FIXTURES: &str = include_str!("../fixtures/default.yaml");

/// Placeholder replaced with a fresh number in templated accounts
pub const UNIQUE_PLACEHOLDER: &str = "{n}";

const TODAY: &str = "today";

/// Resolve a `today+N` / `today-N` date against `today`; anything else is
/// returned unchanged
pub fn resolve_date(raw: &str, today: NaiveDate) -> ProbeResult<String> {
    let Some(offset) = raw.trim().strip_prefix(TODAY) else {
        return Ok(raw.to_string());
    };
    let days: i64 = match offset.trim() {
        "" => 0,
        o => o
            .strip_prefix('+')
            .unwrap_or(o)
            .trim()
            .parse()
            .map_err(|_| ProbeError::config(format!("bad relative date {raw:?}")))?,
    };
    today
        .checked_add_signed(Duration::days(days))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| ProbeError::config(format!("relative date {raw:?} out of range")))
}

/// Login credentials, optionally with a username for sign-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username, only needed for sign-up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Copy with every `{n}` replaced by `n`
    #[must_use]
    pub fn instantiate(&self, n: u64) -> Self {
        let fill = |s: &str| s.replace(UNIQUE_PLACEHOLDER, &n.to_string());
        Self {
            username: self.username.as_deref().map(fill),
            email: fill(&self.email),
            password: fill(&self.password),
        }
    }
}

/// Accounts used by the suites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Users {
    /// Pre-existing account
    pub admin: Credentials,
    /// Template for a fresh registration
    pub new_user: Credentials,
    /// Credentials the application must reject
    pub invalid: Credentials,
}

/// One sample task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskData {
    /// Title (base title before disambiguation)
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Due date, `YYYY-MM-DD`
    #[serde(default)]
    pub due_date: String,
    /// Priority option label
    #[serde(default)]
    pub priority: String,
}

impl TaskData {
    /// The optional fields as creation input; empty values are left out
    #[must_use]
    pub fn fields(&self) -> TaskFields {
        let mut fields = TaskFields::default();
        if !self.description.is_empty() {
            fields = fields.with_description(self.description.clone());
        }
        if !self.due_date.is_empty() {
            fields = fields.with_due_date(self.due_date.clone());
        }
        if !self.priority.is_empty() {
            fields = fields.with_priority(self.priority.clone());
        }
        fields
    }
}

/// Sample tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tasks {
    /// A fully populated task
    pub valid: TaskData,
    /// Starting point for edit scenarios
    pub for_edit: TaskData,
    /// Values the edit scenarios write
    pub updated: TaskData,
    /// Task whose title is empty
    pub empty_title: TaskData,
    /// Task due in the past
    pub past_due_date: TaskData,
    /// Task with markup and punctuation in its text
    pub special_chars: TaskData,
    /// Length of the generated long title
    pub long_title_length: usize,
    /// Priority options the creation form offers
    pub priorities: Vec<String>,
}

impl Tasks {
    fn resolve_dates(&mut self, today: NaiveDate) -> ProbeResult<()> {
        for task in [
            &mut self.valid,
            &mut self.for_edit,
            &mut self.updated,
            &mut self.empty_title,
            &mut self.past_due_date,
            &mut self.special_chars,
        ] {
            task.due_date = resolve_date(&task.due_date, today)?;
        }
        Ok(())
    }

    /// A title of `long_title_length` repeated `A`s
    #[must_use]
    pub fn long_title(&self) -> String {
        "A".repeat(self.long_title_length)
    }
}

/// Message texts the application shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    /// Failed login banner
    pub invalid_login: String,
    /// Empty required field
    pub required_field: String,
    /// Password length rule
    pub password_too_short: String,
    /// Start of the missing-`@` email message
    pub invalid_email_format: String,
    /// End of the missing-`@` email message
    pub invalid_email_missing: String,
    /// Successful registration
    pub user_registered: String,
    /// Duplicate username
    pub username_exists: String,
}

/// Everything a suite needs besides the harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestData {
    /// Accounts
    pub users: Users,
    /// Sample tasks
    pub tasks: Tasks,
    /// Expected messages
    pub messages: Messages,
}

impl TestData {
    /// The compiled-in data set
    ///
    /// # Errors
    ///
    /// Only if the bundled YAML is malformed.
    pub fn builtin() -> ProbeResult<Self> {
        Self::from_yaml(DEFAULT_FIXTURES)
    }

    /// The compiled-in data set with relative dates resolved against `today`
    pub fn builtin_on(today: NaiveDate) -> ProbeResult<Self> {
        Self::from_yaml_on(DEFAULT_FIXTURES, today)
    }

    /// Parse a data set from YAML, resolving relative dates against the
    /// current UTC date
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Yaml`] on malformed input.
    pub fn from_yaml(source: &str) -> ProbeResult<Self> {
        Self::from_yaml_on(source, Utc::now().date_naive())
    }

    /// Parse a data set from YAML, resolving relative dates against `today`
    pub fn from_yaml_on(source: &str, today: NaiveDate) -> ProbeResult<Self> {
        let mut data: Self = serde_yaml_ng::from_str(source)?;
        data.tasks.resolve_dates(today)?;
        Ok(data)
    }

    /// Load a data set from a YAML file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml(&source).map_err(|e| ProbeError::config(format!("{}: {e}", path.display())))
    }

    /// A never-before-used account built from the `new_user` template
    #[must_use]
    pub fn fresh_user(&self) -> Credentials {
        self.users.new_user.instantiate(next_disambiguator())
    }
}
