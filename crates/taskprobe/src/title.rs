//! Task references and title disambiguation.
//!
//! Every task the harness creates gets a trailing numeric suffix (a
//! millisecond timestamp, bumped to stay strictly increasing in-process) so
//! that titles never collide across runs. All later lookups use the full
//! suffixed title.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Last suffix handed out in this process
static LAST_SUFFIX: AtomicU64 = AtomicU64::new(0);

/// Next disambiguator: `max(now_ms, last + 1)`, strictly increasing
/// process-wide even when called from several threads in the same
/// millisecond.
#[must_use]
pub fn next_disambiguator() -> u64 {
    let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
    let mut last = LAST_SUFFIX.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_SUFFIX.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

/// Append a fresh disambiguator to `base`
#[must_use]
pub fn disambiguate(base: &str) -> String {
    format!("{} {}", base.trim(), next_disambiguator())
}

/// Trailing whitespace-separated token of `title` if it is purely numeric
#[must_use]
pub fn numeric_suffix(title: &str) -> Option<&str> {
    title
        .split_whitespace()
        .last()
        .filter(|token| token.chars().all(|c| c.is_ascii_digit()))
}

/// Carry the disambiguator of `current` over to `new_base`.
///
/// If the last token of `current` is not purely numeric, `new_base` is used
/// as-is.
#[must_use]
pub fn carry_disambiguator(current: &str, new_base: &str) -> String {
    match numeric_suffix(current) {
        Some(suffix) => format!("{} {suffix}", new_base.trim()),
        None => new_base.trim().to_string(),
    }
}

/// Reference to one task by its full disambiguated title
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskRef(String);

impl TaskRef {
    /// Mint a reference for a new task titled `base`
    #[must_use]
    pub fn mint(base: &str) -> Self {
        Self(disambiguate(base))
    }

    /// Wrap an already-disambiguated title
    #[must_use]
    pub fn from_title(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    /// Full title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.0
    }

    /// The disambiguator, when the title carries one
    #[must_use]
    pub fn disambiguator(&self) -> Option<&str> {
        numeric_suffix(&self.0)
    }

    /// Point this reference at a new title
    pub fn reassign(&mut self, title: impl Into<String>) {
        self.0 = title.into();
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
