//! Native browser dialogs (alert, confirm, prompt, beforeunload).

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Type of browser dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogType {
    /// Alert dialog (OK button only)
    Alert,
    /// Confirm dialog (OK/Cancel buttons)
    Confirm,
    /// Prompt dialog (text input + OK/Cancel)
    Prompt,
    /// Before unload dialog (Leave/Stay buttons)
    BeforeUnload,
}

impl DialogType {
    /// Parse the CDP `Page.DialogType` name
    #[must_use]
    pub fn from_cdp(name: &str) -> Self {
        match name {
            "alert" => Self::Alert,
            "prompt" => Self::Prompt,
            "beforeunload" => Self::BeforeUnload,
            _ => Self::Confirm,
        }
    }
}

impl std::fmt::Display for DialogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Confirm => write!(f, "confirm"),
            Self::Prompt => write!(f, "prompt"),
            Self::BeforeUnload => write!(f, "beforeunload"),
        }
    }
}

/// Action taken on a dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogAction {
    /// Dialog was accepted (OK/Yes/Leave)
    Accept,
    /// Dialog was dismissed (Cancel/No/Stay)
    Dismiss,
    /// Dialog is pending (not yet handled)
    Pending,
}

/// A native dialog the page opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    dialog_type: DialogType,
    message: String,
    action: DialogAction,
}

impl Dialog {
    /// Create a pending dialog
    #[must_use]
    pub fn new(dialog_type: DialogType, message: impl Into<String>) -> Self {
        Self {
            dialog_type,
            message: message.into(),
            action: DialogAction::Pending,
        }
    }

    /// Create a confirm dialog
    #[must_use]
    pub fn confirm(message: impl Into<String>) -> Self {
        Self::new(DialogType::Confirm, message)
    }

    /// Get dialog type
    #[must_use]
    pub const fn dialog_type(&self) -> DialogType {
        self.dialog_type
    }

    /// Get dialog message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get action taken
    #[must_use]
    pub const fn action(&self) -> DialogAction {
        self.action
    }

    /// Check if dialog was handled
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        !matches!(self.action, DialogAction::Pending)
    }

    /// Record the decision taken on this dialog
    #[must_use]
    pub fn resolved(mut self, accept: bool) -> Self {
        self.action = if accept {
            DialogAction::Accept
        } else {
            DialogAction::Dismiss
        };
        self
    }
}

/// Shared log of dialogs a driver has handled
#[derive(Debug, Clone, Default)]
pub struct DialogHistory {
    dialogs: Arc<Mutex<Vec<Dialog>>>,
}

impl DialogHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dialog
    pub fn record(&self, dialog: Dialog) {
        if let Ok(mut dialogs) = self.dialogs.lock() {
            dialogs.push(dialog);
        }
    }

    /// All recorded dialogs, oldest first
    #[must_use]
    pub fn all(&self) -> Vec<Dialog> {
        self.dialogs.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// Most recent dialog
    #[must_use]
    pub fn last(&self) -> Option<Dialog> {
        self.dialogs.lock().ok().and_then(|d| d.last().cloned())
    }

    /// Number of recorded dialogs
    #[must_use]
    pub fn count(&self) -> usize {
        self.dialogs.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// Forget all recorded dialogs
    pub fn clear(&self) {
        if let Ok(mut dialogs) = self.dialogs.lock() {
            dialogs.clear();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_type_from_cdp() {
        assert_eq!(DialogType::from_cdp("alert"), DialogType::Alert);
        assert_eq!(DialogType::from_cdp("confirm"), DialogType::Confirm);
        assert_eq!(DialogType::from_cdp("prompt"), DialogType::Prompt);
        assert_eq!(DialogType::from_cdp("beforeunload"), DialogType::BeforeUnload);
        assert_eq!(DialogType::Confirm.to_string(), "confirm");
    }

    #[test]
    fn test_dialog_resolution() {
        let dialog = Dialog::confirm("Are you sure you want to delete this task?");
        assert!(!dialog.is_handled());
        assert_eq!(dialog.action(), DialogAction::Pending);

        let accepted = dialog.clone().resolved(true);
        assert_eq!(accepted.action(), DialogAction::Accept);
        assert!(accepted.is_handled());

        let dismissed = dialog.resolved(false);
        assert_eq!(dismissed.action(), DialogAction::Dismiss);
    }

    #[test]
    fn test_history_is_shared_between_clones() {
        let history = DialogHistory::new();
        let writer = history.clone();
        writer.record(Dialog::confirm("one").resolved(true));
        writer.record(Dialog::confirm("two").resolved(false));

        assert_eq!(history.count(), 2);
        assert_eq!(history.last().unwrap().message(), "two");
        assert_eq!(history.all()[0].action(), DialogAction::Accept);

        history.clear();
        assert_eq!(writer.count(), 0);
        assert!(writer.last().is_none());
    }
}
