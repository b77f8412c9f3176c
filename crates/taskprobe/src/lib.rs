//! Taskprobe: browser-driven acceptance harness for title-addressed task
//! managers.
//!
//! Scenarios talk to the application through four layers:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │   scenario                                                       │
//! │     │                                                            │
//! │     ├──► TaskManagerPage ──► ElementResolver ──► PageDriver ──► DOM
//! │     │         │                                                  │
//! │     │         └──► ConfirmationProtocol (native dialog | in-app) │
//! │     │                                                            │
//! │     └──► Verifier ─────────► ElementResolver (read-only)         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every query runs against a fresh [`DomSnapshot`]; handles are never
//! cached across re-renders. Tasks are addressed by [`TaskRef`], a title
//! carrying a process-unique numeric suffix.
//!
//! The [`mock::FakeTaskApp`] driver runs the whole stack in-process. With the
//! `browser` feature, [`ChromiumDriver`] drives a real Chromium over CDP.

#![warn(missing_docs)]

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod browser;
pub mod config;
pub mod confirm;
mod css;
pub mod dialog;
pub mod dom;
pub mod driver;
pub mod fixture;
pub mod locator;
pub mod mock;
#[allow(clippy::missing_errors_doc)]
pub mod page_object;
pub mod resolver;
pub mod result;
pub mod retry;
pub mod title;
#[allow(clippy::missing_errors_doc)]
pub mod verify;

#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use browser::BrowserConfig;
pub use config::{AppPaths, Conventions, FieldSelectors, HarnessConfig, TextConfig, Timeouts};
pub use confirm::{
    ConfirmationOutcome, ConfirmationProtocol, ConfirmationState, DeclineReason, Mechanism,
};
pub use css::CssSelector;
pub use dialog::{Dialog, DialogAction, DialogHistory, DialogType};
pub use dom::{DomNode, DomSnapshot, FieldValidity, NodePath};
pub use driver::{ElementTarget, PageDriver, SharedDriver};
pub use fixture::{Credentials, TaskData, TestData};
pub use locator::{Locator, LocatorOptions, Selector};
pub use page_object::{
    AppPage, CleanupReport, PageObject, TaskEdits, TaskFields, TaskManagerPage,
};
pub use resolver::{CardAction, CardQuery, ElementKind, ElementResolver, Field, TitleTier};
pub use result::{ProbeError, ProbeResult};
pub use retry::{retry, CheckOutcome, Retried, RetryConfig};
pub use title::{disambiguate, next_disambiguator, TaskRef};
pub use verify::Verifier;

/// Everything a scenario usually needs
pub mod prelude {
    pub use super::config::HarnessConfig;
    pub use super::confirm::{ConfirmationOutcome, Mechanism};
    pub use super::driver::{PageDriver, SharedDriver};
    pub use super::fixture::TestData;
    pub use super::page_object::{CleanupReport, TaskEdits, TaskFields, TaskManagerPage};
    pub use super::resolver::{CardAction, Field};
    pub use super::result::{ProbeError, ProbeResult};
    pub use super::title::TaskRef;
    pub use super::verify::Verifier;
}
