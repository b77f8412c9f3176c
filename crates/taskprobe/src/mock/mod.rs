//! In-process page drivers for exercising the harness without a browser.
//!
//! - [`StaticPage`] serves a fixed DOM tree; handy for resolver and locator tests
//! - [`FakeTaskApp`] is a complete in-memory task manager with configurable
//!   confirmation style, render lag and validation behavior

mod app;
mod static_page;

pub use app::{
    ConfirmationMode, FakeTask, FakeTaskApp, DELETE_PROMPT, PATTERN_MESSAGE, REQUIRED_MESSAGE,
    WELCOME_TEXT,
};
pub use static_page::StaticPage;
