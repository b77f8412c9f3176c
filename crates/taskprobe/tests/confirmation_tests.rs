//! Deletion under each confirmation mechanism

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{logged_in, session_over, ALL_MODES};
use std::time::Duration;
use taskprobe::mock::{ConfirmationMode, FakeTaskApp};
use taskprobe::prelude::*;
use taskprobe::DialogAction;

#[tokio::test]
async fn test_delete_is_accepted_in_every_mode() {
    for mode in ALL_MODES {
        let s = logged_in(mode).await;
        let task = s.page.create_task("Doomed", &TaskFields::default()).await.unwrap();
        let outcome = s.page.delete_task(task.clone()).await.unwrap();
        s.verify.assert_absent(&task).await.unwrap();
        assert!(outcome.elapsed < Duration::from_millis(1_500), "{mode:?}");
        let expected = match mode {
            ConfirmationMode::NativeDialog => Some(Mechanism::NativeDialog),
            ConfirmationMode::InAppModal => Some(Mechanism::InAppControl),
            ConfirmationMode::None => None,
        };
        assert_eq!(outcome.mechanism(), expected, "{mode:?}");
    }
}

#[tokio::test]
async fn test_native_dialog_is_accepted_once() {
    let s = logged_in(ConfirmationMode::NativeDialog).await;
    let task = s.page.create_task("Once", &TaskFields::default()).await.unwrap();
    s.page.delete_task(task).await.unwrap();
    let history = s.app.dialogs();
    assert_eq!(history.count(), 1);
    assert_eq!(history.last().unwrap().action(), DialogAction::Accept);
}

#[tokio::test]
async fn test_in_app_synonym_label_is_recognised() {
    let s = session_over(
        FakeTaskApp::default()
            .with_confirmation(ConfirmationMode::InAppModal)
            .with_confirm_label("Confirm"),
    );
    let admin = s.data.users.admin.clone();
    s.page.login(&admin.email, &admin.password).await.unwrap();
    let task = s.page.create_task("Synonym", &TaskFields::default()).await.unwrap();
    let outcome = s.page.delete_task(task).await.unwrap();
    assert!(outcome.is_accepted());
    assert!(s.app.tasks().is_empty());
}

#[tokio::test]
async fn test_trigger_then_cancel_leaves_card() {
    for mode in [ConfirmationMode::NativeDialog, ConfirmationMode::InAppModal] {
        let s = logged_in(mode).await;
        let task = s.page.create_task("Spared", &TaskFields::default()).await.unwrap();
        s.page.trigger_delete(&task).await.unwrap();
        let outcome = s.page.cancel_deletion().await.unwrap();
        assert!(!outcome.is_accepted(), "{mode:?}");
        s.verify.assert_exists(&task).await.unwrap();
        assert_eq!(s.app.tasks().len(), 1);
    }
}

#[tokio::test]
async fn test_protocol_cannot_be_rearmed() {
    let s = logged_in(ConfirmationMode::NativeDialog).await;
    let mut protocol = s.page.confirmation();
    protocol.arm().unwrap();
    assert!(matches!(protocol.arm(), Err(ProbeError::InvalidState { .. })));
}
