//! Task lifecycle through the executor and verification layers

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{logged_in, session_over, ALL_MODES};
use taskprobe::mock::{ConfirmationMode, FakeTaskApp};
use taskprobe::prelude::*;

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_created_task_exists_immediately() {
    for mode in ALL_MODES {
        let s = logged_in(mode).await;
        let valid = s.data.tasks.valid.clone();
        let task = s.page.create_task(&valid.title, &valid.fields()).await.unwrap();
        s.verify.assert_exists(&task).await.unwrap();
        s.verify
            .assert_fields_visible(&task, Some(&valid.description), Some(&valid.priority))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_same_base_title_yields_distinct_refs() {
    let s = logged_in(ConfirmationMode::NativeDialog).await;
    let a = s.page.create_task("Twin", &TaskFields::default()).await.unwrap();
    let b = s.page.create_task("Twin", &TaskFields::default()).await.unwrap();
    assert_ne!(a, b);
    s.verify.assert_exists(&a).await.unwrap();
    s.verify.assert_exists(&b).await.unwrap();
    s.verify.assert_card_count("Twin", 2).await.unwrap();
}

#[tokio::test]
async fn test_buy_milk_scenario() {
    let s = logged_in(ConfirmationMode::NativeDialog).await;
    let task = s
        .page
        .create_task("Buy milk", &TaskFields::default().with_priority("High"))
        .await
        .unwrap();
    s.verify.assert_fields_visible(&task, None, Some("High")).await.unwrap();
    s.page.delete_task(task).await.unwrap();
    s.verify.assert_card_count("Buy milk", 0).await.unwrap();
}

#[tokio::test]
async fn test_render_lag_is_absorbed_by_polling() {
    let s = session_over(FakeTaskApp::default().with_render_lag(5));
    let admin = s.data.users.admin.clone();
    s.page.login(&admin.email, &admin.password).await.unwrap();
    let task = s.page.create_task("Slow", &TaskFields::default()).await.unwrap();
    s.verify.assert_exists(&task).await.unwrap();
    s.page.delete_task(task.clone()).await.unwrap();
    s.verify.assert_absent(&task).await.unwrap();
}

#[tokio::test]
async fn test_long_shared_base_titles_stay_distinct() {
    let s = logged_in(ConfirmationMode::None).await;
    let base = "L".repeat(500);
    let a = s.page.create_task(&base, &TaskFields::default()).await.unwrap();
    let b = s.page.create_task(&base, &TaskFields::default()).await.unwrap();

    s.page.delete_task(a.clone()).await.unwrap();
    s.verify.assert_absent(&a).await.unwrap();
    s.verify.assert_exists(&b).await.unwrap();
    assert_eq!(s.app.tasks().len(), 1);

    let report = s.page.delete_many(vec![a, b.clone()]).await;
    assert!(report.is_clean(), "{report}");
    assert_eq!((report.attempted, report.deleted), (1, 1));
    s.verify.assert_absent(&b).await.unwrap();
    assert!(s.app.tasks().is_empty());
}

// ============================================================================
// Edit
// ============================================================================

#[tokio::test]
async fn test_title_only_edit_keeps_other_fields() {
    let s = logged_in(ConfirmationMode::NativeDialog).await;
    let original = s.data.tasks.for_edit.clone();
    let mut task = s.page.create_task(&original.title, &original.fields()).await.unwrap();
    let before = task.clone();
    s.page
        .edit_task(&mut task, &TaskEdits::default().with_title("Renamed"))
        .await
        .unwrap();

    assert!(task.title().starts_with("Renamed "));
    assert_eq!(task.disambiguator(), before.disambiguator());
    s.verify.assert_absent(&before).await.unwrap();
    s.verify
        .assert_fields_visible(&task, Some(&original.description), Some(&original.priority))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_full_edit_replaces_fields() {
    let s = logged_in(ConfirmationMode::InAppModal).await;
    let original = s.data.tasks.for_edit.clone();
    let updated = s.data.tasks.updated.clone();
    let mut task = s.page.create_task(&original.title, &original.fields()).await.unwrap();
    s.page
        .edit_task(
            &mut task,
            &TaskEdits::default().with_title(updated.title.clone()).with_fields(updated.fields()),
        )
        .await
        .unwrap();
    s.verify
        .assert_fields_visible(&task, Some(&updated.description), Some(&updated.priority))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_edit_changes_nothing() {
    let s = logged_in(ConfirmationMode::NativeDialog).await;
    let task = s.page.create_task("Untouched", &TaskFields::default()).await.unwrap();
    s.page.open_edit(&task).await.unwrap();
    s.page.cancel_edit().await.unwrap();
    s.verify.assert_exists(&task).await.unwrap();
    s.verify.assert_text_absent("Edit Task").await.unwrap();
}

// ============================================================================
// Toggle
// ============================================================================

#[tokio::test]
async fn test_toggle_pair_restores_label() {
    let s = logged_in(ConfirmationMode::NativeDialog).await;
    let task = s.page.create_task("Flip", &TaskFields::default()).await.unwrap();
    s.verify.assert_toggle_label(&task, CardAction::MarkComplete).await.unwrap();

    s.page.toggle_completion(&task).await.unwrap();
    s.verify.assert_completed(&task).await.unwrap();
    s.verify.assert_toggle_label(&task, CardAction::MarkIncomplete).await.unwrap();

    s.page.toggle_completion(&task).await.unwrap();
    s.verify.assert_toggle_label(&task, CardAction::MarkComplete).await.unwrap();
    assert!(!s.app.tasks()[0].completed);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_tasks_survive_reload() {
    let s = logged_in(ConfirmationMode::NativeDialog).await;
    let task = s.page.create_task("Persistent", &TaskFields::default()).await.unwrap();
    s.page.reload().await.unwrap();
    s.verify.assert_on_dashboard().await.unwrap();
    s.verify.assert_exists(&task).await.unwrap();
}
