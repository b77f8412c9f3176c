//! Bulk deletion and cleanup reporting

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{logged_in, ALL_MODES};
use taskprobe::prelude::*;

#[tokio::test]
async fn test_bulk_delete_leaves_no_matching_cards() {
    for mode in ALL_MODES {
        let s = logged_in(mode).await;
        let mut refs = Vec::new();
        for _ in 0..3 {
            refs.push(s.page.create_task("Batch", &TaskFields::default()).await.unwrap());
        }
        let report = s.page.delete_many(refs).await;
        assert!(report.is_clean(), "{mode:?}: {report}");
        assert_eq!(report.deleted, 3);
        s.verify.assert_card_count("Batch", 0).await.unwrap();
    }
}

#[tokio::test]
async fn test_delete_all_empties_the_list() {
    let s = logged_in(taskprobe::mock::ConfirmationMode::NativeDialog).await;
    for title in ["Alpha", "Beta", "Gamma", "Delta"] {
        s.app.seed_task(title, "", "", "Low");
    }
    s.page.reload().await.unwrap();
    s.verify.assert_delete_control_count(4).await.unwrap();
    let report = s.page.delete_all_tasks().await;
    assert_eq!(report.deleted, 4);
    assert!(report.is_clean());
    s.verify.assert_delete_control_count(0).await.unwrap();
}

#[tokio::test]
async fn test_missing_refs_are_skipped_not_failed() {
    let s = logged_in(taskprobe::mock::ConfirmationMode::InAppModal).await;
    let real = s.page.create_task("Real", &TaskFields::default()).await.unwrap();
    let report = s
        .page
        .delete_many(vec![TaskRef::from_title("Ghost 99"), real])
        .await;
    assert_eq!(report.attempted, 1);
    assert_eq!(report.deleted, 1);
    assert!(report.is_clean());
}
