//! Task creation, editing, deletion and completion

use super::tidy;
use crate::runner::{Scenario, ScenarioContext, ScenarioFuture, Steps, Suite};
use taskprobe::{CardAction, Field, TaskEdits, TaskFields, TaskRef};

pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario { name: "create-all-fields", suite: Suite::Tasks, run: create_all_fields },
    Scenario { name: "create-title-only", suite: Suite::Tasks, run: create_title_only },
    Scenario { name: "create-special-title", suite: Suite::Tasks, run: create_special_title },
    Scenario { name: "create-empty-title", suite: Suite::Tasks, run: create_empty_title },
    Scenario { name: "create-long-title", suite: Suite::Tasks, run: create_long_title },
    Scenario { name: "create-past-due-date", suite: Suite::Tasks, run: create_past_due_date },
    Scenario { name: "edit-all-fields", suite: Suite::Tasks, run: edit_all_fields },
    Scenario { name: "edit-title-only", suite: Suite::Tasks, run: edit_title_only },
    Scenario { name: "edit-cancel", suite: Suite::Tasks, run: edit_cancel },
    Scenario { name: "edit-empty-title", suite: Suite::Tasks, run: edit_empty_title },
    Scenario { name: "delete-confirm", suite: Suite::Tasks, run: delete_confirm },
    Scenario { name: "delete-cancel", suite: Suite::Tasks, run: delete_cancel },
    Scenario { name: "delete-multiple", suite: Suite::Tasks, run: delete_multiple },
    Scenario { name: "mark-complete", suite: Suite::Tasks, run: mark_complete },
    Scenario { name: "mark-incomplete", suite: Suite::Tasks, run: mark_incomplete },
    Scenario { name: "toggle-repeatedly", suite: Suite::Tasks, run: toggle_repeatedly },
    Scenario { name: "toggle-keeps-details", suite: Suite::Tasks, run: toggle_keeps_details },
    Scenario { name: "cleanup-all", suite: Suite::Tasks, run: cleanup_all },
];

fn create_all_fields<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let valid = &ctx.data.tasks.valid;
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run("create task", ctx.page.create_task(&valid.title, &valid.fields()))
            .await?;
        steps.run("card shown", ctx.verify.assert_exists(&task)).await?;
        steps
            .run(
                "details shown",
                ctx.verify
                    .assert_fields_visible(&task, Some(&valid.description), Some(&valid.priority)),
            )
            .await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn create_title_only<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run("create task", ctx.page.create_task("Simple Task", &TaskFields::default()))
            .await?;
        steps.run("card shown", ctx.verify.assert_exists(&task)).await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn create_special_title<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let special = &ctx.data.tasks.special_chars;
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run("create task", ctx.page.create_task(&special.title, &TaskFields::default()))
            .await?;
        steps.run("card shown", ctx.verify.assert_exists(&task)).await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn create_empty_title<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let empty = &ctx.data.tasks.empty_title;
        steps.run("log in", ctx.login_admin()).await?;
        steps
            .run("fill description", ctx.page.fill_field(Field::Description, &empty.description))
            .await?;
        steps.run("submit", ctx.page.submit()).await?;
        steps
            .run(
                "title flagged",
                ctx.verify.assert_field_invalid(Field::Title, &ctx.data.messages.required_field),
            )
            .await
    })
}

/// A very long title is either stored or refused with a validation message
fn create_long_title<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let task = TaskRef::mint(&ctx.data.tasks.long_title());
        steps.run("log in", ctx.login_admin()).await?;
        steps.run("fill long title", ctx.page.fill_field(Field::Title, task.title())).await?;
        steps.run("submit", ctx.page.submit()).await?;
        let created = steps
            .run("created or rejected", async {
                match ctx.verify.assert_exists(&task).await {
                    Ok(()) => Ok(true),
                    Err(missing) => {
                        let message = ctx.verify.field_validation_message(Field::Title).await?;
                        if message.is_empty() {
                            Err(missing)
                        } else {
                            tracing::info!(%message, "long title rejected");
                            Ok(false)
                        }
                    }
                }
            })
            .await?;
        if created {
            tidy(ctx, steps, vec![task]).await;
        }
        Ok(())
    })
}

fn create_past_due_date<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let past = &ctx.data.tasks.past_due_date;
        steps.run("log in", ctx.login_admin()).await?;
        steps.run("fill title", ctx.page.fill_field(Field::Title, &past.title)).await?;
        steps
            .run("fill description", ctx.page.fill_field(Field::Description, &past.description))
            .await?;
        steps.run("fill past date", ctx.page.fill_field(Field::DueDate, &past.due_date)).await?;
        steps.run("submit", ctx.page.submit()).await?;
        steps.run("date rejected", ctx.verify.assert_text_visible("past")).await
    })
}

fn edit_all_fields<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let original = &ctx.data.tasks.for_edit;
        let updated = &ctx.data.tasks.updated;
        steps.run("log in", ctx.login_admin()).await?;
        let mut task = steps
            .run("create task", ctx.page.create_task(&original.title, &original.fields()))
            .await?;
        let edits = TaskEdits::default()
            .with_title(updated.title.clone())
            .with_fields(updated.fields());
        steps.run("edit every field", ctx.page.edit_task(&mut task, &edits)).await?;
        steps
            .run(
                "new details shown",
                ctx.verify
                    .assert_fields_visible(&task, Some(&updated.description), Some(&updated.priority)),
            )
            .await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn edit_title_only<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let original = &ctx.data.tasks.for_edit;
        steps.run("log in", ctx.login_admin()).await?;
        let mut task = steps
            .run("create task", ctx.page.create_task(&original.title, &original.fields()))
            .await?;
        let old = task.clone();
        let edits = TaskEdits::default().with_title(ctx.data.tasks.updated.title.clone());
        steps.run("edit title", ctx.page.edit_task(&mut task, &edits)).await?;
        steps.run("old title gone", ctx.verify.assert_absent(&old)).await?;
        steps
            .run(
                "details kept",
                ctx.verify
                    .assert_fields_visible(&task, Some(&original.description), Some(&original.priority)),
            )
            .await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn edit_cancel<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let original = &ctx.data.tasks.for_edit;
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run("create task", ctx.page.create_task(&original.title, &original.fields()))
            .await?;
        steps.run("open editor", ctx.page.open_edit(&task)).await?;
        steps
            .run("type new title", ctx.page.fill_field(Field::EditTitle, "Should Not Save"))
            .await?;
        steps.run("cancel", ctx.page.cancel_edit()).await?;
        steps.run("original kept", ctx.verify.assert_exists(&task)).await?;
        steps
            .run("edit discarded", ctx.verify.assert_text_absent("Should Not Save"))
            .await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn edit_empty_title<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let original = &ctx.data.tasks.for_edit;
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run("create task", ctx.page.create_task(&original.title, &original.fields()))
            .await?;
        steps.run("open editor", ctx.page.open_edit(&task)).await?;
        steps.run("clear title", ctx.page.clear_field(Field::EditTitle)).await?;
        steps.run("save", ctx.page.save_changes()).await?;
        steps
            .run(
                "title flagged",
                ctx.verify.assert_field_invalid(Field::EditTitle, &ctx.data.messages.required_field),
            )
            .await?;
        steps.run("close editor", ctx.page.cancel_edit()).await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn delete_confirm<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run("create task", ctx.page.create_task("Task to Delete", &TaskFields::default()))
            .await?;
        steps.run("delete and confirm", ctx.page.delete_task(task.clone())).await?;
        steps.run("card gone", ctx.verify.assert_absent(&task)).await
    })
}

fn delete_cancel<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run("create task", ctx.page.create_task("Task to Keep", &TaskFields::default()))
            .await?;
        steps.run("click delete", ctx.page.trigger_delete(&task)).await?;
        steps.run("decline", ctx.page.cancel_deletion()).await?;
        steps.run("card kept", ctx.verify.assert_exists(&task)).await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn delete_multiple<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        let mut tasks = Vec::new();
        for base in ["Delete Test 1", "Delete Test 2", "Delete Test 3"] {
            tasks.push(
                steps
                    .run("create task", ctx.page.create_task(base, &TaskFields::default()))
                    .await?,
            );
        }
        let before = steps.run("count delete controls", ctx.verify.delete_control_count()).await?;
        let kept = tasks.split_off(2);
        for (deleted, task) in tasks.iter().enumerate() {
            steps.run("delete one", ctx.page.delete_task(task.clone())).await?;
            steps.run("that card gone", ctx.verify.assert_absent(task)).await?;
            steps
                .run(
                    "one control fewer",
                    ctx.verify.assert_delete_control_count(before.saturating_sub(deleted + 1)),
                )
                .await?;
        }
        for task in &kept {
            steps.run("remaining card kept", ctx.verify.assert_exists(task)).await?;
        }
        tidy(ctx, steps, kept).await;
        Ok(())
    })
}

fn mark_complete<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run("create task", ctx.page.create_task("Status Test", &TaskFields::default()))
            .await?;
        steps.run("mark complete", ctx.page.toggle_completion(&task)).await?;
        steps.run("completed styling", ctx.verify.assert_completed(&task)).await?;
        steps
            .run(
                "label flipped",
                ctx.verify.assert_toggle_label(&task, CardAction::MarkIncomplete),
            )
            .await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn mark_incomplete<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run("create task", ctx.page.create_task("Status Test", &TaskFields::default()))
            .await?;
        steps.run("mark complete", ctx.page.toggle_completion(&task)).await?;
        steps.run("mark incomplete", ctx.page.toggle_completion(&task)).await?;
        steps
            .run(
                "label restored",
                ctx.verify.assert_toggle_label(&task, CardAction::MarkComplete),
            )
            .await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn toggle_repeatedly<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run("create task", ctx.page.create_task("Toggle Test", &TaskFields::default()))
            .await?;
        for round in 0..3 {
            steps.run("toggle", ctx.page.toggle_completion(&task)).await?;
            let expected = if round % 2 == 0 {
                CardAction::MarkIncomplete
            } else {
                CardAction::MarkComplete
            };
            steps
                .run("label matches", ctx.verify.assert_toggle_label(&task, expected))
                .await?;
        }
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn toggle_keeps_details<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let valid = &ctx.data.tasks.valid;
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run("create task", ctx.page.create_task(&valid.title, &valid.fields()))
            .await?;
        steps.run("mark complete", ctx.page.toggle_completion(&task)).await?;
        steps
            .run(
                "details kept",
                ctx.verify
                    .assert_fields_visible(&task, Some(&valid.description), Some(&valid.priority)),
            )
            .await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn cleanup_all<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        let report = steps
            .run("delete every task", async { Ok(ctx.page.delete_all_tasks().await) })
            .await?;
        steps.cleanup(&report);
        if report.is_clean() {
            steps
                .run("no delete controls left", ctx.verify.assert_delete_control_count(0))
                .await?;
        }
        Ok(())
    })
}
