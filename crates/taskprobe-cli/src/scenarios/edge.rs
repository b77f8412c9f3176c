//! Unusual input and timing

use super::tidy;
use crate::runner::{Scenario, ScenarioContext, ScenarioFuture, Steps, Suite};
use taskprobe::{Field, TaskFields};

const LONG_DESCRIPTION_CHARS: usize = 1000;

pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario { name: "special-characters", suite: Suite::Edge, run: special_characters },
    Scenario { name: "long-description", suite: Suite::Edge, run: long_description },
    Scenario { name: "priority-options", suite: Suite::Edge, run: priority_options },
    Scenario { name: "whitespace-title", suite: Suite::Edge, run: whitespace_title },
    Scenario { name: "rapid-create-delete", suite: Suite::Edge, run: rapid_create_delete },
    Scenario { name: "refresh-persistence", suite: Suite::Edge, run: refresh_persistence },
];

fn special_characters<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let special = &ctx.data.tasks.special_chars;
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run(
                "create task with markup",
                ctx.page.create_task(
                    &special.title,
                    &TaskFields::default().with_description(special.description.clone()),
                ),
            )
            .await?;
        steps
            .run(
                "text rendered verbatim",
                ctx.verify.assert_fields_visible(&task, Some(&special.description), Some("Medium")),
            )
            .await?;
        steps.run("no script injected", ctx.verify.assert_no_script_in_card(&task)).await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn long_description<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let description = "A".repeat(LONG_DESCRIPTION_CHARS);
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run(
                "create task",
                ctx.page.create_task(
                    "Long Description Test",
                    &TaskFields::default().with_description(description.clone()),
                ),
            )
            .await?;
        steps.run("card shown", ctx.verify.assert_exists(&task)).await?;
        steps
            .run("long text shown", ctx.verify.assert_long_text(&task, &description))
            .await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}

fn priority_options<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let priorities = &ctx.data.tasks.priorities;
        steps.run("log in", ctx.login_admin()).await?;
        steps
            .run(
                "exactly the known priorities offered",
                ctx.verify.assert_select_options(Field::Priority, priorities),
            )
            .await?;
        steps.run("fill title", ctx.page.fill_field(Field::Title, "Priority Test")).await?;
        for priority in priorities {
            steps.run("select priority", ctx.page.select_priority(priority)).await?;
        }
        Ok(())
    })
}

fn whitespace_title<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        let before = steps.run("count delete controls", ctx.verify.delete_control_count()).await?;
        steps.run("fill blank title", ctx.page.fill_field(Field::Title, "   ")).await?;
        steps.run("submit", ctx.page.submit()).await?;
        steps
            .run(
                "title flagged",
                ctx.verify.assert_field_invalid(Field::Title, &ctx.data.messages.required_field),
            )
            .await?;
        steps
            .run("no blank task created", ctx.verify.assert_delete_control_count(before))
            .await
    })
}

fn rapid_create_delete<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        let mut tasks = Vec::new();
        for base in ["Quick Task 1", "Quick Task 2", "Quick Task 3"] {
            tasks.push(
                steps
                    .run("create task", ctx.page.create_task(base, &TaskFields::default()))
                    .await?,
            );
        }
        for task in &tasks {
            steps.run("card shown", ctx.verify.assert_exists(task)).await?;
        }
        let report = steps
            .run("delete all three", async { Ok(ctx.page.delete_many(tasks.clone()).await) })
            .await?;
        steps.cleanup(&report);
        for task in &tasks {
            steps.run("card gone", ctx.verify.assert_absent(task)).await?;
        }
        Ok(())
    })
}

fn refresh_persistence<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        let task = steps
            .run(
                "create task",
                ctx.page.create_task(
                    "Persistence Test",
                    &TaskFields::default().with_description("Testing data persistence"),
                ),
            )
            .await?;
        steps.run("reload", ctx.page.reload()).await?;
        steps.run("still on dashboard", ctx.verify.assert_on_dashboard()).await?;
        steps.run("card survived", ctx.verify.assert_exists(&task)).await?;
        tidy(ctx, steps, vec![task]).await;
        Ok(())
    })
}
