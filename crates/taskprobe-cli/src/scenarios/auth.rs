//! Login, registration and logout

use crate::runner::{Scenario, ScenarioContext, ScenarioFuture, Steps, Suite};
use taskprobe::Field;

pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario { name: "login", suite: Suite::Auth, run: login },
    Scenario { name: "login-invalid-email", suite: Suite::Auth, run: login_invalid_email },
    Scenario { name: "login-invalid-password", suite: Suite::Auth, run: login_invalid_password },
    Scenario { name: "login-empty-email", suite: Suite::Auth, run: login_empty_email },
    Scenario { name: "login-empty-password", suite: Suite::Auth, run: login_empty_password },
    Scenario { name: "login-empty-fields", suite: Suite::Auth, run: login_empty_fields },
    Scenario { name: "login-malformed-email", suite: Suite::Auth, run: login_malformed_email },
    Scenario { name: "register", suite: Suite::Auth, run: register },
    Scenario { name: "register-empty-username", suite: Suite::Auth, run: register_empty_username },
    Scenario { name: "register-malformed-email", suite: Suite::Auth, run: register_malformed_email },
    Scenario { name: "register-weak-password", suite: Suite::Auth, run: register_weak_password },
    Scenario { name: "logout", suite: Suite::Auth, run: logout },
];

fn login<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let admin = &ctx.data.users.admin;
        steps
            .run("submit valid credentials", ctx.page.login(&admin.email, &admin.password))
            .await?;
        steps.run("dashboard shown", ctx.verify.assert_on_dashboard()).await
    })
}

fn login_invalid_email<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let users = &ctx.data.users;
        steps
            .run("submit unknown email", ctx.page.login(&users.invalid.email, &users.admin.password))
            .await?;
        steps
            .run("error shown", ctx.verify.assert_text_visible(&ctx.data.messages.invalid_login))
            .await?;
        steps.run("still on login page", ctx.verify.assert_on_login_page()).await
    })
}

fn login_invalid_password<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let users = &ctx.data.users;
        steps
            .run("submit wrong password", ctx.page.login(&users.admin.email, &users.invalid.password))
            .await?;
        steps
            .run("error shown", ctx.verify.assert_text_visible(&ctx.data.messages.invalid_login))
            .await?;
        steps.run("still on login page", ctx.verify.assert_on_login_page()).await
    })
}

fn login_empty_email<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let admin = &ctx.data.users.admin;
        steps.run("submit without email", ctx.page.login("", &admin.password)).await?;
        steps
            .run(
                "email flagged",
                ctx.verify.assert_field_invalid(Field::Email, &ctx.data.messages.required_field),
            )
            .await?;
        steps.run("still on login page", ctx.verify.assert_on_login_page()).await
    })
}

fn login_empty_password<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let admin = &ctx.data.users.admin;
        steps.run("submit without password", ctx.page.login(&admin.email, "")).await?;
        steps
            .run(
                "password flagged",
                ctx.verify.assert_field_invalid(Field::Password, &ctx.data.messages.required_field),
            )
            .await?;
        steps.run("still on login page", ctx.verify.assert_on_login_page()).await
    })
}

fn login_empty_fields<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let required = &ctx.data.messages.required_field;
        steps.run("submit empty form", ctx.page.login("", "")).await?;
        steps
            .run("email flagged", ctx.verify.assert_field_invalid(Field::Email, required))
            .await?;
        steps
            .run("password flagged", ctx.verify.assert_field_invalid(Field::Password, required))
            .await
    })
}

fn login_malformed_email<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let admin = &ctx.data.users.admin;
        steps
            .run("submit email without @", ctx.page.login("invalid-email", &admin.password))
            .await?;
        let message = steps
            .run("read message", ctx.verify.field_validation_message(Field::Email))
            .await?;
        steps
            .run("message explains the @", async {
                let messages = &ctx.data.messages;
                if message.contains(&messages.invalid_email_format)
                    && message.contains(&messages.invalid_email_missing)
                {
                    Ok(())
                } else {
                    Err(taskprobe::ProbeError::ValidationMismatch {
                        field: Field::Email.to_string(),
                        expected: vec![
                            messages.invalid_email_format.clone(),
                            messages.invalid_email_missing.clone(),
                        ],
                        actual: message.clone(),
                    })
                }
            })
            .await
    })
}

fn register<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let user = ctx.data.fresh_user();
        let username = user.username.clone().unwrap_or_default();
        steps
            .run("sign up", ctx.page.sign_up(&username, &user.email, &user.password))
            .await?;
        steps
            .run("success shown", ctx.verify.assert_text_visible(&ctx.data.messages.user_registered))
            .await?;
        steps
            .run("log in as new user", ctx.page.login(&user.email, &user.password))
            .await?;
        steps.run("dashboard shown", ctx.verify.assert_on_dashboard()).await
    })
}

fn register_empty_username<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let user = ctx.data.fresh_user();
        steps.run("sign up without username", ctx.page.sign_up("", &user.email, &user.password)).await?;
        steps
            .run(
                "username flagged",
                ctx.verify.assert_field_invalid(Field::Username, &ctx.data.messages.required_field),
            )
            .await
    })
}

fn register_malformed_email<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let user = ctx.data.fresh_user();
        let username = user.username.clone().unwrap_or_default();
        steps
            .run("sign up with email without @", ctx.page.sign_up(&username, "not-an-email", &user.password))
            .await?;
        steps
            .run(
                "email flagged",
                ctx.verify.assert_field_invalid(Field::Email, &ctx.data.messages.invalid_email_format),
            )
            .await
    })
}

fn register_weak_password<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        let user = ctx.data.fresh_user();
        let username = user.username.clone().unwrap_or_default();
        steps
            .run("sign up with short password", ctx.page.sign_up(&username, &user.email, "123"))
            .await?;
        steps
            .run(
                "length rule shown",
                ctx.verify.assert_text_visible(&ctx.data.messages.password_too_short),
            )
            .await
    })
}

fn logout<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
    Box::pin(async move {
        steps.run("log in", ctx.login_admin()).await?;
        steps.run("log out", ctx.page.logout()).await?;
        steps.run("landing page shown", ctx.verify.assert_on_home_page()).await?;
        steps.run("dashboard gated", ctx.page.goto(&ctx.page.config().paths.dashboard)).await?;
        steps.run("redirected to login", ctx.verify.assert_on_login_page()).await
    })
}
