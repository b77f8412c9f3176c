//! Shared setup for the integration suites

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use taskprobe::mock::{ConfirmationMode, FakeTaskApp};
use taskprobe::prelude::*;
use taskprobe::Timeouts;

pub struct Session {
    pub app: Arc<FakeTaskApp>,
    pub page: TaskManagerPage,
    pub verify: Verifier,
    pub data: TestData,
}

pub fn session_over(app: FakeTaskApp) -> Session {
    let app = Arc::new(app);
    let config = HarnessConfig::new(app.base_url()).with_timeouts(Timeouts::fast());
    let page = TaskManagerPage::new(app.clone(), config.clone()).unwrap();
    let verify = Verifier::new(app.clone(), config).unwrap();
    Session {
        app,
        page,
        verify,
        data: TestData::builtin().unwrap(),
    }
}

pub async fn logged_in(mode: ConfirmationMode) -> Session {
    let session = session_over(FakeTaskApp::default().with_confirmation(mode));
    let admin = session.data.users.admin.clone();
    session.page.login(&admin.email, &admin.password).await.unwrap();
    session.verify.assert_on_dashboard().await.unwrap();
    session
}

pub const ALL_MODES: [ConfirmationMode; 3] = [
    ConfirmationMode::NativeDialog,
    ConfirmationMode::InAppModal,
    ConfirmationMode::None,
];
