//! Sequential scenario runner.
//!
//! A scenario is a list of named steps. Each step is logged and timed; the
//! first failing step ends its scenario and the runner moves on to the next.

use crate::output::ProgressReporter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use taskprobe::mock::{ConfirmationMode, FakeTaskApp};
use taskprobe::prelude::*;
use uuid::Uuid;

/// Future returned by a scenario body
pub type ScenarioFuture<'a> = Pin<Box<dyn Future<Output = ProbeResult<()>> + 'a>>;

/// Scenario body
pub type ScenarioFn = for<'a> fn(&'a ScenarioContext, &'a mut Steps) -> ScenarioFuture<'a>;

/// Scenario groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suite {
    /// Login, sign-up, logout
    Auth,
    /// Task create/edit/delete/toggle
    Tasks,
    /// Unusual input and timing
    Edge,
}

impl Suite {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Tasks => "tasks",
            Self::Edge => "edge",
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named scenario
#[derive(Clone, Copy)]
pub struct Scenario {
    /// Short name, unique within the suite
    pub name: &'static str,
    /// Owning suite
    pub suite: Suite,
    /// Body
    pub run: ScenarioFn,
}

impl Scenario {
    /// `suite::name`
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}::{}", self.suite, self.name)
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("suite", &self.suite)
            .finish_non_exhaustive()
    }
}

/// Handles a scenario body works with
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    /// Action executor
    pub page: TaskManagerPage,
    /// Verification layer
    pub verify: Verifier,
    /// Test data
    pub data: TestData,
}

impl ScenarioContext {
    /// Context over `driver`
    pub fn new(driver: SharedDriver, config: HarnessConfig, data: TestData) -> ProbeResult<Self> {
        Ok(Self {
            page: TaskManagerPage::new(driver.clone(), config.clone())?,
            verify: Verifier::new(driver, config)?,
            data,
        })
    }

    /// Log in as the admin account and wait for the dashboard
    pub async fn login_admin(&self) -> ProbeResult<()> {
        let admin = &self.data.users.admin;
        self.page.login(&admin.email, &admin.password).await?;
        self.verify.assert_on_dashboard().await
    }
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step name
    pub name: String,
    /// Whether it succeeded
    pub passed: bool,
    /// Wall time
    pub duration_ms: u64,
    /// Error text when it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Step log of the running scenario
#[derive(Debug, Default)]
pub struct Steps {
    records: Vec<StepRecord>,
    warnings: Vec<String>,
}

impl Steps {
    /// Run and record one step
    pub async fn run<T, F>(&mut self, name: &str, step: F) -> ProbeResult<T>
    where
        F: Future<Output = ProbeResult<T>>,
    {
        tracing::info!(step = name, "step started");
        let start = Instant::now();
        let result = step.await;
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!(step = name, duration_ms, "step passed"),
            Err(e) => tracing::error!(step = name, duration_ms, error = %e, "step failed"),
        }
        self.records.push(StepRecord {
            name: name.to_string(),
            passed: result.is_ok(),
            duration_ms,
            error: result.as_ref().err().map(ToString::to_string),
        });
        result
    }

    /// Record cleanup failures as warnings; they never fail the scenario
    pub fn cleanup(&mut self, report: &CleanupReport) {
        if !report.is_clean() {
            self.warnings.push(format!("cleanup: {report}"));
            self.warnings
                .extend(report.failures.iter().map(ToString::to_string));
        }
    }

    /// Steps recorded so far
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// `suite::name`
    pub name: String,
    /// Suite name
    pub suite: String,
    /// Whether every step passed
    pub passed: bool,
    /// The error that ended the scenario
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Steps in order
    pub steps: Vec<StepRecord>,
    /// Non-fatal problems
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Wall time
    pub duration_ms: u64,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Scenario results in run order
    pub scenarios: Vec<ScenarioResult>,
    /// Wall time
    pub duration_ms: u64,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    /// Empty report stamped now
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            scenarios: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Passed scenarios
    #[must_use]
    pub fn passed(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed).count()
    }

    /// Failed scenarios
    #[must_use]
    pub fn failed(&self) -> usize {
        self.scenarios.iter().filter(|s| !s.passed).count()
    }

    /// Check if every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.scenarios.iter().all(|s| s.passed)
    }
}

/// Where scenarios get their page driver
#[derive(Clone)]
pub enum DriverSource {
    /// A fresh in-memory application per scenario
    Fake(ConfirmationMode),
    /// One driver shared by every scenario
    Shared(SharedDriver),
}

impl fmt::Debug for DriverSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fake(mode) => f.debug_tuple("Fake").field(mode).finish(),
            Self::Shared(_) => f.write_str("Shared"),
        }
    }
}

impl DriverSource {
    /// Driver for the next scenario
    #[must_use]
    pub fn driver(&self, config: &HarnessConfig) -> SharedDriver {
        match self {
            Self::Fake(mode) => Arc::new(
                FakeTaskApp::new(config.base_url.clone())
                    .with_confirmation(*mode)
                    .with_today(Utc::now().format("%Y-%m-%d").to_string()),
            ),
            Self::Shared(driver) => driver.clone(),
        }
    }
}

/// Runs scenarios one after another
#[derive(Debug)]
pub struct ScenarioRunner {
    config: HarnessConfig,
    data: TestData,
    source: DriverSource,
    reporter: ProgressReporter,
    fail_fast: bool,
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: HarnessConfig, data: TestData, source: DriverSource, reporter: ProgressReporter) -> Self {
        Self {
            config,
            data,
            source,
            reporter,
            fail_fast: false,
        }
    }

    /// Stop after the first failing scenario
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// The reporter, for the closing summary
    #[must_use]
    pub const fn reporter(&self) -> &ProgressReporter {
        &self.reporter
    }

    /// Run `scenarios` in order
    pub async fn run(&mut self, scenarios: &[Scenario]) -> RunReport {
        let mut report = RunReport::new();
        let start = Instant::now();
        tracing::info!(run_id = %report.run_id, count = scenarios.len(), "run started");
        self.reporter
            .start_progress(scenarios.len() as u64, "Running scenarios");

        for scenario in scenarios {
            let result = self.run_one(scenario).await;
            let failed = !result.passed;
            self.reporter.scenario_finished(&result);
            report.scenarios.push(result);
            if failed && self.fail_fast {
                tracing::warn!(scenario = %scenario.id(), "stopping after first failure");
                break;
            }
        }

        self.reporter.finish();
        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            run_id = %report.run_id,
            passed = report.passed(),
            failed = report.failed(),
            "run finished"
        );
        report
    }

    #[tracing::instrument(skip_all, fields(scenario = %scenario.id()))]
    async fn run_one(&self, scenario: &Scenario) -> ScenarioResult {
        self.reporter.scenario_started(&scenario.id());
        let start = Instant::now();
        let mut steps = Steps::default();
        let driver = self.source.driver(&self.config);
        let outcome = match ScenarioContext::new(driver, self.config.clone(), self.data.clone()) {
            Ok(ctx) => (scenario.run)(&ctx, &mut steps).await,
            Err(e) => Err(e),
        };
        let error = outcome.err().map(|e| e.to_string());
        ScenarioResult {
            name: scenario.id(),
            suite: scenario.suite.to_string(),
            passed: error.is_none(),
            error,
            steps: steps.records,
            warnings: steps.warnings,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use taskprobe::Timeouts;

    fn passing<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
        Box::pin(async move {
            steps.run("login", ctx.login_admin()).await?;
            steps.run("dashboard", ctx.verify.assert_on_dashboard()).await
        })
    }

    fn failing<'a>(ctx: &'a ScenarioContext, steps: &'a mut Steps) -> ScenarioFuture<'a> {
        Box::pin(async move {
            steps.run("login", ctx.login_admin()).await?;
            steps
                .run("find ghost", ctx.verify.assert_exists(&TaskRef::from_title("Ghost 1")))
                .await?;
            steps.run("never reached", async { Ok(()) }).await
        })
    }

    fn runner() -> ScenarioRunner {
        let config = HarnessConfig::default().with_timeouts(Timeouts::fast());
        ScenarioRunner::new(
            config,
            TestData::builtin().unwrap(),
            DriverSource::Fake(ConfirmationMode::NativeDialog),
            ProgressReporter::new(false, true),
        )
    }

    const PASS: Scenario = Scenario {
        name: "passes",
        suite: Suite::Auth,
        run: passing,
    };
    const FAIL: Scenario = Scenario {
        name: "fails",
        suite: Suite::Tasks,
        run: failing,
    };

    mod runner_tests {
        use super::*;

        #[tokio::test]
        async fn test_passing_scenario() {
            let report = runner().run(&[PASS]).await;
            assert!(report.all_passed());
            let result = &report.scenarios[0];
            assert_eq!(result.name, "auth::passes");
            assert_eq!(result.steps.len(), 2);
        }

        #[tokio::test]
        async fn test_first_failure_stops_scenario() {
            let report = runner().run(&[FAIL, PASS]).await;
            assert_eq!(report.failed(), 1);
            assert_eq!(report.passed(), 1);
            let failed = &report.scenarios[0];
            assert_eq!(failed.steps.len(), 2);
            assert!(!failed.steps[1].passed);
            assert!(failed.error.as_deref().unwrap().contains("Ghost 1"));
        }

        #[tokio::test]
        async fn test_fail_fast() {
            let report = runner().with_fail_fast(true).run(&[FAIL, PASS]).await;
            assert_eq!(report.scenarios.len(), 1);
        }
    }

    mod steps_tests {
        use super::*;

        #[test]
        fn test_cleanup_failures_become_warnings() {
            let mut steps = Steps::default();
            steps.cleanup(&CleanupReport::default());
            assert!(steps.warnings.is_empty());

            let mut report = CleanupReport::default();
            report.failures.push(ProbeError::CleanupFailure {
                target: "Task 1".to_string(),
                message: "gone".to_string(),
            });
            steps.cleanup(&report);
            assert_eq!(steps.warnings.len(), 2);
            assert!(steps.records().is_empty());
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn test_report_serialises() {
            let report = RunReport::new();
            let json = serde_json::to_value(&report).unwrap();
            assert!(json.get("run_id").is_some());
            assert_eq!(json["scenarios"], serde_json::json!([]));
        }
    }
}
