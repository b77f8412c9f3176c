//! Console reporting of scenario progress and results

use crate::runner::{RunReport, ScenarioResult};
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the final report is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable summary on stderr
    #[default]
    Text,
    /// The full [`RunReport`] as JSON on stdout
    Json,
}

/// Progress reporter for scenario runs
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Print every step, not just failing ones
    pub show_steps: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
            show_steps: false,
        }
    }

    /// Also list passing steps
    #[must_use]
    pub const fn with_steps(mut self, show_steps: bool) -> Self {
        self.show_steps = show_steps;
        self
    }

    /// Start a progress bar over `total` scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Show which scenario is running
    pub fn scenario_started(&self, name: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(name.to_string());
        }
    }

    /// Report a finished scenario and advance the bar
    pub fn scenario_finished(&self, result: &ScenarioResult) {
        let line = format!("{} ({} ms)", result.name, result.duration_ms);
        self.println_above(|| {
            if result.passed {
                self.success(&line);
            } else {
                self.failure(&line);
            }
            for step in &result.steps {
                if !step.passed {
                    let error = step.error.as_deref().unwrap_or("failed");
                    self.detail(&format!("step {:?}: {error}", step.name));
                } else if self.show_steps {
                    self.detail(&format!("step {:?} ok ({} ms)", step.name, step.duration_ms));
                }
            }
            for warning in &result.warnings {
                self.warning(warning);
            }
        });
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
    }

    fn println_above(&self, print: impl FnOnce()) {
        match self.progress_bar {
            Some(ref pb) => pb.suspend(print),
            None => print(),
        }
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // shown even when quiet
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    fn detail(&self, message: &str) {
        let text = if self.use_color {
            style(message).dim().to_string()
        } else {
            message.to_string()
        };
        let _ = self.term.write_line(&format!("    {text}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print the closing tally of a run
    pub fn summary(&self, report: &RunReport) {
        let passed = report.passed();
        let failed = report.failed();
        if self.quiet && failed == 0 {
            return;
        }

        let _ = self.term.write_line("");
        let total = passed + failed;
        let duration_secs = Duration::from_millis(report.duration_ms).as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({passed} passed, {failed} failed)"
            ));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::runner::StepRecord;

    fn result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            name: "tasks::create".to_string(),
            suite: "tasks".to_string(),
            passed,
            error: (!passed).then(|| "card never appeared".to_string()),
            steps: vec![StepRecord {
                name: "create task".to_string(),
                passed,
                duration_ms: 12,
                error: (!passed).then(|| "card never appeared".to_string()),
            }],
            warnings: vec!["1/2 deleted, 1 failure(s)".to_string()],
            duration_ms: 20,
        }
    }

    mod output_format_tests {
        use super::*;

        #[test]
        fn test_default_format() {
            assert_eq!(OutputFormat::default(), OutputFormat::Text);
        }
    }

    mod progress_reporter_tests {
        use super::*;

        #[test]
        fn test_new_reporter() {
            let reporter = ProgressReporter::new(true, false);
            assert!(reporter.use_color);
            assert!(!reporter.quiet);
            assert!(!reporter.show_steps);
        }

        #[test]
        fn test_scenario_lines() {
            let reporter = ProgressReporter::new(false, false).with_steps(true);
            reporter.scenario_started("tasks::create");
            reporter.scenario_finished(&result(true));
            reporter.scenario_finished(&result(false));
            // No panic = success
        }

        #[test]
        fn test_progress_bar() {
            let mut reporter = ProgressReporter::new(false, false);
            reporter.start_progress(2, "Running scenarios");
            reporter.scenario_started("a");
            reporter.scenario_finished(&result(true));
            reporter.finish();
            // No panic = success
        }

        #[test]
        fn test_summary() {
            let reporter = ProgressReporter::new(false, false);
            let mut report = RunReport::new();
            report.scenarios.push(result(true));
            report.scenarios.push(result(false));
            reporter.summary(&report);
            // No panic = success
        }

        #[test]
        fn test_quiet_mode_suppresses_output() {
            let mut reporter = ProgressReporter::new(false, true);
            reporter.start_progress(10, "Running scenarios");
            assert!(reporter.progress_bar.is_none());
            reporter.success("hidden");
            reporter.warning("hidden");
            reporter.info("hidden");
            reporter.header("hidden");
            reporter.failure("shown");
        }
    }
}
