//! Taskprobe CLI library
//!
//! Command-line front end for the taskprobe harness: argument parsing,
//! config layering, logging setup, the scenario catalogue and its runner.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
mod runner;
pub mod scenarios;

pub use commands::{
    CleanupArgs, Cli, ColorArg, Commands, ConfigArgs, ConfirmationArg, DriverArg, DriverArgs,
    FormatArg, LogFormatArg, RunArgs, SuiteArg,
};
pub use config::{CliConfig, ColorChoice, HarnessSources, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, ProgressReporter};
pub use runner::{
    DriverSource, RunReport, Scenario, ScenarioContext, ScenarioFn, ScenarioFuture,
    ScenarioResult, ScenarioRunner, StepRecord, Steps, Suite,
};
