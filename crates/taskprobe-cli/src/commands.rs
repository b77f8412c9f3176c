//! CLI command definitions using clap

use crate::config::{ColorChoice, HarnessSources, LogFormat};
use crate::output::OutputFormat;
use crate::runner::Suite;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use taskprobe::mock::ConfirmationMode;

/// Taskprobe: acceptance suites for the task manager web app
#[derive(Parser, Debug)]
#[command(name = "taskprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (failures only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, value_enum, default_value = "compact", global = true)]
    pub log_format: LogFormatArg,

    /// Harness configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the application, overriding config and environment
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenario suites
    Run(RunArgs),

    /// Log in and delete every task
    Cleanup(CleanupArgs),

    /// Validate or print the resolved configuration
    Config(ConfigArgs),
}

/// How to reach the application
#[derive(Args, Debug, Clone)]
pub struct DriverArgs {
    /// Page driver
    #[arg(long, value_enum, default_value = "chromium")]
    pub driver: DriverArg,

    /// Confirmation style of the in-memory app (fake driver only)
    #[arg(long, value_enum, default_value = "native")]
    pub confirmation: ConfirmationArg,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Chromium executable
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium: Option<String>,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Suite to run
    #[arg(short, long, value_enum, default_value = "all")]
    pub suite: SuiteArg,

    /// Only scenarios whose `suite::name` contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// List matching scenarios without running them
    #[arg(long)]
    pub list: bool,

    /// Stop after the first failing scenario
    #[arg(long)]
    pub fail_fast: bool,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    pub format: FormatArg,

    /// Test data file (YAML); defaults to the bundled set
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Browser or in-memory application
    #[command(flatten)]
    pub driver: DriverArgs,
}

/// Arguments for the cleanup command
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Test data file (YAML) holding the account to log in with
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Browser or in-memory application
    #[command(flatten)]
    pub driver: DriverArgs,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print the resolved configuration as YAML
    #[arg(long)]
    pub show: bool,
}

impl Cli {
    /// Config sources from the global flags and a command's driver flags
    #[must_use]
    pub fn sources(&self, driver: Option<&DriverArgs>) -> HarnessSources {
        HarnessSources {
            file: self.config.clone(),
            base_url: self.base_url.clone(),
            headed: driver.is_some_and(|d| d.headed),
            chromium_path: driver.and_then(|d| d.chromium.clone()),
        }
    }
}

/// Suite selection
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuiteArg {
    /// Every suite
    #[default]
    All,
    /// Login, sign-up, logout
    Auth,
    /// Task operations
    Tasks,
    /// Edge cases
    Edge,
}

impl SuiteArg {
    /// `None` for all suites
    #[must_use]
    pub const fn suite(self) -> Option<Suite> {
        match self {
            Self::All => None,
            Self::Auth => Some(Suite::Auth),
            Self::Tasks => Some(Suite::Tasks),
            Self::Edge => Some(Suite::Edge),
        }
    }
}

/// Page driver selection
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriverArg {
    /// Headless Chromium over CDP
    #[default]
    Chromium,
    /// In-memory task manager, for trying the harness out
    Fake,
}

/// Confirmation style of the in-memory app
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfirmationArg {
    /// `window.confirm()`
    #[default]
    Native,
    /// In-page modal
    InApp,
    /// Delete without asking
    None,
}

impl From<ConfirmationArg> for ConfirmationMode {
    fn from(arg: ConfirmationArg) -> Self {
        match arg {
            ConfirmationArg::Native => Self::NativeDialog,
            ConfirmationArg::InApp => Self::InAppModal,
            ConfirmationArg::None => Self::None,
        }
    }
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable
    #[default]
    Text,
    /// JSON on stdout
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Compact lines
    #[default]
    Compact,
    /// JSON lines
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_run_defaults() {
            let cli = Cli::parse_from(["taskprobe", "run"]);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.suite, SuiteArg::All);
            assert_eq!(args.driver.driver, DriverArg::Chromium);
            assert_eq!(args.format, FormatArg::Text);
            assert!(!args.fail_fast);
        }

        #[test]
        fn test_parse_run_with_options() {
            let cli = Cli::parse_from([
                "taskprobe", "-vv", "run", "--suite", "tasks", "--filter", "delete", "--driver", "fake",
                "--confirmation", "in-app", "--format", "json",
            ]);
            assert_eq!(cli.verbose, 2);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.suite.suite(), Some(Suite::Tasks));
            assert_eq!(args.filter.as_deref(), Some("delete"));
            assert_eq!(args.driver.driver, DriverArg::Fake);
            assert_eq!(
                ConfirmationMode::from(args.driver.confirmation),
                ConfirmationMode::InAppModal
            );
            assert_eq!(OutputFormat::from(args.format), OutputFormat::Json);
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = Cli::parse_from([
                "taskprobe", "config", "--show", "--base-url", "http://app:8080", "-q",
            ]);
            assert!(cli.quiet);
            assert_eq!(cli.base_url.as_deref(), Some("http://app:8080"));
            assert!(matches!(cli.command, Commands::Config(ConfigArgs { show: true })));
        }

        #[test]
        fn test_sources_carry_driver_flags() {
            let cli = Cli::parse_from(["taskprobe", "cleanup", "--headed", "--chromium", "/bin/chromium"]);
            let Commands::Cleanup(args) = &cli.command else {
                panic!("expected cleanup");
            };
            let sources = cli.sources(Some(&args.driver));
            assert!(sources.headed);
            assert_eq!(sources.chromium_path.as_deref(), Some("/bin/chromium"));
        }

        #[test]
        fn test_unknown_suite_rejected() {
            assert!(Cli::try_parse_from(["taskprobe", "run", "--suite", "perf"]).is_err());
        }
    }
}
