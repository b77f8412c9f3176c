//! Taskprobe CLI: acceptance suites for the task manager web app
//!
//! ## Usage
//!
//! ```bash
//! taskprobe run                                  # every suite against Chromium
//! taskprobe run --suite tasks --filter delete    # a subset
//! taskprobe run --driver fake --format json      # in-memory app, JSON report
//! taskprobe cleanup                              # delete every task
//! taskprobe config --show                        # resolved configuration
//! ```

use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use taskprobe::{HarnessConfig, TestData};
use taskprobe_cli::{
    logging, scenarios, CleanupArgs, Cli, CliConfig, CliError, CliResult, Commands, ConfigArgs,
    DriverArg, DriverArgs, DriverSource, OutputFormat, ProgressReporter, RunArgs, ScenarioContext,
    ScenarioRunner, Verbosity,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(config.verbosity, config.log_format);

    match &cli.command {
        Commands::Run(args) => run_scenarios(&cli, &config, args).await,
        Commands::Cleanup(args) => run_cleanup(&cli, &config, args).await,
        Commands::Config(args) => run_config(&cli, &config, args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}

fn reporter(config: &CliConfig) -> ProgressReporter {
    ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
        .with_steps(config.verbosity.is_verbose())
}

fn load_data(path: Option<&Path>) -> CliResult<TestData> {
    let data = match path {
        Some(path) => TestData::load(path)?,
        None => TestData::builtin()?,
    };
    Ok(data)
}

async fn run_scenarios(cli: &Cli, config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let selected = scenarios::select(args.suite.suite(), args.filter.as_deref());

    if args.list {
        for scenario in &selected {
            println!("{}", scenario.id());
        }
        return Ok(());
    }
    if selected.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "no scenario matches suite '{:?}' and filter '{}'",
            args.suite,
            args.filter.as_deref().unwrap_or("")
        )));
    }

    let harness = cli.sources(Some(&args.driver)).resolve()?;
    let data = load_data(args.data.as_deref())?;
    let session = DriverSession::open(&args.driver, &harness).await?;

    let reporter = reporter(config);
    reporter.header(&format!("taskprobe: {} scenario(s) against {}", selected.len(), harness.base_url));

    let mut runner = ScenarioRunner::new(harness, data, session.source.clone(), reporter)
        .with_fail_fast(args.fail_fast);
    let report = runner.run(&selected).await;

    match OutputFormat::from(args.format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => runner.reporter().summary(&report),
    }
    drop(runner);
    session.close().await?;

    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::ScenariosFailed {
            failed: report.failed(),
            total: report.scenarios.len(),
        })
    }
}

async fn run_cleanup(cli: &Cli, config: &CliConfig, args: &CleanupArgs) -> CliResult<()> {
    let harness = cli.sources(Some(&args.driver)).resolve()?;
    let data = load_data(args.data.as_deref())?;
    let session = DriverSession::open(&args.driver, &harness).await?;
    let reporter = reporter(config);

    let ctx = ScenarioContext::new(session.source.driver(&harness), harness, data)?;
    ctx.login_admin().await?;
    let report = ctx.page.delete_all_tasks().await;
    drop(ctx);
    session.close().await?;

    if report.is_clean() {
        reporter.success(&format!("cleanup: {report}"));
    } else {
        reporter.warning(&format!("cleanup: {report}"));
        for failure in &report.failures {
            reporter.warning(&failure.to_string());
        }
    }
    Ok(())
}

fn run_config(cli: &Cli, config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let harness = cli.sources(None).resolve()?;
    if args.show {
        print!("{}", harness.to_yaml()?);
    } else {
        reporter(config).success(&format!("configuration valid (base URL {})", harness.base_url));
    }
    Ok(())
}

/// The page driver a command works through, and how to shut it down
struct DriverSession {
    source: DriverSource,
    #[cfg(feature = "browser")]
    browser: Option<std::sync::Arc<taskprobe::ChromiumDriver>>,
}

impl DriverSession {
    async fn open(args: &DriverArgs, config: &HarnessConfig) -> CliResult<Self> {
        match args.driver {
            DriverArg::Fake => {
                tracing::info!(confirmation = ?args.confirmation, "using in-memory application");
                Ok(Self {
                    source: DriverSource::Fake(args.confirmation.into()),
                    #[cfg(feature = "browser")]
                    browser: None,
                })
            }
            DriverArg::Chromium => Self::launch(config).await,
        }
    }

    #[cfg(feature = "browser")]
    async fn launch(config: &HarnessConfig) -> CliResult<Self> {
        let navigation = std::time::Duration::from_millis(config.timeouts.navigation_ms);
        let driver = std::sync::Arc::new(taskprobe::ChromiumDriver::launch(&config.browser, navigation).await?);
        tracing::info!(headless = config.browser.headless, "chromium launched");
        Ok(Self {
            source: DriverSource::Shared(driver.clone()),
            browser: Some(driver),
        })
    }

    #[cfg(not(feature = "browser"))]
    async fn launch(_config: &HarnessConfig) -> CliResult<Self> {
        Err(CliError::config(
            "built without the `browser` feature; rebuild with --features browser or pass --driver fake",
        ))
    }

    async fn close(self) -> CliResult<()> {
        let Self {
            source,
            #[cfg(feature = "browser")]
            browser,
        } = self;
        drop(source);
        #[cfg(feature = "browser")]
        if let Some(driver) = browser {
            match std::sync::Arc::try_unwrap(driver) {
                Ok(driver) => driver.close().await?,
                Err(_) => tracing::warn!("browser still in use; leaving it to exit with the process"),
            }
        }
        Ok(())
    }
}
