//! CLI configuration and harness config layering

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use taskprobe::HarnessConfig;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - failures only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - step-level output
    Verbose,
    /// Debug - resolver and poll detail
    Debug,
    /// Trace - everything
    Trace,
}

impl Verbosity {
    /// Level from `-q` and the `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug | Self::Trace)
    }

    /// Default `tracing` filter directive when `RUST_LOG` is unset
    #[must_use]
    pub const fn filter_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "taskprobe=debug,taskprobe_cli=debug,info",
            Self::Trace => "trace",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when stderr is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Log line format
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set log format
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}

/// Where the harness configuration comes from, lowest precedence first:
/// defaults, the YAML file, the environment, then these flags
#[derive(Debug, Clone, Default)]
pub struct HarnessSources {
    /// YAML config file
    pub file: Option<PathBuf>,
    /// `--base-url`
    pub base_url: Option<String>,
    /// `--headed`
    pub headed: bool,
    /// `--chromium`
    pub chromium_path: Option<String>,
}

impl HarnessSources {
    /// Resolve against the process environment
    pub fn resolve(&self) -> taskprobe::ProbeResult<HarnessConfig> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment
    pub fn resolve_with<F>(&self, env: F) -> taskprobe::ProbeResult<HarnessConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.file {
            Some(path) => HarnessConfig::load(path)?,
            None => HarnessConfig::default(),
        };
        config.apply_overrides(env)?;
        if let Some(url) = &self.base_url {
            config.base_url.clone_from(url);
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(path) = &self.chromium_path {
            config.browser.chromium_path = Some(path.clone());
        }
        config.validate()?;
        tracing::debug!(base_url = %config.base_url, "harness configuration resolved");
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_default_verbosity() {
            assert_eq!(Verbosity::default(), Verbosity::Normal);
        }

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
            assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(false, 2), Verbosity::Debug);
            assert_eq!(Verbosity::from_flags(false, 9), Verbosity::Trace);
        }

        #[test]
        fn test_is_verbose() {
            assert!(!Verbosity::Quiet.is_verbose());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Verbose.is_verbose());
            assert!(Verbosity::Trace.is_verbose());
        }

        #[test]
        fn test_filter_directive_widens() {
            assert_eq!(Verbosity::Quiet.filter_directive(), "error");
            assert_eq!(Verbosity::Normal.filter_directive(), "warn");
            assert!(Verbosity::Debug.filter_directive().contains("taskprobe=debug"));
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_explicit_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod sources_tests {
        use super::*;

        #[test]
        fn test_defaults_without_sources() {
            let config = HarnessSources::default().resolve_with(|_| None).unwrap();
            assert_eq!(config.base_url, HarnessConfig::default().base_url);
            assert!(config.browser.headless);
        }

        #[test]
        fn test_flags_beat_env_beat_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "base_url: http://from-file:1").unwrap();
            let sources = HarnessSources {
                file: Some(file.path().to_path_buf()),
                ..HarnessSources::default()
            };
            let from_file = sources.resolve_with(|_| None).unwrap();
            assert_eq!(from_file.base_url, "http://from-file:1");

            let env = |key: &str| (key == "TASKPROBE_BASE_URL").then(|| "http://from-env:2".to_string());
            assert_eq!(sources.resolve_with(env).unwrap().base_url, "http://from-env:2");

            let flagged = HarnessSources {
                base_url: Some("http://from-flag:3".to_string()),
                headed: true,
                ..sources
            };
            let config = flagged.resolve_with(env).unwrap();
            assert_eq!(config.base_url, "http://from-flag:3");
            assert!(!config.browser.headless);
        }

        #[test]
        fn test_invalid_result_is_rejected() {
            let sources = HarnessSources {
                base_url: Some("  ".to_string()),
                ..HarnessSources::default()
            };
            assert!(sources.resolve_with(|_| None).is_err());
        }
    }
}
