//! CLI argument structures and parsing.
//!
//! Defines all command-line argument structures using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use switchboard_core::{EntityKind, StateChange};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SWITCHBOARD_CONFIG";

/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV: &str = "SWITCHBOARD_LOG_LEVEL";

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors (default)
    #[default]
    Warn,
    /// Show informational messages, warnings, and errors
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Entity kind as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Feature,
    Experiment,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Feature => EntityKind::Feature,
            KindArg::Experiment => EntityKind::Experiment,
        }
    }
}

/// Switchboard CLI - feature flags and experiments
///
/// Every command starts from the debug cache when the last run left
/// overrides behind.
#[derive(Debug, Parser)]
#[command(name = "switchboard")]
#[command(author, version)]
#[command(about = "Inspect and override Switchboard feature flags and experiments", long_about = None)]
pub struct Cli {
    /// Path to the switchboard.toml config file
    #[arg(long = "config", global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Directory holding caches and experiment state
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level for output to stderr
    #[arg(long = "log-level", global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Enable verbose output (same as --log-level debug)
    #[arg(long = "verbose", short = 'v', global = true)]
    pub verbose: bool,

    /// Enable trace-level logging for debugging
    #[arg(long = "trace", global = true)]
    pub trace: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level chosen by flags, then `SWITCHBOARD_LOG_LEVEL`, then `--log-level`.
    pub fn effective_log_level(&self) -> LogLevel {
        if self.trace {
            LogLevel::Trace
        } else if self.verbose {
            LogLevel::Debug
        } else if let Ok(env_level) = std::env::var(LOG_LEVEL_ENV) {
            LogLevel::from_str_loose(&env_level).unwrap_or(self.log_level)
        } else {
            self.log_level
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a configuration JSON file and keep it as the current state
    Import(ImportArgs),

    /// List experiments and features
    List(ListArgs),

    /// Print the current state as configuration JSON
    Export,

    /// Evaluate a feature or experiment the way application code would
    Check(CheckArgs),

    /// Show the edit rows for a feature or experiment
    Show(EntityArgs),

    /// Add a feature or experiment to the active set
    #[command(subcommand)]
    Add(AddCommand),

    /// Flip a feature or experiment between the active and inactive sets
    Toggle(EntityArgs),

    /// Remove a feature or experiment from both sets
    Delete(EntityArgs),

    /// Edit a feature or experiment
    #[command(subcommand)]
    Edit(EditCommand),

    /// Start an experiment
    Start(ExperimentArgs),

    /// Complete a started experiment
    Complete(ExperimentArgs),

    /// Reset an experiment's lifecycle state
    Reset(ExperimentArgs),

    /// Inspect the history of previously seen entities
    #[command(subcommand)]
    Prefill(PrefillCommand),

    /// Drop the debug cache and every override
    Clear,

    /// Print the default request properties
    Properties(PropertiesArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Configuration JSON file
    pub file: PathBuf,

    /// Identifier sent with the request (defaults to the install id)
    #[arg(long)]
    pub uuid: Option<String>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Print configuration JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    pub kind: KindArg,

    pub name: String,

    /// Value returned when the entity is absent
    #[arg(long)]
    pub default: bool,
}

#[derive(Debug, Args)]
pub struct EntityArgs {
    pub kind: KindArg,

    pub name: String,
}

#[derive(Debug, Args)]
pub struct ExperimentArgs {
    /// Experiment name
    pub name: String,
}

#[derive(Debug, Subcommand)]
pub enum AddCommand {
    /// Add a feature
    Feature {
        name: String,

        /// Values as a JSON object
        #[arg(long)]
        values: Option<String>,
    },

    /// Add an experiment
    Experiment {
        name: String,

        /// Cohort to assign
        #[arg(long)]
        cohort: String,

        /// Extra values as a JSON object
        #[arg(long)]
        values: Option<String>,

        /// Selectable cohorts, comma separated
        #[arg(long, value_delimiter = ',')]
        cohorts: Vec<String>,
    },
}

#[derive(Debug, Args)]
#[group(multiple = false)]
pub struct EnabledFlags {
    /// Move into the active set
    #[arg(long)]
    pub enable: bool,

    /// Move into the inactive set
    #[arg(long)]
    pub disable: bool,
}

impl EnabledFlags {
    pub fn desired(&self) -> Option<bool> {
        if self.enable {
            Some(true)
        } else if self.disable {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Debug, Args)]
#[group(multiple = false)]
pub struct StateFlags {
    /// Start the experiment on save
    #[arg(long)]
    pub start: bool,

    /// Complete the experiment on save
    #[arg(long)]
    pub complete: bool,

    /// Reset the experiment on save
    #[arg(long)]
    pub reset: bool,
}

impl StateFlags {
    pub fn change(&self) -> Option<StateChange> {
        if self.start {
            Some(StateChange::Start)
        } else if self.complete {
            Some(StateChange::Complete)
        } else if self.reset {
            Some(StateChange::Reset)
        } else {
            None
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum EditCommand {
    /// Edit a feature
    Feature {
        name: String,

        /// Replacement values as a JSON object
        #[arg(long)]
        values: Option<String>,

        #[command(flatten)]
        enabled: EnabledFlags,
    },

    /// Edit an experiment
    Experiment {
        name: String,

        /// Replacement values as a JSON object
        #[arg(long)]
        values: Option<String>,

        /// Cohort to select, added as an option when missing
        #[arg(long)]
        cohort: Option<String>,

        /// Cohort option to add
        #[arg(long = "add-cohort")]
        add_cohorts: Vec<String>,

        /// Cohort option to remove
        #[arg(long = "remove-cohort")]
        remove_cohorts: Vec<String>,

        #[command(flatten)]
        state: StateFlags,

        #[command(flatten)]
        enabled: EnabledFlags,
    },
}

#[derive(Debug, Subcommand)]
pub enum PrefillCommand {
    /// List recorded entities not currently registered
    List,

    /// Forget every recorded entity
    Clear,

    /// Re-create a recorded entity in the active set
    Restore {
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct PropertiesArgs {
    /// Identifier of the person
    #[arg(long)]
    pub uuid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str_loose("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str_loose("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str_loose("loud"), None);
    }

    #[test]
    fn test_enable_and_disable_conflict() {
        let result = Cli::try_parse_from([
            "switchboard",
            "edit",
            "feature",
            "f",
            "--enable",
            "--disable",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cohorts_are_comma_separated() {
        let cli = Cli::try_parse_from([
            "switchboard",
            "add",
            "experiment",
            "exp",
            "--cohort",
            "a",
            "--cohorts",
            "a,b",
        ])
        .unwrap();
        match cli.command {
            Commands::Add(AddCommand::Experiment { cohorts, .. }) => {
                assert_eq!(cohorts, vec!["a", "b"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
