// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `condukt`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "condukt",
    version,
    about = "Inspect pipeline traces and engine configuration.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONDUKT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the first failure boundary of a trace as JSON.
    ///
    /// Exits with status 1 when the trace records a failed run.
    Diagnose {
        #[arg(value_name = "TRACE")]
        trace: PathBuf,
    },

    /// Recompute and print the task status summary of a trace.
    Summarize {
        #[arg(value_name = "TRACE")]
        trace: PathBuf,
    },

    /// Validate a config file and print the resolved defaults.
    CheckConfig {
        /// Default: `Condukt.toml` in the current working directory.
        #[arg(long, value_name = "PATH", default_value = "Condukt.toml")]
        config: PathBuf,
    },

    /// Run the bundled research/draft/verify pipeline against a scripted
    /// provider and write its trace.
    Demo {
        /// Make the draft step return output that violates its contract.
        #[arg(long)]
        broken: bool,

        #[arg(long, value_name = "PATH", default_value = "trace.quickstart.json")]
        out: PathBuf,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_log_level_after_subcommand() {
        let args =
            CliArgs::try_parse_from(["condukt", "diagnose", "trace.json", "--log-level", "debug"])
                .unwrap();
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(matches!(args.command, Command::Diagnose { ref trace } if trace.ends_with("trace.json")));
    }

    #[test]
    fn demo_defaults() {
        let args = CliArgs::try_parse_from(["condukt", "demo"]).unwrap();
        let Command::Demo { broken, out } = args.command else {
            panic!("expected demo");
        };
        assert!(!broken);
        assert_eq!(out, PathBuf::from("trace.quickstart.json"));
    }

    #[test]
    fn check_config_default_path() {
        let args = CliArgs::try_parse_from(["condukt", "check-config"]).unwrap();
        assert!(matches!(
            args.command,
            Command::CheckConfig { ref config } if config == &PathBuf::from("Condukt.toml")
        ));
    }
}
