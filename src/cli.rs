// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `pipegraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipegraph",
    version,
    about = "Run a reactive filter/threshold pipeline graph against a table of rows.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// JSON file holding the table rows (an array of objects).
    ///
    /// Without it the table is empty and every run returns no rows.
    #[arg(long, value_name = "PATH")]
    pub data: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEGRAPH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph and the derived query, but don't
    /// run it.
    #[arg(long)]
    pub dry_run: bool,
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
    fn defaults_and_flags() {
        let args = CliArgs::parse_from(["pipegraph"]);
        assert_eq!(args.config, default_config_path());
        assert_eq!(args.config, PathBuf::from("Pipeline.toml"));
        assert!(args.data.is_none());
        assert!(!args.dry_run);

        let args = CliArgs::parse_from([
            "pipegraph",
            "--config",
            "demo.toml",
            "--data",
            "rows.json",
            "--log-level",
            "debug",
            "--dry-run",
        ]);
        assert_eq!(args.config, PathBuf::from("demo.toml"));
        assert_eq!(args.data.as_deref(), Some("rows.json"));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.dry_run);
    }
}
