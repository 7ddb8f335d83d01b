// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `mailmerge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mailmerge",
    version,
    about = "Merge tabular rows into message templates and dispatch them.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Mailmerge.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Mailmerge.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MAILMERGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run one merge template now, in this process, printing progress.
    Run {
        /// Template key from `[template.<id>]`.
        #[arg(long, value_name = "ID")]
        template: String,

        /// Render every row and print it, but dispatch nothing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Serve the worker endpoint that executes merge runs.
    Worker {
        /// Address to bind; defaults to the host/port of `[config].worker_url`.
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,
    },

    /// Serve the front-line endpoints and hand runs to the worker over HTTP.
    Serve {
        /// Address to bind; defaults to `[config].listen`.
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,
    },

    /// Validate triggers and keep running clock triggers until Ctrl-C.
    Schedule,

    /// Validate the trigger binding of one document (or all of them).
    CheckSchedule {
        #[arg(long, value_name = "ID")]
        document: Option<String>,
    },

    /// Print the header row of a source with its column letters.
    Headers {
        #[arg(long, value_name = "ID")]
        source: String,
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
