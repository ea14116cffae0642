// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::BuildMode;

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build, watch and serve front-end assets from a fixed task graph.",
    long_about = None
)]
pub struct CliArgs {
    /// What to do. Defaults to `watch` (build once, then serve and watch).
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to an optional config file (TOML).
    ///
    /// If omitted, `Assetpipe.toml` in the current directory is used when it
    /// exists, otherwise built-in defaults.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Build mode; overrides `[config].mode` from the config file.
    #[arg(long, global = true, value_enum, value_name = "MODE")]
    pub mode: Option<BuildMode>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task graph, but don't run anything.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Clean the output root, then build every category concurrently.
    Build,
    /// Build once, then watch sources and serve the output root.
    Watch {
        /// Port for the dev server; overrides `[server].port`.
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,

        /// Watch and rebuild without starting the dev server.
        #[arg(long)]
        no_server: bool,
    },
    /// Remove everything under the output root.
    Clean,
    /// Drop cached image optimisation results.
    ClearCache,
    /// Run a single named task (built-in or declared in `[task.*]`).
    Run {
        #[arg(value_name = "TASK")]
        task: String,
    },
    /// Print the task graph.
    Tasks,
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
