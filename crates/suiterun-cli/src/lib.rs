//! Command-line front end for the suiterun engine
//!
//! Suites are registered in code, so the binary is built around a
//! [`StaticIntrospector`]. The stock `suiterun` binary uses the sample
//! registry in [`demo`]; a project links its own suites and calls
//! [`main_with`] from its own `main`.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use suiterun_config::ConfigLoader;
use suiterun_core::StaticIntrospector;

pub mod commands;
pub mod config;
pub mod demo;
pub mod interactive;
pub mod modules;
pub mod reporter;

/// Parallel test runner for statically registered suites.
///
/// Loads test modules, runs their suites on a bounded worker pool and
/// reports the results on the console and as a TeamTest (.trx) document.
///
/// EXAMPLES:
///     suiterun run target/debug                 Run every *tests module found
///     suiterun run bin/math_tests -f Adds       Run tests whose name contains "Adds"
///     suiterun run bin -p 8 -q                  Eight suites at a time, no progress dots
///     suiterun run bin --results-file run.trx   Also write a report
///     suiterun list                             Show registered suites
///
/// ENVIRONMENT VARIABLES:
///     SUITERUN_PARALLELISM    Suites run concurrently (default: 4)
///     SUITERUN_QUIET          Set to '1' to suppress progress characters
///     SUITERUN_RESULTS_DIR    Directory for results and deployment items
///     SUITERUN_MODULE_SUFFIX  File-stem suffix of test modules (default: tests)
///     SUITERUN_JSON           Set to '1' for a JSON summary by default
///     NO_COLOR                Set to disable colored output
///     RUST_LOG                Log filter (default: warn)
#[derive(Parser)]
#[command(name = "suiterun")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the suites of test modules
    ///
    /// Each path is a module file or a directory searched recursively for
    /// files whose name ends with the module suffix. The exit status is the
    /// number of failures.
    ///
    /// EXAMPLES:
    ///     suiterun run bin/math_tests                        Run one module
    ///     suiterun run bin -f Parser -f Lexer                Either filter may match
    ///     suiterun run /testcontainer:bin/math_tests /resultsfile:out.trx
    ///     suiterun run bin -i                                Browse failures afterwards
    #[command(visible_alias = "r")]
    Run {
        /// Module files or directories
        paths: Vec<String>,
        /// Only run suites or tests whose name contains FILTER (repeatable)
        #[arg(short = 'f', long = "filter", value_name = "FILTER")]
        filters: Vec<String>,
        /// Maximum number of suites run concurrently
        #[arg(short = 'p', long, value_parser = config::parse_parallelism)]
        parallelism: Option<usize>,
        /// Suppress progress characters
        #[arg(short = 'q', long)]
        quiet: bool,
        /// Browse failures interactively after the run
        #[arg(short = 'i', long)]
        interactive: bool,
        /// Write a TeamTest report to this file
        #[arg(long, value_name = "PATH")]
        results_file: Option<PathBuf>,
        /// Directory for results and deployment items
        #[arg(long, value_name = "DIR")]
        results_dir: Option<PathBuf>,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
        /// Print a JSON summary instead of the console report
        #[arg(long, env = "SUITERUN_JSON")]
        json: bool,
    },

    /// List registered modules, or the modules found under paths
    ///
    /// EXAMPLES:
    ///     suiterun list                  Every registered suite and test
    ///     suiterun list target/debug     Modules found on disk
    ///     suiterun list --json           Machine-readable listing
    #[command(visible_alias = "ls")]
    List {
        /// Module files or directories
        paths: Vec<String>,
        /// Output in JSON format
        #[arg(long, env = "SUITERUN_JSON")]
        json: bool,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     suiterun completions bash > ~/.local/share/bash-completion/completions/suiterun
    ///     suiterun completions zsh > ~/.zfunc/_suiterun
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parse the process arguments and run against `registry`.
///
/// Returns the exit status the process should end with.
pub fn main_with(registry: StaticIntrospector) -> Result<i32> {
    run_cli(Cli::parse(), registry)
}

/// Run a parsed command line against `registry`
pub fn run_cli(cli: Cli, registry: StaticIntrospector) -> Result<i32> {
    match cli.command {
        Commands::Run {
            paths,
            filters,
            parallelism,
            quiet,
            interactive,
            results_file,
            results_dir,
            no_color,
            json,
        } => {
            let flags = config::RunFlags {
                targets: paths,
                filters,
                parallelism,
                quiet,
                interactive,
                results_file,
                results_dir,
                no_color,
                json,
            };
            commands::run::run(flags, registry)
        }
        Commands::List { paths, json } => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            let loaded = ConfigLoader::new()
                .load_from_directory(&cwd)
                .context("Failed to load configuration")?;
            let args = commands::list::ListArgs {
                targets: paths,
                module_suffix: loaded.module_suffix().to_string(),
                json,
            };
            commands::list::run(args, &registry)?;
            Ok(0)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(0)
        }
    }
}
