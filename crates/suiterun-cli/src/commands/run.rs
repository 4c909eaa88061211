//! Run command - execute the suites of test modules

use crate::config::{RunFlags, Settings};
use crate::interactive;
use crate::modules::enumerate;
use crate::reporter::{ProgressDots, Summary};
use anyhow::{Context, Result};
use chrono::Local;
use colored::*;
use std::io::{self, IsTerminal};
use std::sync::Arc;
use suiterun_config::ConfigLoader;
use suiterun_core::{write_report, ModuleIntrospector, ModuleOutcome, TestRunner};

/// Run the command from the current directory and return the exit status
pub fn run<I: ModuleIntrospector>(flags: RunFlags, introspector: I) -> Result<i32> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let config = ConfigLoader::new()
        .load_from_directory(&cwd)
        .context("Failed to load configuration")?;
    let settings = Settings::resolve(&flags, &config, &cwd, Local::now());
    execute(&settings, introspector)
}

/// Discover, run and report; returns the exit status (the failure count)
pub fn execute<I: ModuleIntrospector>(settings: &Settings, introspector: I) -> Result<i32> {
    if !settings.color {
        colored::control::set_override(false);
    }

    let progress = Arc::new(ProgressDots::new(settings.quiet || settings.json));
    let mut runner = TestRunner::new(introspector, &settings.results_dir)?
        .with_parallelism(settings.parallelism)
        .with_progress(progress)
        .switch_working_directory(true);

    for filter in &settings.filters {
        runner.add_filter(filter);
    }

    let modules = enumerate(&settings.paths, &settings.module_suffix);
    if modules.is_empty() && !settings.json {
        println!("{}", "No test modules found.".yellow());
    }
    for module in &modules {
        if let ModuleOutcome::Skipped(error) = runner.add_module(module) {
            if !settings.json {
                eprintln!("{} {}", "warning:".yellow().bold(), error);
            }
        }
    }

    let staged = runner.discovery().manifest().len();
    tracing::debug!(
        modules = modules.len(),
        plans = runner.plans().len(),
        deployment_items = staged,
        "discovery finished"
    );

    let record = runner.execute()?;

    if let Some(report) = &settings.report {
        write_report(report, &record)
            .with_context(|| format!("Failed to write report to {}", report.display()))?;
    }

    let summary = Summary::from_record(&record);
    if settings.json {
        println!("{}", summary.to_json());
    } else {
        summary.write_totals(&mut io::stdout().lock())?;
        if settings.interactive && io::stdin().is_terminal() {
            interactive::browse(&summary.failures)?;
        } else {
            summary.write_failures(&mut io::stdout().lock())?;
        }
    }

    Ok(summary.exit_code())
}
