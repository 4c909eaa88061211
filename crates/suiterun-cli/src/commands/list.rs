//! List command - show registered modules, suites and tests

use crate::modules::{enumerate, Targets};
use anyhow::Result;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use suiterun_core::{ModuleIntrospector, StaticIntrospector, SuiteSource};

/// Arguments for the list command
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    /// Module files or directories; empty lists the whole registry
    pub targets: Vec<String>,
    pub module_suffix: String,
    pub json: bool,
}

/// A suite as shown by `list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteListing {
    pub name: String,
    pub tests: Vec<String>,
    pub ignored: Vec<String>,
    /// The whole suite is ignored
    pub suite_ignored: bool,
}

/// A module as shown by `list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleListing {
    pub name: String,
    pub location: Option<PathBuf>,
    pub suites: Vec<SuiteListing>,
}

impl ModuleListing {
    fn to_json(&self) -> serde_json::Value {
        let suites: Vec<_> = self
            .suites
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "ignored": s.suite_ignored,
                    "tests": s.tests,
                    "ignored_tests": s.ignored,
                })
            })
            .collect();
        serde_json::json!({
            "module": self.name,
            "location": self.location.as_ref().map(|p| p.display().to_string()),
            "suites": suites,
        })
    }
}

fn describe(suites: &[Arc<dyn SuiteSource>]) -> Vec<SuiteListing> {
    suites
        .iter()
        .map(|suite| {
            let metadata = suite.metadata();
            SuiteListing {
                name: metadata.name.clone(),
                tests: metadata.eligible_tests().into_iter().map(String::from).collect(),
                ignored: metadata.ignored_tests().into_iter().map(String::from).collect(),
                suite_ignored: metadata.ignored,
            }
        })
        .collect()
}

/// Every module in the registry, in name order
pub fn registered(registry: &StaticIntrospector) -> Vec<ModuleListing> {
    registry
        .module_names()
        .into_iter()
        .filter_map(|name| registry.module(name))
        .map(|module| ModuleListing {
            name: module.name().to_string(),
            location: None,
            suites: describe(module.suites()),
        })
        .collect()
}

/// Resolve module files against the registry, keeping the load errors
pub fn resolved(
    registry: &StaticIntrospector,
    files: &[PathBuf],
) -> (Vec<ModuleListing>, Vec<(PathBuf, String)>) {
    let mut listings = Vec::new();
    let mut skipped = Vec::new();
    for file in files {
        match registry.load(file) {
            Ok(module) => listings.push(ModuleListing {
                name: module.name,
                location: Some(module.location),
                suites: describe(&module.suites),
            }),
            Err(error) => skipped.push((file.clone(), error.to_string())),
        }
    }
    (listings, skipped)
}

/// Run the list command
pub fn run(args: ListArgs, registry: &StaticIntrospector) -> Result<()> {
    let (listings, skipped) = if args.targets.is_empty() {
        (registered(registry), Vec::new())
    } else {
        let targets = Targets::parse(&args.targets);
        resolved(registry, &enumerate(&targets.paths, &args.module_suffix))
    };

    if args.json {
        let modules: Vec<_> = listings.iter().map(ModuleListing::to_json).collect();
        let skipped: Vec<_> = skipped
            .iter()
            .map(|(path, error)| {
                serde_json::json!({ "path": path.display().to_string(), "error": error })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({ "modules": modules, "skipped": skipped })
        );
        return Ok(());
    }

    if listings.is_empty() {
        println!("{}", "No test modules found.".yellow());
    }
    for listing in &listings {
        print_listing(listing);
    }
    for (path, error) in &skipped {
        eprintln!("{} {}: {}", "skipped".yellow().bold(), path.display(), error.dimmed());
    }

    Ok(())
}

fn print_listing(listing: &ModuleListing) {
    match &listing.location {
        Some(location) => println!("{} ({})", listing.name.bold(), location.display()),
        None => println!("{}", listing.name.bold()),
    }
    for suite in &listing.suites {
        if suite.suite_ignored {
            println!("  {} {}", suite.name, "(ignored)".yellow());
            continue;
        }
        println!("  {}", suite.name);
        for test in &suite.tests {
            println!("    {}", test);
        }
        for test in &suite.ignored {
            println!("    {} {}", test, "(ignored)".yellow());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_registered_lists_every_module() {
        let listings = registered(&demo::registry());
        let names: Vec<&str> = listings.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec![demo::BROKEN_MODULE, demo::SAMPLE_MODULE]);

        let arithmetic = &listings[1].suites[0];
        assert_eq!(arithmetic.name, "ArithmeticTests");
        assert_eq!(arithmetic.ignored, vec!["Overflows".to_string()]);
    }

    #[test]
    fn test_resolved_keeps_load_errors() {
        let dir = TempDir::new().unwrap();
        let sample = dir.path().join("sample_tests.bin");
        let unknown = dir.path().join("unknown_tests.bin");
        fs::write(&sample, "").unwrap();
        fs::write(&unknown, "").unwrap();

        let (listings, skipped) = resolved(&demo::registry(), &[sample.clone(), unknown.clone()]);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].location, Some(sample));
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0, unknown);
    }

    #[test]
    fn test_listing_json_shape() {
        let listings = registered(&demo::registry());
        let json = listings[0].to_json();
        assert_eq!(json["module"], demo::BROKEN_MODULE);
        assert_eq!(json["location"], serde_json::Value::Null);
        assert_eq!(json["suites"][0]["name"], "LedgerTests");
        assert_eq!(json["suites"][0]["tests"][1], "Overdraws");
    }
}
