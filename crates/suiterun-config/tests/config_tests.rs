//! Layered configuration: global < project < environment

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use suiterun_config::loader::{ENV_MODULE_SUFFIX, ENV_QUIET, ENV_RESULTS_DIR};
use suiterun_config::{ConfigError, ConfigLoader};
use tempfile::TempDir;

struct Layout {
    _temp: TempDir,
    global: PathBuf,
    project: PathBuf,
}

fn layout(global: Option<&str>, project: Option<&str>) -> Layout {
    let temp = TempDir::new().unwrap();
    let global_path = temp.path().join("home/.suiterun/config.toml");
    if let Some(content) = global {
        fs::create_dir_all(global_path.parent().unwrap()).unwrap();
        fs::write(&global_path, content).unwrap();
    }

    let project_path = temp.path().join("work/project");
    fs::create_dir_all(project_path.join("nested/deeper")).unwrap();
    if let Some(content) = project {
        fs::write(project_path.join("suiterun.toml"), content).unwrap();
    }

    Layout {
        _temp: temp,
        global: global_path,
        project: project_path,
    }
}

fn load(layout: &Layout, start: &Path) -> Result<suiterun_config::Config, ConfigError> {
    ConfigLoader::new()
        .with_global_config_path(&layout.global)
        .load_from_directory(start)
}

#[test]
#[serial]
fn test_global_defaults_apply_without_project() {
    let layout = layout(
        Some(
            r#"
[defaults]
parallelism = 6
quiet = true
color = false
"#,
        ),
        None,
    );

    let config = load(&layout, &layout.project).unwrap();

    assert_eq!(config.parallelism(), 6);
    assert!(config.quiet());
    assert!(!config.color());
    assert!(!config.is_project());
}

#[test]
#[serial]
fn test_project_overrides_global() {
    let layout = layout(
        Some(
            r#"
[defaults]
parallelism = 6
quiet = true
"#,
        ),
        Some(
            r#"
[run]
parallelism = 2
module_suffix = "_spec"
paths = ["target/debug", "/opt/modules"]
report = "results/run.trx"
"#,
        ),
    );

    let config = load(&layout, &layout.project.join("nested/deeper")).unwrap();

    assert_eq!(config.parallelism(), 2);
    assert!(config.quiet());
    assert_eq!(config.module_suffix(), "_spec");
    assert_eq!(
        config.module_paths(),
        vec![
            layout.project.join("target/debug"),
            PathBuf::from("/opt/modules")
        ]
    );
    assert_eq!(
        config.report(),
        Some(layout.project.join("results/run.trx"))
    );
}

#[test]
#[serial]
fn test_environment_overrides_project() {
    let layout = layout(
        None,
        Some(
            r#"
[run]
quiet = false
results_dir = "from-file"
module_suffix = "_spec"
"#,
        ),
    );

    env::set_var(ENV_QUIET, "yes");
    env::set_var(ENV_RESULTS_DIR, "/tmp/suiterun-results");
    env::set_var(ENV_MODULE_SUFFIX, "tests");
    let config = load(&layout, &layout.project);
    env::remove_var(ENV_QUIET);
    env::remove_var(ENV_RESULTS_DIR);
    env::remove_var(ENV_MODULE_SUFFIX);

    let config = config.unwrap();
    assert!(config.quiet());
    assert_eq!(
        config.results_dir(),
        Some(PathBuf::from("/tmp/suiterun-results"))
    );
    assert_eq!(config.module_suffix(), "tests");
}

#[test]
#[serial]
fn test_invalid_project_file_is_reported() {
    let layout = layout(
        None,
        Some(
            r#"
[run]
parallelism = "four"
"#,
        ),
    );

    let err = load(&layout, &layout.project).unwrap_err();
    assert!(matches!(err, ConfigError::TomlParseError { .. }));
    assert!(err.to_string().contains("suiterun.toml"));
}

#[test]
#[serial]
fn test_invalid_global_file_is_reported() {
    let layout = layout(
        Some(
            r#"
[defaults]
parallelism = 0
"#,
        ),
        None,
    );

    let err = load(&layout, &layout.project).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid value for 'defaults.parallelism': must be between 1 and 1024, got 0"
    );
}

#[test]
#[serial]
fn test_missing_specific_file() {
    let layout = layout(None, None);
    let err = ConfigLoader::new()
        .with_global_config_path(&layout.global)
        .load_from_file(&layout.project.join("suiterun.toml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}
