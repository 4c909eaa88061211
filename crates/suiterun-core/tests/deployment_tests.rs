//! Deployment staging against a real filesystem

use std::fs;
use std::path::Path;
use suiterun_core::{DeploymentItem, DeploymentManifest, DeploymentMapping};
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn test_stage_copies_into_nested_directories() {
    let temp = TempDir::new().unwrap();
    let module = temp.path().join("app/target/release/app_tests");
    write(&temp.path().join("app/fixtures/users.json"), "[]");
    write(&temp.path().join("app/schema.sql"), "create table t;");

    let out = temp.path().join("results");
    let mut manifest = DeploymentManifest::new();
    manifest.resolve(
        "UserTests",
        &[
            DeploymentItem::new("fixtures/users.json").to("data/json"),
            DeploymentItem::new("schema.sql"),
        ],
        &module,
        &out,
    );

    let report = manifest.stage();

    assert_eq!(report.copied.len(), 2);
    assert_eq!(report.skipped(), 0);
    assert_eq!(
        fs::read_to_string(out.join("data/json/users.json")).unwrap(),
        "[]"
    );
    assert_eq!(
        fs::read_to_string(out.join("schema.sql")).unwrap(),
        "create table t;"
    );
}

#[test]
fn test_same_file_name_collides_and_first_wins() {
    let temp = TempDir::new().unwrap();
    let module = temp.path().join("app/bin/app_tests");
    write(&temp.path().join("app/one/settings.toml"), "one");
    write(&temp.path().join("app/two/settings.toml"), "two");

    let out = temp.path().join("results");
    let mut manifest = DeploymentManifest::new();
    manifest.resolve(
        "FirstTests",
        &[DeploymentItem::new("one/settings.toml")],
        &module,
        &out,
    );
    manifest.resolve(
        "SecondTests",
        &[DeploymentItem::new("two/settings.toml")],
        &module,
        &out,
    );
    assert_eq!(manifest.len(), 2);

    let report = manifest.stage();

    assert_eq!(report.copied, vec![out.join("settings.toml")]);
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].suite, "SecondTests");
    assert_eq!(
        fs::read_to_string(out.join("settings.toml")).unwrap(),
        "one"
    );
}

#[test]
fn test_restaging_replaces_files_from_a_previous_run() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("results");
    write(&temp.path().join("seed.txt"), "v1");

    let mut manifest = DeploymentManifest::new();
    manifest.insert(DeploymentMapping {
        source: temp.path().join("seed.txt"),
        destination: out.join("seed.txt"),
        suite: "SeedTests".to_string(),
    });

    let first = manifest.stage();
    assert_eq!(first.copied.len(), 1);
    assert_eq!(fs::read_to_string(out.join("seed.txt")).unwrap(), "v1");

    write(&temp.path().join("seed.txt"), "v2");
    let second = manifest.stage();

    assert_eq!(second.copied, vec![out.join("seed.txt")]);
    assert!(second.collisions.is_empty());
    assert_eq!(fs::read_to_string(out.join("seed.txt")).unwrap(), "v2");
}

#[test]
fn test_missing_source_is_skipped() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("results");
    write(&temp.path().join("present.txt"), "ok");

    let mut manifest = DeploymentManifest::new();
    manifest.resolve(
        "MixedTests",
        &[
            DeploymentItem::new("absent.txt"),
            DeploymentItem::new("present.txt"),
        ],
        &temp.path().join("mixed_tests"),
        &out,
    );

    let report = manifest.stage();

    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].source, temp.path().join("absent.txt"));
    assert_eq!(report.copied, vec![out.join("present.txt")]);
}

#[test]
fn test_absolute_items_are_used_as_is() {
    let temp = TempDir::new().unwrap();
    let elsewhere = temp.path().join("elsewhere/blob.bin");
    write(&elsewhere, "bytes");

    let out = temp.path().join("results");
    let mut manifest = DeploymentManifest::new();
    manifest.resolve(
        "BlobTests",
        &[DeploymentItem::new(&elsewhere)],
        &temp.path().join("app/target/debug/blob_tests"),
        &out,
    );

    assert_eq!(manifest.entries()[0].source, elsewhere);
    let report = manifest.stage();
    assert_eq!(report.copied, vec![out.join("blob.bin")]);
}
