//! CLI integration tests
//!
//! These tests run the `aggrel` binary against descriptor files and SQLite
//! databases in a temp directory.

use aggrel_core::{AggregateDescriptor, Record, SchemaCompiler};
use aggrel_store::{DynamicRepository, SqliteConnection, StoreConfig, TransactionalRepository};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

const PLAYER_TOML: &str = r#"
type_name = "Player"

[[fields]]
name = "id"
kind = { primitive = "uuid" }

[[fields]]
name = "displayName"
kind = { primitive = "text" }

[[fields]]
name = "scores"
kind = { list = { kind = { primitive = "int" } } }

[[fields]]
name = "badges"
kind = { set = { kind = { primitive = "text" } } }
"#;

fn write_descriptor(temp_dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = temp_dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn run(temp_dir: &TempDir, args: &[&str]) -> Output {
    let cli_bin = env!("CARGO_BIN_EXE_aggrel");
    Command::new(cli_bin)
        .current_dir(temp_dir.path())
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn seed_player(descriptor: &Path, db: &Path) -> Uuid {
    let text = fs::read_to_string(descriptor).unwrap();
    let descriptor: AggregateDescriptor = toml::from_str(&text).unwrap();
    let schema = SchemaCompiler::compile(&descriptor).unwrap();
    let conn = SqliteConnection::from_config(StoreConfig::for_path(db)).unwrap();
    let repo: DynamicRepository<SqliteConnection> =
        TransactionalRepository::new(Arc::new(schema), conn);
    let id = Uuid::new_v4();
    repo.save_record(
        &Record::new()
            .with("id", id)
            .with("displayName", "ada")
            .with("scores", vec![30i64, 10, 20])
            .with("badges", BTreeSet::from(["gold".to_string()])),
    )
    .unwrap();
    id
}

#[test]
fn test_cli_schema_prints_layout_and_ddl() {
    // Scenario: schema command on a TOML descriptor
    // When: `aggrel schema player.toml`
    // Then: resource path, child tables and CREATE TABLE statements are printed
    let temp_dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(&temp_dir, "player.toml", PLAYER_TOML);

    let output = run(&temp_dir, &["schema", descriptor.to_str().unwrap()]);

    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("resource_path: /players"));
    assert!(out.contains("child table: player_scores (list of scores)"));
    assert!(out.contains("CREATE TABLE \"player\""));
    assert!(out.contains("CREATE TABLE \"player_badges\""));
}

#[test]
fn test_cli_schema_accepts_json_descriptor() {
    let temp_dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(
        &temp_dir,
        "tag.json",
        r#"{"type_name": "Category", "fields": [{"name": "id", "kind": {"primitive": "uuid"}}]}"#,
    );

    let output = run(&temp_dir, &["schema", "--ddl-only", descriptor.to_str().unwrap()]);

    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.starts_with("CREATE TABLE \"category\""));
    assert!(!out.contains("resource_path"));
}

#[test]
fn test_cli_schema_reports_rejection() {
    // Scenario: descriptor with a nested collection
    // Then: exit code 1 and the offending field in the error
    let temp_dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(
        &temp_dir,
        "matrix.toml",
        r#"
type_name = "Grid"

[[fields]]
name = "id"
kind = { primitive = "uuid" }

[[fields]]
name = "cells"
kind = { list = { kind = { collection = { kind = { primitive = "int" } } } } }
"#,
    );

    let output = run(&temp_dir, &["schema", descriptor.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.starts_with("Error: "));
    assert!(err.contains("Grid.cells"));
}

#[test]
fn test_cli_rejects_unknown_descriptor_extension() {
    let temp_dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(&temp_dir, "player.yaml", "type_name: Player");

    let output = run(&temp_dir, &["schema", descriptor.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unsupported descriptor format"));
}

#[test]
fn test_cli_bootstrap_then_unchanged() {
    // Scenario: bootstrap is idempotent
    // When: `aggrel bootstrap player.toml --db store.db` runs twice
    // Then: the first run creates tables, the second leaves them unchanged
    let temp_dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(&temp_dir, "player.toml", PLAYER_TOML);
    let db = temp_dir.path().join("store.db");
    let args = [
        "bootstrap",
        descriptor.to_str().unwrap(),
        "--db",
        db.to_str().unwrap(),
    ];

    let first = run(&temp_dir, &args);
    let second = run(&temp_dir, &args);

    assert!(first.status.success(), "Stderr: {}", stderr(&first));
    assert!(stdout(&first).contains("Tables created"));
    assert!(stdout(&first).contains("tables: 3"));
    assert!(second.status.success(), "Stderr: {}", stderr(&second));
    assert!(stdout(&second).contains("Tables unchanged"));
}

#[test]
fn test_cli_bootstrap_detects_drift() {
    let temp_dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(&temp_dir, "player.toml", PLAYER_TOML);
    let db = temp_dir.path().join("store.db");
    let first = run(
        &temp_dir,
        &["bootstrap", descriptor.to_str().unwrap(), "--db", db.to_str().unwrap()],
    );
    assert!(first.status.success(), "Stderr: {}", stderr(&first));

    let changed = format!(
        "{}\n[[fields]]\nname = \"level\"\nkind = {{ primitive = \"int\" }}\n",
        PLAYER_TOML
    );
    let changed = write_descriptor(&temp_dir, "player_v2.toml", &changed);
    let output = run(
        &temp_dir,
        &["bootstrap", changed.to_str().unwrap(), "--db", db.to_str().unwrap()],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("schema drift"));
}

#[test]
fn test_cli_bootstrap_requires_database() {
    let temp_dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(&temp_dir, "player.toml", PLAYER_TOML);

    let output = run(&temp_dir, &["bootstrap", descriptor.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("no database given"));
}

#[test]
fn test_cli_inspect_prints_record_and_child_rows() {
    // Scenario: inspect a saved aggregate
    // When: `aggrel inspect player.toml --config aggrel.toml --id <id>`
    // Then: the record is printed as JSON with list order preserved
    let temp_dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(&temp_dir, "player.toml", PLAYER_TOML);
    let db = temp_dir.path().join("store.db");
    let boot = run(
        &temp_dir,
        &["bootstrap", descriptor.to_str().unwrap(), "--db", db.to_str().unwrap()],
    );
    assert!(boot.status.success(), "Stderr: {}", stderr(&boot));
    let id = seed_player(&descriptor, &db);
    let config = write_descriptor(
        &temp_dir,
        "aggrel.toml",
        &format!(
            "database_path = {:?}\nlog_profile = \"test\"\n",
            db.to_string_lossy()
        ),
    );

    let output = run(
        &temp_dir,
        &[
            "inspect",
            descriptor.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--id",
            &id.to_string(),
        ],
    );

    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["aggregate"], "Player");
    assert_eq!(json["record"]["displayName"], "ada");
    assert_eq!(json["record"]["scores"], serde_json::json!([30, 10, 20]));
    assert_eq!(json["record"]["badges"], serde_json::json!(["gold"]));
    assert_eq!(json["child_rows"]["player_scores"], 3);
    assert_eq!(json["child_rows"]["player_badges"], 1);
}

#[test]
fn test_cli_inspect_unknown_id_fails() {
    let temp_dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(&temp_dir, "player.toml", PLAYER_TOML);
    let db = temp_dir.path().join("store.db");
    let boot = run(
        &temp_dir,
        &["bootstrap", descriptor.to_str().unwrap(), "--db", db.to_str().unwrap()],
    );
    assert!(boot.status.success(), "Stderr: {}", stderr(&boot));

    let output = run(
        &temp_dir,
        &[
            "inspect",
            descriptor.to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "--id",
            &Uuid::new_v4().to_string(),
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error: "));
    assert!(stderr(&output).contains("ERR_NOT_FOUND") || stderr(&output).contains("not found"));
}
