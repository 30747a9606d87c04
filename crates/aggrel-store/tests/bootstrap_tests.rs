#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use aggrel_core::{Aggregate, FieldDescriptor, PrimitiveType, RepoErrorKind, SchemaCompiler};
use aggrel_store::{
    BootstrapOutcome, DynamicRepository, SqliteConnection, StoreConfig, TransactionalRepository,
};
use common::{sample_order, Order};
use std::path::Path;
use std::sync::Arc;

fn open_order_repo(path: &Path) -> TransactionalRepository<Order, SqliteConnection> {
    let schema = SchemaCompiler::compile(&Order::descriptor()).unwrap();
    let conn = SqliteConnection::from_config(StoreConfig::for_path(path)).unwrap();
    TransactionalRepository::new(Arc::new(schema), conn)
}

#[test]
fn test_bootstrap_creates_then_is_unchanged() {
    // GIVEN an empty database file
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    // WHEN bootstrapping twice through separate connections
    let first = open_order_repo(&path).bootstrap().unwrap();
    let repo = open_order_repo(&path);
    let second = repo.bootstrap().unwrap();

    // THEN tables are created once and the second run is a no-op
    assert_eq!(first, BootstrapOutcome::Created);
    assert_eq!(second, BootstrapOutcome::Unchanged);
    let order = sample_order();
    aggrel_store::Repository::save(&repo, &order).unwrap();
    assert_eq!(aggrel_store::Repository::get_by_id(&repo, order.id).unwrap(), order);
}

#[test]
fn test_bootstrap_reports_drift() {
    // GIVEN a database bootstrapped from the Order descriptor
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    open_order_repo(&path).bootstrap().unwrap();

    // WHEN bootstrapping with a changed Order descriptor
    let changed = Order::descriptor()
        .field(FieldDescriptor::primitive("note", PrimitiveType::Text).nullable());
    let schema = SchemaCompiler::compile(&changed).unwrap();
    let conn = SqliteConnection::from_config(StoreConfig::for_path(&path)).unwrap();
    let repo: DynamicRepository<SqliteConnection> =
        TransactionalRepository::new(Arc::new(schema), conn);
    let err = repo.bootstrap().unwrap_err();

    // THEN drift is reported and nothing is migrated
    assert_eq!(err.kind(), RepoErrorKind::Unknown);
    assert!(err.message().contains("schema drift"));
    assert_eq!(err.aggregate(), Some("Order"));
}

#[test]
fn test_create_tables_twice_fails() {
    let repo = common::setup_test_db();
    let err = repo.create_tables().unwrap_err();
    assert_eq!(err.op(), Some("create_tables"));
}

#[test]
fn test_bootstrap_in_memory() {
    let schema = SchemaCompiler::compile(&Order::descriptor()).unwrap();
    let repo: TransactionalRepository<Order, _> = TransactionalRepository::new(
        Arc::new(schema),
        SqliteConnection::open_in_memory().unwrap(),
    );
    assert_eq!(repo.bootstrap().unwrap(), BootstrapOutcome::Created);
    assert_eq!(repo.bootstrap().unwrap(), BootstrapOutcome::Unchanged);
}
