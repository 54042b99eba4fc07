//! Integration tests for schema files and the catalog

use std::fs;

use heapdb::catalog::Catalog;
use heapdb::{DataType, DbError};
use tempfile::TempDir;

#[test]
fn test_load_schema_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schema.txt");
    fs::write(
        &path,
        "users (id int pk, name string, active bool)\n\norders (id int pk, user_id int, total bigint)\n",
    )
    .unwrap();

    let catalog = Catalog::new();
    let loaded = catalog.load_schema(&path, 4096).unwrap();
    assert_eq!(loaded.len(), 2);

    let users = catalog.table_id("users").unwrap();
    let orders = catalog.table_id("orders").unwrap();
    assert_eq!(loaded, vec![users, orders]);
    assert_ne!(users, orders);

    let schema = catalog.schema(users).unwrap();
    assert_eq!(schema.column_count(), 3);
    assert_eq!(schema.column(1).unwrap().name(), "name");
    assert_eq!(*schema.column(1).unwrap().data_type(), DataType::Char(128));
    assert_eq!(*schema.column(2).unwrap().data_type(), DataType::Boolean);

    assert_eq!(catalog.primary_key(users).unwrap(), "id");
    assert_eq!(catalog.table_name(orders).unwrap(), "orders");
    assert_eq!(catalog.table_ids(), vec![orders, users]);

    // Backing files sit next to the schema file
    assert!(dir.path().join("users.dat").exists());
    assert!(dir.path().join("orders.dat").exists());
}

#[test]
fn test_reload_replaces_tables_by_name() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schema.txt");
    fs::write(&path, "t (a int)\n").unwrap();

    let catalog = Catalog::new();
    let first = catalog.load_schema(&path, 4096).unwrap();
    let second = catalog.load_schema(&path, 4096).unwrap();
    assert_eq!(first, second);
    assert_eq!(catalog.table_ids().len(), 1);
    assert_eq!(catalog.primary_key(first[0]).unwrap(), "");
}

#[test]
fn test_bad_line_reports_line_number() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schema.txt");
    fs::write(&path, "good (a int)\nbad (a float)\n").unwrap();

    let catalog = Catalog::new();
    let err = catalog.load_schema(&path, 4096).unwrap_err();
    assert!(matches!(err, DbError::InvalidSchemaFile { line: 2, .. }));
}

#[test]
fn test_unknown_tables() {
    let catalog = Catalog::new();
    assert!(matches!(
        catalog.table_id("nope"),
        Err(DbError::TableNameNotFound(_))
    ));
    assert!(matches!(
        catalog.file(heapdb::TableId::new(42)),
        Err(DbError::TableNotFound(_))
    ));
}

#[test]
fn test_missing_schema_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let catalog = Catalog::new();
    let err = catalog
        .load_schema(dir.path().join("missing.txt"), 4096)
        .unwrap_err();
    assert!(matches!(err, DbError::Io(_)));
}
