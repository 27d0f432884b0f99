use std::fs;
use std::path::Path;

use csvbridge::{import_directory, ExecutionError, ImportError, ImportOptions, TableMapping, ValidationError};
use rusqlite::Connection;
use tempfile::TempDir;

fn setup_schema() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE customers (id INTEGER, name VARCHAR(40));
         CREATE TABLE orders (id INTEGER, customer_id INTEGER, total DECIMAL(10,2));
         CREATE TABLE payments (id INTEGER, order_id INTEGER, amount DECIMAL(10,2));",
    )
    .unwrap();
    conn
}

fn mapping() -> TableMapping {
    TableMapping::new([
        ("customers.csv", "customers"),
        ("orders.csv", "orders"),
        ("payments.csv", "payments"),
    ])
}

fn write_valid_files(dir: &Path) {
    fs::write(dir.join("customers.csv"), "id,name\n1,Acme\n2,Globex\n").unwrap();
    fs::write(
        dir.join("orders.csv"),
        "id,customer_id,total\n10,1,99.50\n11,2,12\n",
    )
    .unwrap();
    fs::write(dir.join("payments.csv"), "id,order_id,amount\n100,10,99.50\n").unwrap();
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn imports_all_files_and_reports_per_file_counts() {
    let conn = setup_schema();
    let dir = TempDir::new().unwrap();
    write_valid_files(dir.path());

    let report = import_directory(&conn, dir.path(), &mapping(), &ImportOptions::default()).unwrap();
    assert_eq!(report.tables.get("customers.csv"), Some(&2));
    assert_eq!(report.tables.get("orders.csv"), Some(&2));
    assert_eq!(report.tables.get("payments.csv"), Some(&1));
    assert_eq!(report.total_rows(), 5);
    assert_eq!(count(&conn, "customers"), 2);
}

#[test]
fn missing_file_is_fatal_before_any_database_work() {
    let conn = setup_schema();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("customers.csv"), "id,name\n1,Acme\n").unwrap();
    fs::write(dir.path().join("orders.csv"), "id,customer_id,total\n10,1,5\n").unwrap();

    let err =
        import_directory(&conn, dir.path(), &mapping(), &ImportOptions::default()).unwrap_err();
    match &err {
        ExecutionError::Validation(ValidationError::FileSetMismatch { missing, expected, .. }) => {
            assert_eq!(missing, "payments.csv");
            assert_eq!(expected, "customers.csv, orders.csv, payments.csv");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count(&conn, "customers"), 0);
    assert_eq!(count(&conn, "orders"), 0);
}

#[test]
fn unexpected_extra_file_is_fatal() {
    let conn = setup_schema();
    let dir = TempDir::new().unwrap();
    write_valid_files(dir.path());
    fs::write(dir.path().join("stray.csv"), "x\n1\n").unwrap();

    let err =
        import_directory(&conn, dir.path(), &mapping(), &ImportOptions::default()).unwrap_err();
    assert!(err.to_string().contains("unexpected [stray.csv]"));
    assert_eq!(count(&conn, "customers"), 0);
}

#[test]
fn failure_in_second_file_rolls_back_everything() {
    let conn = setup_schema();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("customers.csv"), "id,name\n1,Acme\n2,Globex\n").unwrap();
    // Last row of the second file is malformed.
    fs::write(
        dir.path().join("orders.csv"),
        "id,customer_id,total\n10,1,99.50\n11,2,not-a-number\n",
    )
    .unwrap();
    fs::write(dir.path().join("payments.csv"), "id,order_id,amount\n100,10,99.50\n").unwrap();

    let err =
        import_directory(&conn, dir.path(), &mapping(), &ImportOptions::default()).unwrap_err();
    match &err {
        ExecutionError::File { file, source } => {
            assert_eq!(file, "orders.csv");
            assert!(matches!(source, ImportError::Cell { line: 3, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count(&conn, "customers"), 0);
    assert_eq!(count(&conn, "orders"), 0);
    assert_eq!(count(&conn, "payments"), 0);
}

#[test]
fn inner_commit_interval_is_overridden_by_the_outer_transaction() {
    let conn = setup_schema();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("customers.csv"), "id,name\n1,Acme\n2,Globex\n").unwrap();
    fs::write(
        dir.path().join("orders.csv"),
        "id,customer_id,total\n10,1,99.50\n11,2,oops\n",
    )
    .unwrap();
    fs::write(dir.path().join("payments.csv"), "id,order_id,amount\n100,10,99.50\n").unwrap();

    // Even with a tiny commit interval configured, the orchestrator forces
    // a single transaction: nothing survives the failure.
    let options = ImportOptions {
        commit_interval: 1,
        ..Default::default()
    };
    import_directory(&conn, dir.path(), &mapping(), &options).unwrap_err();
    assert_eq!(count(&conn, "customers"), 0);
    assert_eq!(count(&conn, "orders"), 0);
}
