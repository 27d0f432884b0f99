use std::collections::{HashMap, HashSet};

use csvbridge::{import_csv, ImportError, ImportOptions};
use rusqlite::Connection;

fn setup_orders() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE orders (
            id INTEGER NOT NULL,
            customer VARCHAR(40),
            total DECIMAL(10,2),
            placed_on DATE,
            rush BOOLEAN
        )",
    )
    .unwrap();
    conn
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn imports_all_rows() {
    let conn = setup_orders();
    let csv = "id,customer,total,placed_on,rush\n\
               1,Acme,\"1,234.50\",2024.03.07,Y\n\
               2,Globex,(45.00),2024-03-08,n\n";
    let rows = import_csv(
        &conn,
        "orders",
        csv.as_bytes(),
        "orders.csv",
        &ImportOptions::default(),
    )
    .unwrap();
    assert_eq!(rows, 2);

    let (total, placed, rush): (f64, String, i64) = conn
        .query_row(
            "SELECT total, placed_on, rush FROM orders WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(total, 1234.5);
    assert_eq!(placed, "2024-03-07");
    assert_eq!(rush, 1);

    let second: f64 = conn
        .query_row("SELECT total FROM orders WHERE id = 2", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(second, -45.0);
}

#[test]
fn empty_header_fails_immediately() {
    let conn = setup_orders();
    let err = import_csv(
        &conn,
        "orders",
        &b""[..],
        "orders.csv",
        &ImportOptions::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("first row must contain column names"));

    let err = import_csv(
        &conn,
        "orders",
        &b" , \n1,2\n"[..],
        "orders.csv",
        &ImportOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ImportError::EmptyHeader { .. }));
}

#[test]
fn blank_rows_are_skipped_not_counted() {
    let conn = setup_orders();
    let csv = "id,customer,total,placed_on,rush\n\
               1,Acme,10,2024-01-01,1\n\
               \n\
               2,Globex,20,2024-01-02,0\n";
    let rows = import_csv(
        &conn,
        "orders",
        csv.as_bytes(),
        "orders.csv",
        &ImportOptions::default(),
    )
    .unwrap();
    assert_eq!(rows, 2);
}

#[test]
fn field_count_mismatch_names_both_counts_and_line() {
    let conn = setup_orders();
    let csv = "id,customer,total,placed_on,rush\n\
               1,Acme,10,2024-01-01,1\n\
               2,Globex,20\n";
    let err = import_csv(
        &conn,
        "orders",
        csv.as_bytes(),
        "orders.csv",
        &ImportOptions::default(),
    )
    .unwrap_err();
    match err {
        ImportError::FieldCount {
            file,
            line,
            expected,
            actual,
        } => {
            assert_eq!(file, "orders.csv");
            assert_eq!(line, 3);
            assert_eq!(expected, 5);
            assert_eq!(actual, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn coercion_failure_is_tagged_with_line_and_column() {
    let conn = setup_orders();
    let csv = "id,customer,total,placed_on,rush\n\
               1,Acme,10,2024-01-01,1\n\
               2,Globex,not-a-number,2024-01-02,0\n";
    let err = import_csv(
        &conn,
        "orders",
        csv.as_bytes(),
        "orders.csv",
        &ImportOptions::default(),
    )
    .unwrap_err();
    match err {
        ImportError::Cell { line, column, .. } => {
            assert_eq!(line, 3);
            assert_eq!(column, "total");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_header_column_fails_before_any_row() {
    let conn = setup_orders();
    let csv = "id,mystery\n1,x\n";
    let err = import_csv(
        &conn,
        "orders",
        csv.as_bytes(),
        "orders.csv",
        &ImportOptions::default(),
    )
    .unwrap_err();
    match err {
        ImportError::UnknownColumn { table, column, .. } => {
            assert_eq!(table, "orders");
            assert_eq!(column, "mystery");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count(&conn, "orders"), 0);
}

#[test]
fn renames_ignores_and_overrides_apply() {
    let conn = setup_orders();
    let csv = "order_no,customer,total,placed_on,comment\n\
               7,Acme,10,2024-01-01,ignore me\n";
    let options = ImportOptions {
        renames: HashMap::from([("order_no".to_string(), "id".to_string())]),
        ignored_columns: HashSet::from(["comment".to_string()]),
        overrides: HashMap::from([("customer".to_string(), "Override Inc".to_string())]),
        ..Default::default()
    };
    let rows = import_csv(&conn, "orders", csv.as_bytes(), "orders.csv", &options).unwrap();
    assert_eq!(rows, 1);

    let (id, customer): (i64, String) = conn
        .query_row("SELECT id, customer FROM orders", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(id, 7);
    assert_eq!(customer, "Override Inc");
}

#[test]
fn commit_interval_keeps_completed_batches() {
    let conn = setup_orders();
    let csv = "id,customer,total,placed_on,rush\n\
               1,Acme,10,2024-01-01,1\n\
               2,Globex,20,2024-01-02,0\n\
               3,Initech,broken,2024-01-03,1\n";
    let options = ImportOptions {
        commit_interval: 2,
        ..Default::default()
    };
    let err = import_csv(&conn, "orders", csv.as_bytes(), "orders.csv", &options).unwrap_err();
    assert!(matches!(err, ImportError::Cell { line: 4, .. }));
    // The first batch of two committed before the bad row arrived.
    assert_eq!(count(&conn, "orders"), 2);
}

#[test]
fn zero_interval_leaves_the_transaction_to_the_caller() {
    let conn = setup_orders();
    let csv = "id,customer,total,placed_on,rush\n1,Acme,10,2024-01-01,1\n";
    {
        let tx = conn.unchecked_transaction().unwrap();
        let rows = import_csv(
            &conn,
            "orders",
            csv.as_bytes(),
            "orders.csv",
            &ImportOptions::default(),
        )
        .unwrap();
        assert_eq!(rows, 1);
        drop(tx); // rollback
    }
    assert_eq!(count(&conn, "orders"), 0);
}

#[test]
fn reset_autonumber_is_rejected_loudly() {
    let conn = setup_orders();
    let options = ImportOptions {
        reset_autonumber: true,
        ..Default::default()
    };
    let err = import_csv(
        &conn,
        "orders",
        &b"id\n1\n"[..],
        "orders.csv",
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, ImportError::ResetAutonumberUnsupported));
}
