use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use rusqlite::{params_from_iter, Connection, Transaction};
use thiserror::Error;
use tracing::{debug, info};

use super::options::ImportOptions;
use crate::coerce::{coerce, CoerceError, SqlValue};
use crate::schema::{quote_ident, table_columns, ColumnDescriptor, SchemaError};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{file}: first row must contain column names")]
    EmptyHeader { file: String },
    #[error("resetting autonumbered primary keys is not supported")]
    ResetAutonumberUnsupported,
    #[error("{file}: table {table} has no column named {column}")]
    UnknownColumn {
        file: String,
        table: String,
        column: String,
    },
    #[error("{file}:{line}: expected {expected} fields, found {actual}")]
    FieldCount {
        file: String,
        line: u64,
        expected: usize,
        actual: usize,
    },
    #[error("{file}:{line}: column {column}: {source}")]
    Cell {
        file: String,
        line: u64,
        column: String,
        #[source]
        source: CoerceError,
    },
    #[error("{file}:{line}: insert failed: {source}")]
    Insert {
        file: String,
        line: u64,
        #[source]
        source: rusqlite::Error,
    },
    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to open {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// One bound header position: where the cell sits in each record and which
/// target column receives it.
struct Binding<'a> {
    position: usize,
    column: &'a ColumnDescriptor,
}

/// Import CSV rows from `reader` into `table`, returning the number of rows
/// inserted. Processing stops at the first error; there is no
/// continue-on-error mode. `file_label` is used for error attribution only.
pub fn import_csv<R: Read>(
    conn: &Connection,
    table: &str,
    reader: R,
    file_label: &str,
    options: &ImportOptions,
) -> Result<u64, ImportError> {
    if options.reset_autonumber {
        return Err(ImportError::ResetAutonumberUnsupported);
    }

    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|source| ImportError::Csv {
            file: file_label.to_string(),
            source,
        })?
        .clone();
    if headers.is_empty() || headers.iter().all(|name| name.trim().is_empty()) {
        return Err(ImportError::EmptyHeader {
            file: file_label.to_string(),
        });
    }

    let columns = table_columns(conn, table)?;
    let by_name: HashMap<String, &ColumnDescriptor> = columns
        .iter()
        .map(|column| (column.name.to_ascii_lowercase(), column))
        .collect();

    let mut bindings = Vec::new();
    for (position, header) in headers.iter().enumerate() {
        let name = header.trim();
        let target = options
            .renames
            .get(name)
            .map(String::as_str)
            .unwrap_or(name);
        if options.ignored_columns.contains(target) {
            continue;
        }
        let column =
            by_name
                .get(&target.to_ascii_lowercase())
                .ok_or_else(|| ImportError::UnknownColumn {
                    file: file_label.to_string(),
                    table: table.to_string(),
                    column: target.to_string(),
                })?;
        bindings.push(Binding { position, column });
    }

    let insert_sql = build_insert_sql(table, &bindings);
    debug!(table, sql = %insert_sql, "prepared bulk insert");
    let mut stmt = conn.prepare(&insert_sql)?;

    let coerce_options = options.coerce_options();
    let interval = options.commit_interval;
    let mut tx: Option<Transaction<'_>> = if interval > 0 {
        Some(conn.unchecked_transaction()?)
    } else {
        None
    };

    let mut imported = 0_u64;
    let mut since_commit = 0_usize;
    let expected = headers.len();

    for (index, record) in csv_reader.records().enumerate() {
        // Header is conceptually line 1, so the first data row is line 2.
        let line = index as u64 + 2;
        let record = record.map_err(|source| ImportError::Csv {
            file: file_label.to_string(),
            source,
        })?;
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        if record.len() != expected {
            return Err(ImportError::FieldCount {
                file: file_label.to_string(),
                line,
                expected,
                actual: record.len(),
            });
        }

        // Coerce the whole row before binding anything; a bad cell must
        // never leave a partially bound statement behind.
        let mut params: Vec<SqlValue> = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            let cell = &record[binding.position];
            let raw = options
                .overrides
                .get(&binding.column.name)
                .map(String::as_str)
                .unwrap_or(cell);
            let value =
                coerce(binding.column, raw, &coerce_options).map_err(|source| ImportError::Cell {
                    file: file_label.to_string(),
                    line,
                    column: binding.column.name.clone(),
                    source,
                })?;
            params.push(value);
        }

        stmt.execute(params_from_iter(params.iter()))
            .map_err(|source| ImportError::Insert {
                file: file_label.to_string(),
                line,
                source,
            })?;
        imported += 1;

        if interval > 0 {
            since_commit += 1;
            if since_commit >= interval {
                if let Some(active) = tx.take() {
                    active.commit()?;
                }
                debug!(table, rows = imported, "intermediate commit");
                tx = Some(conn.unchecked_transaction()?);
                since_commit = 0;
            }
        }
    }

    if let Some(active) = tx.take() {
        active.commit()?;
    }

    info!(file = file_label, table, rows = imported, "import complete");
    Ok(imported)
}

/// Convenience wrapper opening `path` and labelling errors with its file name.
pub fn import_csv_path(
    conn: &Connection,
    table: &str,
    path: &Path,
    options: &ImportOptions,
) -> Result<u64, ImportError> {
    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = File::open(path).map_err(|source| ImportError::Io {
        file: label.clone(),
        source,
    })?;
    import_csv(conn, table, file, &label, options)
}

fn build_insert_sql(table: &str, bindings: &[Binding<'_>]) -> String {
    let placeholders: Vec<String> = (1..=bindings.len()).map(|idx| format!("?{idx}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        bindings
            .iter()
            .map(|binding| quote_ident(&binding.column.name))
            .collect::<Vec<_>>()
            .join(", "),
        placeholders.join(", "),
    )
}
