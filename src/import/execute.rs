use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;
use tracing::{info, warn};

use super::bundle::TableMapping;
use super::options::ImportOptions;
use super::rows::{import_csv_path, ImportError};
use super::validator::{validate_directory, ValidationError};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{file}: {source}")]
    File {
        file: String,
        #[source]
        source: ImportError,
    },
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Per-file row counts for a completed multi-file import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleReport {
    pub tables: BTreeMap<String, u64>,
}

impl BundleReport {
    pub fn total_rows(&self) -> u64 {
        self.tables.values().sum()
    }
}

/// Import every file named by `mapping` from `dir` inside one transaction.
///
/// Validation runs before the transaction opens. Each file is imported with
/// the commit interval forced to 0 so the single outer transaction owns the
/// boundary: either every file commits, or none do.
pub fn import_directory(
    conn: &Connection,
    dir: &Path,
    mapping: &TableMapping,
    options: &ImportOptions,
) -> Result<BundleReport, ExecutionError> {
    validate_directory(dir, mapping)?;

    let tx = conn.unchecked_transaction()?;
    let mut inner = options.clone();
    inner.commit_interval = 0;

    let mut tables = BTreeMap::new();
    for entry in mapping.entries() {
        let path = dir.join(&entry.file_name);
        info!(file = %entry.file_name, table = %entry.table, "importing file");
        let rows = import_csv_path(conn, &entry.table, &path, &inner).map_err(|source| {
            warn!(file = %entry.file_name, error = %source, "import failed; rolling back");
            ExecutionError::File {
                file: entry.file_name.clone(),
                source,
            }
        })?;
        tables.insert(entry.file_name.clone(), rows);
    }

    tx.commit()?;
    info!(files = mapping.len(), "bundle import committed");
    Ok(BundleReport { tables })
}
