//! Bulk bidirectional transfer engine between CSV files and SQL tables.
//!
//! Imports coerce each cell against the target table's live column metadata
//! and run parameterized inserts under transactional control; exports apply
//! the inverse formatting rules so values round-trip. A directory or zip
//! archive of files imports atomically: every file commits, or none do.

pub mod coerce;
pub mod export;
pub mod import;
pub mod schema;

pub use coerce::{coerce, CoerceError, CoerceOptions, SqlValue};
pub use export::{export_csv, export_csv_path, ExportError, ExportOptions};
pub use import::{
    import_archive, import_csv, import_csv_path, import_directory, validate_directory,
    ArchiveError, BundleReport, ExecutionError, ImportError, ImportOptions, MappingEntry,
    TableMapping, ValidationError,
};
pub use schema::{table_columns, ColumnDescriptor, SchemaError, SqlType};
