use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

use crate::schema::quote_ident;

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Per-call export configuration.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Explicit SQL text; takes precedence over the table name.
    pub query: Option<String>,
    /// Optional condition appended as `WHERE ...` to the default query.
    pub where_clause: Option<String>,
    /// Substituted for true empty strings so a later import can round-trip
    /// the empty-string/NULL distinction. NULL is always a bare empty field.
    pub empty_string_sentinel: Option<String>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("column {column} holds a BLOB value, which cannot be rendered as CSV")]
    UnsupportedValue { column: String },
}

/// Stream a query's result rows to `out` as CSV, returning the number of
/// rows written. Without an explicit query the SQL is
/// `SELECT * FROM table [WHERE condition]`.
pub fn export_csv<W: Write>(
    conn: &Connection,
    table: &str,
    out: W,
    options: &ExportOptions,
) -> Result<u64, ExportError> {
    let sql = match &options.query {
        Some(query) => query.clone(),
        None => match &options.where_clause {
            Some(condition) => format!("SELECT * FROM {} WHERE {}", quote_ident(table), condition),
            None => format!("SELECT * FROM {}", quote_ident(table)),
        },
    };

    let mut stmt = conn.prepare(&sql)?;
    let names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut out = BufWriter::new(out);
    let header: Vec<String> = names.iter().map(|name| format_field(name, None)).collect();
    write!(out, "{}{}", header.join(","), LINE_ENDING)?;

    let sentinel = options.empty_string_sentinel.as_deref();
    let mut rows = stmt.query([])?;
    let mut exported = 0_u64;
    while let Some(row) = rows.next()? {
        let mut fields = Vec::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            let value = row.get_ref(index)?;
            fields.push(render_value(value, name, sentinel)?);
        }
        write!(out, "{}{}", fields.join(","), LINE_ENDING)?;
        exported += 1;
    }
    out.flush()?;

    info!(table, rows = exported, "export complete");
    Ok(exported)
}

/// Convenience wrapper writing the export to a file at `path`.
pub fn export_csv_path(
    conn: &Connection,
    table: &str,
    path: &Path,
    options: &ExportOptions,
) -> Result<u64, ExportError> {
    let file = File::create(path)?;
    export_csv(conn, table, file, options)
}

fn render_value(
    value: ValueRef<'_>,
    column: &str,
    sentinel: Option<&str>,
) -> Result<String, ExportError> {
    match value {
        ValueRef::Null => Ok(String::new()),
        ValueRef::Integer(v) => Ok(v.to_string()),
        ValueRef::Real(v) => Ok(trim_fraction(&v.to_string())),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            Ok(format_field(&text, sentinel))
        }
        ValueRef::Blob(_) => Err(ExportError::UnsupportedValue {
            column: column.to_string(),
        }),
    }
}

/// Strip trailing fractional zeros, dropping the point itself for whole
/// numbers: `1.50` becomes `1.5`, `1.00` becomes `1`.
fn trim_fraction(rendered: &str) -> String {
    if !rendered.contains('.') {
        return rendered.to_string();
    }
    rendered.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Format one character field for CSV output.
///
/// True empty strings become the sentinel when one is configured. A
/// whitespace-only field is wrapped in quotes verbatim so it stays distinct
/// from true-empty on re-import. Fields containing a quote, comma, or line
/// break are wrapped with internal quotes doubled; any embedded quote is
/// doubled even when no wrapping happens.
fn format_field(text: &str, sentinel: Option<&str>) -> String {
    if text.is_empty() {
        return sentinel.unwrap_or_default().to_string();
    }
    if text.trim().is_empty() {
        return format!("\"{text}\"");
    }
    let escaped = text.replace('"', "\"\"");
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}
