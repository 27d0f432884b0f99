use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table {0} does not exist or has no columns")]
    UnknownTable(String),
    #[error("unsupported declared type {declared} on column {table}.{column}")]
    UnsupportedType {
        table: String,
        column: String,
        declared: String,
    },
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Closed set of target column types the engine knows how to coerce into.
/// Anything else declared on a target table is a configuration error, never
/// a per-row error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Char,
    Varchar,
    Integer,
    SmallInt,
    BigInt,
    Decimal,
    Date,
    Timestamp,
    Boolean,
}

impl SqlType {
    pub fn is_character(self) -> bool {
        matches!(self, SqlType::Char | SqlType::Varchar)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, SqlType::Integer | SqlType::SmallInt | SqlType::BigInt)
    }
}

/// Metadata for one target column, fetched fresh from the live schema on
/// every import call.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: SqlType,
    pub size: u32,
    pub decimal_digits: u32,
    pub mandatory: bool,
}

pub fn quote_ident(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Parse a declared column type such as `VARCHAR(40)` or `DECIMAL(10,2)`
/// into its base type plus size and decimal digits.
fn parse_declared_type(declared: &str) -> Option<(SqlType, u32, u32)> {
    let trimmed = declared.trim();
    let (base, args) = match trimmed.find('(') {
        Some(open) => {
            let close = trimmed.rfind(')')?;
            if close < open {
                return None;
            }
            (&trimmed[..open], trimmed[open + 1..close].trim())
        }
        None => (trimmed, ""),
    };

    let mut parts = args.split(',').map(str::trim);
    let size: u32 = match parts.next() {
        Some("") | None => 0,
        Some(first) => first.parse().ok()?,
    };
    let decimal_digits: u32 = match parts.next() {
        None => 0,
        Some(second) => second.parse().ok()?,
    };
    if parts.next().is_some() {
        return None;
    }

    let sql_type = match base.trim().to_ascii_uppercase().as_str() {
        "CHAR" | "CHARACTER" | "NCHAR" => SqlType::Char,
        "VARCHAR" | "NVARCHAR" | "TEXT" | "CLOB" => SqlType::Varchar,
        "INT" | "INTEGER" | "MEDIUMINT" => SqlType::Integer,
        "SMALLINT" | "TINYINT" => SqlType::SmallInt,
        "BIGINT" => SqlType::BigInt,
        "DECIMAL" | "DEC" | "NUMERIC" => SqlType::Decimal,
        "DATE" => SqlType::Date,
        "TIMESTAMP" | "DATETIME" => SqlType::Timestamp,
        "BOOLEAN" | "BOOL" | "BIT" => SqlType::Boolean,
        _ => return None,
    };
    Some((sql_type, size, decimal_digits))
}

/// Fetch the live column descriptors for `table`. Descriptors are never
/// cached; each import call sees the schema as it stands.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnDescriptor>, SchemaError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get("name")?;
        let declared: String = row.get("type")?;
        let notnull: i64 = row.get("notnull")?;
        let (sql_type, size, decimal_digits) =
            parse_declared_type(&declared).ok_or_else(|| SchemaError::UnsupportedType {
                table: table.to_string(),
                column: name.clone(),
                declared: declared.clone(),
            })?;
        columns.push(ColumnDescriptor {
            name,
            sql_type,
            size,
            decimal_digits,
            mandatory: notnull != 0,
        });
    }
    if columns.is_empty() {
        return Err(SchemaError::UnknownTable(table.to_string()));
    }
    Ok(columns)
}
