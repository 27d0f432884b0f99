use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use csvbridge::{
    export_csv, export_csv_path, import_archive, import_csv_path, import_directory, BundleReport,
    ExportOptions, ImportOptions, TableMapping,
};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csvbridge", about = "Bulk CSV <-> SQL table transfer")]
struct Cli {
    /// SQLite database path
    #[arg(long, value_name = "PATH")]
    db: PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Import one CSV file into a table
    Import {
        table: String,
        file: PathBuf,
        /// Commit every N rows (0 = single transaction owned by the caller)
        #[arg(long, default_value_t = 0, value_name = "N")]
        commit_interval: usize,
        /// Header alias, HEADER=COLUMN (repeatable)
        #[arg(long = "rename", value_name = "HEADER=COLUMN")]
        renames: Vec<String>,
        /// Column to read but never insert (repeatable)
        #[arg(long = "ignore", value_name = "COLUMN")]
        ignored: Vec<String>,
        /// Force a column to a fixed value, COLUMN=VALUE (repeatable)
        #[arg(long = "set", value_name = "COLUMN=VALUE")]
        overrides: Vec<String>,
        /// Marker distinguishing empty strings from NULL
        #[arg(long, value_name = "TEXT")]
        sentinel: Option<String>,
        /// strftime pattern overriding the default timestamp parsers
        #[arg(long, value_name = "FORMAT")]
        timestamp_format: Option<String>,
    },
    /// Export a table (or explicit query) to CSV
    Export {
        table: String,
        /// Output file; stdout when omitted
        out: Option<PathBuf>,
        #[arg(long = "where", value_name = "CONDITION")]
        where_clause: Option<String>,
        /// Explicit SQL text, takes precedence over the table name
        #[arg(long, value_name = "SQL")]
        query: Option<String>,
        #[arg(long, value_name = "TEXT")]
        sentinel: Option<String>,
    },
    /// Import a directory of CSV files atomically
    ImportDir {
        dir: PathBuf,
        /// Expected file and its target table, FILE=TABLE (repeatable, ordered)
        #[arg(long = "map", value_name = "FILE=TABLE", required = true)]
        mappings: Vec<String>,
        #[arg(long, value_name = "TEXT")]
        sentinel: Option<String>,
        #[arg(long, value_name = "FORMAT")]
        timestamp_format: Option<String>,
    },
    /// Import a zip archive of CSV files atomically
    ImportZip {
        archive: PathBuf,
        #[arg(long = "map", value_name = "FILE=TABLE", required = true)]
        mappings: Vec<String>,
        #[arg(long, value_name = "TEXT")]
        sentinel: Option<String>,
        #[arg(long, value_name = "FORMAT")]
        timestamp_format: Option<String>,
    },
}

fn parse_pair(raw: &str, what: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid {what} {raw:?}: expected KEY=VALUE"))?;
    Ok((key.to_string(), value.to_string()))
}

fn parse_pairs(raw: &[String], what: &str) -> Result<HashMap<String, String>> {
    raw.iter().map(|item| parse_pair(item, what)).collect()
}

fn parse_mapping(raw: &[String]) -> Result<TableMapping> {
    let pairs: Vec<(String, String)> = raw
        .iter()
        .map(|item| parse_pair(item, "mapping"))
        .collect::<Result<_>>()?;
    Ok(TableMapping::new(pairs))
}

fn print_report(report: &BundleReport) {
    for (file, rows) in &report.tables {
        println!("{file}: {rows} rows");
    }
    println!("total: {} rows", report.total_rows());
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let conn = Connection::open(&cli.db)
        .with_context(|| format!("failed to open database {}", cli.db.display()))?;

    match cli.cmd {
        Cmd::Import {
            table,
            file,
            commit_interval,
            renames,
            ignored,
            overrides,
            sentinel,
            timestamp_format,
        } => {
            let options = ImportOptions {
                renames: parse_pairs(&renames, "rename")?,
                ignored_columns: ignored.into_iter().collect::<HashSet<_>>(),
                overrides: parse_pairs(&overrides, "override")?,
                commit_interval,
                empty_string_sentinel: sentinel,
                timestamp_format,
                reset_autonumber: false,
            };
            let rows = import_csv_path(&conn, &table, &file, &options)?;
            println!("{}: {rows} rows", file.display());
        }
        Cmd::Export {
            table,
            out,
            where_clause,
            query,
            sentinel,
        } => {
            let options = ExportOptions {
                query,
                where_clause,
                empty_string_sentinel: sentinel,
            };
            let rows = match out {
                Some(path) => export_csv_path(&conn, &table, &path, &options)?,
                None => export_csv(&conn, &table, io::stdout().lock(), &options)?,
            };
            eprintln!("exported {rows} rows");
        }
        Cmd::ImportDir {
            dir,
            mappings,
            sentinel,
            timestamp_format,
        } => {
            let mapping = parse_mapping(&mappings)?;
            let options = ImportOptions {
                empty_string_sentinel: sentinel,
                timestamp_format,
                ..Default::default()
            };
            let report = import_directory(&conn, &dir, &mapping, &options)?;
            print_report(&report);
        }
        Cmd::ImportZip {
            archive,
            mappings,
            sentinel,
            timestamp_format,
        } => {
            let mapping = parse_mapping(&mappings)?;
            let options = ImportOptions {
                empty_string_sentinel: sentinel,
                timestamp_format,
                ..Default::default()
            };
            let file = File::open(&archive)
                .with_context(|| format!("failed to open archive {}", archive.display()))?;
            let report = import_archive(&conn, file, &mapping, &options)?;
            print_report(&report);
        }
    }

    Ok(())
}
