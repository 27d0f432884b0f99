use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::Path;

use rusqlite::Connection;
use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

use super::bundle::TableMapping;
use super::execute::{import_directory, BundleReport, ExecutionError};
use super::options::ImportOptions;

const OS_ARTIFACT_NAMES: [&str; 3] = [".DS_Store", "Thumbs.db", "desktop.ini"];
const OS_ARTIFACT_DIR: &str = "__MACOSX";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive entry {0} escapes the extraction root")]
    UnsafeEntry(String),
    #[error("failed to extract {name}: {source}")]
    Extract {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create temp directory: {0}")]
    TempDir(#[source] std::io::Error),
    #[error(transparent)]
    Import(#[from] ExecutionError),
}

fn is_os_artifact(name: &str) -> bool {
    let path = Path::new(name);
    if path
        .components()
        .next()
        .is_some_and(|first| first.as_os_str() == OS_ARTIFACT_DIR)
    {
        return true;
    }
    path.file_name()
        .map(|file| OS_ARTIFACT_NAMES.iter().any(|known| file == *known))
        .unwrap_or(false)
}

/// Extract a zip stream into a fresh temporary directory and import it via
/// [`import_directory`]. OS artifact entries are skipped. The temporary
/// directory is removed on every exit path; the `TempDir` drop guard owns it.
pub fn import_archive<R: Read + Seek>(
    conn: &Connection,
    reader: R,
    mapping: &TableMapping,
    options: &ImportOptions,
) -> Result<BundleReport, ArchiveError> {
    let temp = TempDir::new().map_err(ArchiveError::TempDir)?;
    let mut archive = ZipArchive::new(reader)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        if entry.is_dir() || is_os_artifact(&name) {
            debug!(entry = %name, "skipping archive entry");
            continue;
        }
        let relative = entry
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| ArchiveError::UnsafeEntry(name.clone()))?;
        let dest = temp.path().join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| ArchiveError::Extract {
                name: name.clone(),
                source,
            })?;
        }
        let mut out = File::create(&dest).map_err(|source| ArchiveError::Extract {
            name: name.clone(),
            source,
        })?;
        io::copy(&mut entry, &mut out).map_err(|source| ArchiveError::Extract {
            name: name.clone(),
            source,
        })?;
    }

    let report = import_directory(conn, temp.path(), mapping, options)?;
    Ok(report)
}
