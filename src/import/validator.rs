use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use thiserror::Error;

use super::bundle::TableMapping;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("source {0} is not a directory")]
    NotADirectory(String),
    #[error("failed to read directory {dir}: {source}")]
    ReadDir {
        dir: String,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "file set mismatch in {dir}: missing [{missing}], unexpected [{unexpected}]; \
         expected exactly [{expected}]"
    )]
    FileSetMismatch {
        dir: String,
        missing: String,
        unexpected: String,
        expected: String,
    },
}

/// Check that the plain files in `dir` are an exact set match against the
/// mapping's expected file names. Runs before any transaction is opened; the
/// error lists every expected file name.
pub fn validate_directory(dir: &Path, mapping: &TableMapping) -> Result<(), ValidationError> {
    if !dir.is_dir() {
        return Err(ValidationError::NotADirectory(dir.display().to_string()));
    }

    let mut found = BTreeSet::new();
    let entries = fs::read_dir(dir).map_err(|source| ValidationError::ReadDir {
        dir: dir.display().to_string(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ValidationError::ReadDir {
            dir: dir.display().to_string(),
            source,
        })?;
        if entry.path().is_file() {
            found.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }

    let expected: BTreeSet<String> = mapping.file_names().map(str::to_string).collect();
    let missing: Vec<&str> = expected
        .iter()
        .filter(|name| !found.contains(*name))
        .map(String::as_str)
        .collect();
    let unexpected: Vec<&str> = found
        .iter()
        .filter(|name| !expected.contains(*name))
        .map(String::as_str)
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }

    Err(ValidationError::FileSetMismatch {
        dir: dir.display().to_string(),
        missing: missing.join(", "),
        unexpected: unexpected.join(", "),
        expected: expected
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", "),
    })
}
