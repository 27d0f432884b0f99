use std::collections::{HashMap, HashSet};

use crate::coerce::CoerceOptions;

/// Per-call import configuration. All formatting state lives here rather
/// than in process-wide globals.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Header-name aliases: CSV header -> target column name.
    pub renames: HashMap<String, String>,
    /// Columns that are read from the CSV but never bound as parameters.
    pub ignored_columns: HashSet<String>,
    /// Force specific columns to a fixed raw value regardless of CSV content.
    /// Applied before coercion, keyed by target column name.
    pub overrides: HashMap<String, String>,
    /// Commit every N successfully inserted rows. 0 means the importer never
    /// commits internally and the caller owns the transaction boundary.
    pub commit_interval: usize,
    /// Marker distinguishing an intentional empty string from NULL.
    pub empty_string_sentinel: Option<String>,
    /// Overrides the default timestamp parsers for this call.
    pub timestamp_format: Option<String>,
    /// Resetting autonumbered primary keys after an import is not supported;
    /// requesting it fails before any work is done.
    pub reset_autonumber: bool,
}

impl ImportOptions {
    pub(crate) fn coerce_options(&self) -> CoerceOptions {
        CoerceOptions {
            empty_string_sentinel: self.empty_string_sentinel.clone(),
            timestamp_format: self.timestamp_format.clone(),
        }
    }
}
