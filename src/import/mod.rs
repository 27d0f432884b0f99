pub mod archive;
pub mod bundle;
pub mod execute;
pub mod options;
pub mod rows;
pub mod validator;

pub use archive::{import_archive, ArchiveError};
pub use bundle::{MappingEntry, TableMapping};
pub use execute::{import_directory, BundleReport, ExecutionError};
pub use options::ImportOptions;
pub use rows::{import_csv, import_csv_path, ImportError};
pub use validator::{validate_directory, ValidationError};
