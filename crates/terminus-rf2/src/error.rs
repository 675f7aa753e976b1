//! Errors raised while classifying and decoding RF2 files.

use thiserror::Error;

/// Errors that can occur during RF2 file processing.
#[derive(Error, Debug)]
pub enum Rf2Error {
    /// I/O error reading a release file.
    #[error("IO error reading RF2 file: {0}")]
    Io(#[from] std::io::Error),

    /// Low-level tab-separated decode error.
    #[error("error reading {file}: {source}")]
    Csv {
        /// The file being read.
        file: String,
        /// The underlying csv error.
        #[source]
        source: csv::Error,
    },

    /// A field failed to decode.
    #[error("{file}:{line}: invalid {column} value {value:?}")]
    InvalidField {
        /// The file being read.
        file: String,
        /// 1-based line number of the offending row.
        line: u64,
        /// The column that failed to decode.
        column: &'static str,
        /// The raw field value.
        value: String,
    },

    /// Header row did not carry the expected columns.
    #[error("{file}: expected column {expected:?} at position {position}, found {found:?}")]
    UnexpectedColumn {
        /// The file being read.
        file: String,
        /// 0-based column position.
        position: usize,
        /// The expected column name.
        expected: String,
        /// The column name found.
        found: String,
    },

    /// Header row had too few columns.
    #[error("{file}: header has {found} columns, expected at least {expected}")]
    TruncatedHeader {
        /// The file being read.
        file: String,
        /// Minimum expected column count.
        expected: usize,
        /// Found column count.
        found: usize,
    },

    /// The filename does not match any known RF2 pattern.
    #[error("not a recognised RF2 release file: {path}")]
    UnrecognisedFile {
        /// The offending path.
        path: String,
    },

    /// A path given for discovery does not exist.
    #[error("release path not found: {path}")]
    PathNotFound {
        /// The missing path.
        path: String,
    },
}

/// Result alias for RF2 operations.
pub type Rf2Result<T> = Result<T, Rf2Error>;
