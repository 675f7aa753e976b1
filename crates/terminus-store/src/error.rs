//! Store and index-build errors.

use thiserror::Error;

/// Errors raised by the component store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The container is already open elsewhere.
    #[error("store is locked by another process or handle: {path}")]
    Locked {
        /// The container path.
        path: String,
    },

    /// The container could not be opened.
    #[error("failed to open store at {path}: {source}")]
    Open {
        /// The container path.
        path: String,
        /// The underlying sled error.
        #[source]
        source: sled::Error,
    },

    /// A write was attempted on a store opened read-only.
    #[error("store is open read-only")]
    ReadOnly,

    /// Filesystem failure.
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Container-level failure.
    #[error("store container error: {0}")]
    Backend(#[from] sled::Error),

    /// A stored value failed to decode, or a key had the wrong shape.
    #[error("corrupt store record: {detail}")]
    Corrupt {
        /// What failed to decode.
        detail: String,
    },
}

impl StoreError {
    pub(crate) fn corrupt(detail: impl Into<String>) -> Self {
        StoreError::Corrupt {
            detail: detail.into(),
        }
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::corrupt(err.to_string())
    }
}

/// Errors raised while building the derived indices.
///
/// Index builds are recoverable: rerunning the build rebuilds every index
/// from the primary tables.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The underlying store failed during the build.
    #[error("store failure during index build: {0}")]
    Store(#[from] StoreError),
}
