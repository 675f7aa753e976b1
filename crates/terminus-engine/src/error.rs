//! Facade-level errors.

use thiserror::Error;

/// Errors surfaced by the engine facade.
///
/// Each variant maps to one failure class: `Usage` for caller mistakes,
/// `Input` for malformed release files (the import aborts, committed
/// batches remain, and the store stays flagged for reindexing), `Store`
/// for container failures that stop the engine, `Index` and `Search` for
/// rebuildable index failures, and `Query` for per-request failures.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Bad arguments from the caller.
    #[error("{0}")]
    Usage(String),

    /// A release file failed to parse.
    #[error(transparent)]
    Input(#[from] terminus_rf2::Rf2Error),

    /// The component store failed.
    #[error(transparent)]
    Store(#[from] terminus_store::StoreError),

    /// A derived-index build failed; rerunning the build recovers.
    #[error(transparent)]
    Index(#[from] terminus_store::IndexError),

    /// The search index failed.
    #[error(transparent)]
    Search(#[from] terminus_search::SearchError),

    /// An ECL expression failed to parse or evaluate.
    #[error(transparent)]
    Query(#[from] terminus_ecl::EclError),

    /// The import was cancelled between batches.
    #[error("import cancelled")]
    Cancelled,

    /// The import pipeline stopped because a sibling task failed.
    #[error("import pipeline aborted")]
    Aborted,

    /// The store is gone, which only happens after a failed compaction.
    /// Reopen the engine to recover.
    #[error("store is not open")]
    Closed,
}
