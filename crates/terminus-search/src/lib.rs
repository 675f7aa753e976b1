//! # terminus-search
//!
//! The lexical search index of the terminus terminology engine: an
//! inverted index over description terms, answering ranked, filtered,
//! type-ahead queries with concept-id results.
//!
//! One document per active description. Terms are tokenised, lowercased,
//! and accent-folded at index and query time; the last query token also
//! matches as a prefix so partially typed words hit. Ranking prefers an
//! exact term match, then preferred synonyms, then acceptable synonyms,
//! then fully specified names, with a penalty for longer terms.

#![warn(missing_docs)]

mod document;
mod index;

use thiserror::Error;

pub use document::{DescriptionDocument, SearchHit, SearchRequest};
pub use index::SearchIndex;

/// Errors raised by the search index.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Filesystem failure creating or opening the index directory.
    #[error("search index IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The index directory could not be opened.
    #[error("failed to open search index directory: {0}")]
    OpenDirectory(#[from] tantivy::directory::error::OpenDirectoryError),

    /// Index-engine failure.
    #[error("search engine error: {0}")]
    Engine(#[from] tantivy::TantivyError),
}
