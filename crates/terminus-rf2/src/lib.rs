//! # terminus-rf2
//!
//! Streaming parser for SNOMED CT Release Format 2 (RF2) distribution
//! files.
//!
//! RF2 releases are trees of UTF-8 tab-separated `.txt` files whose
//! filenames encode what they contain. This crate classifies files by
//! name ([`ReleaseFile`]), decodes rows into the typed component records
//! of `terminus-types` ([`RecordReader`]), and discovers the importable
//! files under a release directory ([`discover_release_files`]).
//!
//! Reference-set files are polymorphic: the columns after
//! `referencedComponentId` depend on the refset schema. The reader
//! derives the schema from the header row, decoding known schemas into
//! typed payloads and anything else into an ordered extension-column
//! list, so unknown refsets still import.

#![warn(missing_docs)]

mod discovery;
mod error;
mod filename;
mod record;

pub use discovery::discover_release_files;
pub use error::{Rf2Error, Rf2Result};
pub use filename::{ComponentKind, ReleaseFile, ReleaseType};
pub use record::{parse, Record, RecordReader, RefsetSchema};
