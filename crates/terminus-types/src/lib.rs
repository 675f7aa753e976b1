//! # terminus-types
//!
//! Core type definitions for the terminus SNOMED CT terminology engine.
//!
//! The structs in this crate mirror the component rows of a SNOMED CT
//! Release Format 2 (RF2) distribution: concepts, descriptions,
//! relationships, and reference-set members. They are the currency of the
//! whole workspace: the RF2 parser produces them, the component store
//! persists them, and the query layers hand them back out.
//!
//! ```
//! use terminus_types::{Concept, DefinitionStatus, well_known};
//!
//! let concept = Concept {
//!     id: 73211009,
//!     effective_time: 20020131,
//!     active: true,
//!     module_id: well_known::CORE_MODULE,
//!     definition_status_id: DefinitionStatus::PRIMITIVE_ID,
//! };
//!
//! assert!(concept.is_primitive());
//! ```

#![warn(missing_docs)]

mod concept;
mod description;
mod enums;
mod extended;
mod refset;
mod relationship;
mod sctid;
pub mod well_known;

pub use concept::Concept;
pub use description::Description;
pub use enums::{
    Acceptability, CaseSignificance, CharacteristicType, DefinitionStatus, DescriptionType,
    ModifierType,
};
pub use extended::ExtendedConcept;
pub use refset::{RefsetItem, RefsetPayload};
pub use relationship::Relationship;
pub use sctid::SctId;
