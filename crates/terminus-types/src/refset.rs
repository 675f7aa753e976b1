//! SNOMED CT reference-set member types.
//!
//! Reference sets group components for a purpose: value sets, language
//! acceptability, historical associations, cross-maps. Every member row
//! shares the same leading columns; the columns after
//! `referencedComponentId` depend on the refset's schema. Rather than one
//! struct per schema, a member here is a base record plus a tagged
//! [`RefsetPayload`]; schemas the engine does not model decay into an
//! ordered extension-column list, so no release file is ever rejected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Acceptability, SctId};

/// Schema-specific trailing columns of a reference-set member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefsetPayload {
    /// Simple membership, no extra columns.
    Simple,
    /// Language refset: is the referenced description preferred or merely
    /// acceptable in this dialect?
    Language {
        /// Preferred or acceptable, as an SCTID.
        acceptability_id: SctId,
    },
    /// Association refset linking a component to a replacement or related
    /// component (historical associations).
    Association {
        /// The component this member points at.
        target_component_id: SctId,
    },
    /// Simple map refset carrying a code from another code system.
    SimpleMap {
        /// The mapped code, uninterpreted.
        map_target: String,
    },
    /// Any schema the engine does not model: the trailing columns in file
    /// order. Column names live in the store's refset field-name index.
    Extension(Vec<String>),
}

/// A reference-set member row.
///
/// The `id` is a UUID, unlike the SCTIDs of the primary components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefsetItem {
    /// Unique member identifier.
    pub id: Uuid,
    /// Effective date in `YYYYMMDD` form.
    pub effective_time: u32,
    /// Whether this membership is active.
    pub active: bool,
    /// The module containing this member.
    pub module_id: SctId,
    /// The reference set this member belongs to.
    pub refset_id: SctId,
    /// The component (concept or description) that is a member.
    pub referenced_component_id: SctId,
    /// Schema-specific columns.
    pub payload: RefsetPayload,
}

impl RefsetItem {
    /// Returns the acceptability for language-refset members.
    pub fn acceptability(&self) -> Option<Acceptability> {
        match self.payload {
            RefsetPayload::Language { acceptability_id } => {
                Acceptability::from_id(acceptability_id)
            }
            _ => None,
        }
    }

    /// Returns true if this member marks a description preferred in its
    /// dialect.
    pub fn is_preferred(&self) -> bool {
        self.acceptability() == Some(Acceptability::Preferred)
    }

    /// Returns the association target for association-refset members.
    pub fn association_target(&self) -> Option<SctId> {
        match self.payload {
            RefsetPayload::Association {
                target_component_id,
            } => Some(target_component_id),
            _ => None,
        }
    }
}
