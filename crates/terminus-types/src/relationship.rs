//! SNOMED CT relationship component.

use serde::{Deserialize, Serialize};

use crate::{CharacteristicType, ModifierType, SctId};

/// A directed, typed edge between two concepts.
///
/// Corresponds to a row of an RF2 `Relationship` file. `IS_A` edges form
/// the concept hierarchy; other type ids encode attributes such as
/// `FINDING_SITE`. Edges sharing a `relationship_group > 0` on the same
/// source read as a conjunction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier for this relationship (SCTID).
    pub id: SctId,
    /// Effective date in `YYYYMMDD` form.
    pub effective_time: u32,
    /// Whether this relationship is active.
    pub active: bool,
    /// The module containing this relationship.
    pub module_id: SctId,
    /// Source concept (subject).
    pub source_id: SctId,
    /// Destination concept (object).
    pub destination_id: SctId,
    /// Role group number; 0 means ungrouped.
    pub relationship_group: u16,
    /// Relationship type, e.g. IS_A or an attribute concept.
    pub type_id: SctId,
    /// Stated or inferred.
    pub characteristic_type_id: SctId,
    /// Existential or universal quantification.
    pub modifier_id: SctId,
}

impl Relationship {
    /// Returns true if this is an IS_A (subsumption) edge.
    pub fn is_is_a(&self) -> bool {
        self.type_id == crate::well_known::IS_A
    }

    /// Returns the characteristic type enum value, if recognised.
    pub fn characteristic_type(&self) -> Option<CharacteristicType> {
        CharacteristicType::from_id(self.characteristic_type_id)
    }

    /// Returns true if this relationship was computed by the classifier.
    pub fn is_inferred(&self) -> bool {
        self.characteristic_type_id == CharacteristicType::INFERRED_ID
    }

    /// Returns the modifier enum value, if recognised.
    pub fn modifier_type(&self) -> Option<ModifierType> {
        ModifierType::from_id(self.modifier_id)
    }
}
