//! SNOMED CT concept component.

use serde::{Deserialize, Serialize};

use crate::{DefinitionStatus, SctId};

/// A SNOMED CT concept: a single clinical meaning.
///
/// Corresponds to a row of an RF2 `Concept` file. After import only one
/// row per id survives, the one with the greatest effective time.
///
/// # Examples
///
/// ```
/// use terminus_types::{Concept, DefinitionStatus};
///
/// let concept = Concept {
///     id: 73211009,
///     effective_time: 20020131,
///     active: true,
///     module_id: 900000000000207008,
///     definition_status_id: DefinitionStatus::PRIMITIVE_ID,
/// };
///
/// assert!(concept.is_primitive());
/// assert!(!concept.is_fully_defined());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    /// Unique identifier for this concept (SCTID).
    pub id: SctId,
    /// Effective date in `YYYYMMDD` form.
    pub effective_time: u32,
    /// Whether this concept is active.
    pub active: bool,
    /// The module containing this concept.
    pub module_id: SctId,
    /// Primitive or fully defined.
    pub definition_status_id: SctId,
}

impl Concept {
    /// Returns the definition status enum value, if recognised.
    pub fn definition_status(&self) -> Option<DefinitionStatus> {
        DefinitionStatus::from_id(self.definition_status_id)
    }

    /// Returns true if this concept is primitively defined.
    pub fn is_primitive(&self) -> bool {
        self.definition_status_id == DefinitionStatus::PRIMITIVE_ID
    }

    /// Returns true if this concept is fully defined.
    pub fn is_fully_defined(&self) -> bool {
        self.definition_status_id == DefinitionStatus::FULLY_DEFINED_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_status_helpers() {
        let concept = Concept {
            id: 404684003,
            effective_time: 20020131,
            active: true,
            module_id: 900000000000207008,
            definition_status_id: DefinitionStatus::PRIMITIVE_ID,
        };

        assert!(concept.is_primitive());
        assert!(!concept.is_fully_defined());
        assert_eq!(
            concept.definition_status(),
            Some(DefinitionStatus::Primitive)
        );

        let defined = Concept {
            definition_status_id: DefinitionStatus::FULLY_DEFINED_ID,
            ..concept
        };
        assert!(defined.is_fully_defined());
    }
}
