//! Extended concept projection.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Concept, Description, SctId};

/// A read-only projection of a concept together with everything a client
/// typically renders alongside it: its descriptions, its attribute
/// relationships aggregated over all ancestors, the same restricted to
/// direct parents, and the reference sets it belongs to.
///
/// Parents are the transitive closure of active IS_A edges, so
/// `parent_relationships[&IS_A]` contains every ancestor while
/// `direct_parent_relationships[&IS_A]` contains only the immediate ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedConcept {
    /// The concept itself.
    pub concept: Concept,
    /// All active descriptions of the concept.
    pub descriptions: Vec<Description>,
    /// Relationship type to destination set, unioned over the concept and
    /// all of its ancestors.
    pub parent_relationships: HashMap<SctId, HashSet<SctId>>,
    /// Relationship type to destination set for the concept's own active
    /// relationships only.
    pub direct_parent_relationships: HashMap<SctId, HashSet<SctId>>,
    /// Reference sets the concept is an active member of.
    pub refsets: HashSet<SctId>,
}

impl ExtendedConcept {
    /// Returns all transitive ancestors (IS_A closure, excluding self).
    pub fn ancestors(&self) -> HashSet<SctId> {
        self.parent_relationships
            .get(&crate::well_known::IS_A)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the direct parents.
    pub fn direct_parents(&self) -> HashSet<SctId> {
        self.direct_parent_relationships
            .get(&crate::well_known::IS_A)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns true if the concept is a descendant-or-self of `ancestor`.
    pub fn is_a(&self, ancestor: SctId) -> bool {
        self.concept.id == ancestor || self.ancestors().contains(&ancestor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{well_known, DefinitionStatus};

    #[test]
    fn is_a_uses_transitive_parents() {
        let concept = Concept {
            id: 300,
            effective_time: 20240101,
            active: true,
            module_id: well_known::CORE_MODULE,
            definition_status_id: DefinitionStatus::PRIMITIVE_ID,
        };

        let mut parent_relationships = HashMap::new();
        parent_relationships.insert(well_known::IS_A, HashSet::from([100, 200]));
        let mut direct = HashMap::new();
        direct.insert(well_known::IS_A, HashSet::from([200]));

        let extended = ExtendedConcept {
            concept,
            descriptions: Vec::new(),
            parent_relationships,
            direct_parent_relationships: direct,
            refsets: HashSet::new(),
        };

        assert!(extended.is_a(300));
        assert!(extended.is_a(100));
        assert!(extended.is_a(200));
        assert!(!extended.is_a(999));
        assert_eq!(extended.direct_parents(), HashSet::from([200]));
    }
}
