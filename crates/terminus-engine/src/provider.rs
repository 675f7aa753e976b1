//! Store-backed [`TerminologyProvider`] for the ECL evaluator.
//!
//! ECL depends only on the provider trait; this adapter is the one place
//! where the evaluator and the component store meet.

use std::collections::HashSet;

use terminus_ecl::{AttributeEdge, EclError, TerminologyProvider};
use terminus_store::{ComponentStore, StoreError};
use terminus_types::{well_known, SctId};

pub(crate) struct StoreProvider<'a> {
    store: &'a ComponentStore,
}

impl<'a> StoreProvider<'a> {
    pub(crate) fn new(store: &'a ComponentStore) -> Self {
        Self { store }
    }
}

fn provider_err(err: StoreError) -> EclError {
    EclError::Provider(err.to_string())
}

impl TerminologyProvider for StoreProvider<'_> {
    fn concept_exists(&self, concept_id: SctId) -> Result<bool, EclError> {
        self.store.has_concept(concept_id).map_err(provider_err)
    }

    fn all_concepts(&self) -> Result<HashSet<SctId>, EclError> {
        self.store
            .iter_concepts()
            .map(|concept| concept.map(|c| c.id).map_err(provider_err))
            .collect()
    }

    fn parents_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError> {
        Ok(self
            .store
            .parents_of_type(concept_id, Some(well_known::IS_A))
            .map_err(provider_err)?
            .into_iter()
            .collect())
    }

    fn children_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError> {
        Ok(self
            .store
            .children_of_type(concept_id, Some(well_known::IS_A))
            .map_err(provider_err)?
            .into_iter()
            .collect())
    }

    fn descendants_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError> {
        Ok(self
            .store
            .descendants(concept_id)
            .map_err(provider_err)?
            .into_iter()
            .collect())
    }

    fn ancestors_of(&self, concept_id: SctId) -> Result<HashSet<SctId>, EclError> {
        Ok(self
            .store
            .ancestors(concept_id)
            .map_err(provider_err)?
            .into_iter()
            .collect())
    }

    fn members_of(&self, refset_id: SctId) -> Result<HashSet<SctId>, EclError> {
        Ok(self
            .store
            .members_of(refset_id)
            .map_err(provider_err)?
            .into_iter()
            .collect())
    }

    fn attribute_edges(&self, concept_id: SctId) -> Result<Vec<AttributeEdge>, EclError> {
        Ok(self
            .store
            .parent_edges(concept_id)
            .map_err(provider_err)?
            .into_iter()
            .map(|edge| AttributeEdge {
                type_id: edge.type_id,
                target: edge.target,
                group: edge.group,
            })
            .collect())
    }

    fn descendant_count(&self, concept_id: SctId) -> Result<usize, EclError> {
        self.store.descendant_count(concept_id).map_err(provider_err)
    }

    fn member_count(&self, refset_id: SctId) -> Result<usize, EclError> {
        self.store.member_count(refset_id).map_err(provider_err)
    }

    fn concept_count(&self) -> Result<usize, EclError> {
        Ok(self.store.status().map_err(provider_err)?.concepts)
    }
}
