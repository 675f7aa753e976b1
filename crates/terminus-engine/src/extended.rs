//! Extended-concept projection builder.

use std::collections::{HashMap, HashSet};

use terminus_store::{ComponentStore, StoreError};
use terminus_types::{ExtendedConcept, SctId};

/// Materialises a concept, its active descriptions, its relationships
/// aggregated over every ancestor-or-self, the direct-parent variant,
/// and its refset memberships into one projection.
pub(crate) fn build(
    store: &ComponentStore,
    concept_id: SctId,
) -> Result<Option<ExtendedConcept>, StoreError> {
    let Some(concept) = store.concept(concept_id)? else {
        return Ok(None);
    };

    let descriptions = store
        .descriptions_for(concept_id)?
        .into_iter()
        .filter(|d| d.active)
        .collect();

    let mut direct: HashMap<SctId, HashSet<SctId>> = HashMap::new();
    for edge in store.parent_edges(concept_id)? {
        direct.entry(edge.type_id).or_default().insert(edge.target);
    }

    let mut aggregated = direct.clone();
    for ancestor in store.ancestors(concept_id)? {
        for edge in store.parent_edges(ancestor)? {
            aggregated
                .entry(edge.type_id)
                .or_default()
                .insert(edge.target);
        }
    }

    let refsets = store.refsets_for(concept_id)?.into_iter().collect();

    Ok(Some(ExtendedConcept {
        concept,
        descriptions,
        parent_relationships: aggregated,
        direct_parent_relationships: direct,
        refsets,
    }))
}
