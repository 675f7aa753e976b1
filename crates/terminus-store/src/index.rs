//! Derived-index builder.
//!
//! Runs after all imports commit. Two passes:
//!
//! 1. Relationship indices: every active relationship lands in the
//!    forward and reverse edge trees, then the transitive IS_A closure is
//!    written by walking each concept's parent chain upward.
//! 2. Refset membership: every active member lands in the component and
//!    refset membership trees, and each refset is recorded as installed.
//!
//! The build is a fixpoint over the primary tables: index trees are
//! cleared first, so a crashed or failed build is recovered by running it
//! again.

use std::collections::{HashMap, HashSet, VecDeque};

use sled::Batch;
use terminus_types::SctId;
use tracing::{debug, warn};

use crate::error::IndexError;
use crate::keys;
use crate::store::ComponentStore;

/// How many index entries accumulate before a batch commits.
const BATCH_SIZE: usize = 10_000;

/// Index entries carry no value, only their composite key.
const EMPTY_VALUE: &[u8] = &[];

/// Counts from a completed index build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Active relationships indexed.
    pub relationships: usize,
    /// Transitive closure entries written.
    pub descendant_edges: usize,
    /// Active refset memberships indexed.
    pub memberships: usize,
    /// Distinct installed reference sets.
    pub installed_refsets: usize,
    /// Concepts whose IS_A chain contains a cycle.
    pub cycles: usize,
}

/// Rebuilds every derived index from the primary tables.
pub fn build_indexes(store: &ComponentStore) -> Result<IndexStats, IndexError> {
    let mut stats = IndexStats::default();

    store.parent_rels.clear().map_err(crate::StoreError::from)?;
    store.child_rels.clear().map_err(crate::StoreError::from)?;
    store
        .descendant_rels
        .clear()
        .map_err(crate::StoreError::from)?;
    store
        .installed_refsets
        .clear()
        .map_err(crate::StoreError::from)?;
    store
        .component_refsets
        .clear()
        .map_err(crate::StoreError::from)?;
    store
        .refset_members
        .clear()
        .map_err(crate::StoreError::from)?;

    build_relationship_indexes(store, &mut stats)?;
    build_closure(store, &mut stats)?;
    build_refset_indexes(store, &mut stats)?;

    store.flush()?;
    debug!(?stats, "index build complete");
    Ok(stats)
}

fn build_relationship_indexes(
    store: &ComponentStore,
    stats: &mut IndexStats,
) -> Result<(), IndexError> {
    let mut parent_batch = Batch::default();
    let mut child_batch = Batch::default();
    let mut pending = 0;

    for relationship in store.iter_relationships() {
        let relationship = relationship?;
        if !relationship.active {
            continue;
        }
        let forward = keys::relationship(
            relationship.source_id,
            relationship.type_id,
            relationship.relationship_group,
            relationship.destination_id,
            relationship.id,
        );
        let reverse = keys::relationship(
            relationship.destination_id,
            relationship.type_id,
            relationship.relationship_group,
            relationship.source_id,
            relationship.id,
        );
        parent_batch.insert(&forward[..], EMPTY_VALUE);
        child_batch.insert(&reverse[..], EMPTY_VALUE);
        stats.relationships += 1;
        pending += 1;

        if pending >= BATCH_SIZE {
            store
                .parent_rels
                .apply_batch(std::mem::take(&mut parent_batch))
                .map_err(crate::StoreError::from)?;
            store
                .child_rels
                .apply_batch(std::mem::take(&mut child_batch))
                .map_err(crate::StoreError::from)?;
            pending = 0;
        }
    }
    if pending > 0 {
        store
            .parent_rels
            .apply_batch(parent_batch)
            .map_err(crate::StoreError::from)?;
        store
            .child_rels
            .apply_batch(child_batch)
            .map_err(crate::StoreError::from)?;
    }
    Ok(())
}

/// Writes the `(ancestor, descendant)` closure of active IS_A edges.
///
/// The parent adjacency is held in memory for the walk; SNOMED CT's IS_A
/// graph is a few million edges at most. A concept whose upward walk
/// reaches itself sits on a cycle: the offending entries are skipped and
/// the cycle is logged, everything else still indexes.
fn build_closure(store: &ComponentStore, stats: &mut IndexStats) -> Result<(), IndexError> {
    let mut parents: HashMap<SctId, Vec<SctId>> = HashMap::new();
    for relationship in store.iter_relationships() {
        let relationship = relationship?;
        if relationship.active && relationship.is_is_a() {
            parents
                .entry(relationship.source_id)
                .or_default()
                .push(relationship.destination_id);
        }
    }

    let mut batch = Batch::default();
    let mut pending = 0;

    for concept in store.iter_concepts() {
        let concept = concept?;
        let mut ancestors: HashSet<SctId> = HashSet::new();
        let mut queue: VecDeque<SctId> = parents
            .get(&concept.id)
            .map(|p| p.iter().copied().collect())
            .unwrap_or_default();

        while let Some(current) = queue.pop_front() {
            if ancestors.insert(current) {
                if let Some(next) = parents.get(&current) {
                    queue.extend(next.iter().copied());
                }
            }
        }

        if ancestors.remove(&concept.id) {
            warn!(concept = concept.id, "IS_A cycle detected, closure entries skipped");
            stats.cycles += 1;
        }

        for ancestor in ancestors {
            batch.insert(&keys::pair(ancestor, concept.id)[..], EMPTY_VALUE);
            stats.descendant_edges += 1;
            pending += 1;
            if pending >= BATCH_SIZE {
                store
                    .descendant_rels
                    .apply_batch(std::mem::take(&mut batch))
                    .map_err(crate::StoreError::from)?;
                pending = 0;
            }
        }
    }
    if pending > 0 {
        store
            .descendant_rels
            .apply_batch(batch)
            .map_err(crate::StoreError::from)?;
    }
    Ok(())
}

fn build_refset_indexes(store: &ComponentStore, stats: &mut IndexStats) -> Result<(), IndexError> {
    let mut installed: HashSet<SctId> = HashSet::new();
    let mut component_batch = Batch::default();
    let mut member_batch = Batch::default();
    let mut pending = 0;

    for item in store.iter_refset_items() {
        let item = item?;
        if !item.active {
            continue;
        }
        component_batch.insert(
            &keys::membership(item.referenced_component_id, item.refset_id, item.id)[..],
            EMPTY_VALUE,
        );
        member_batch.insert(
            &keys::pair(item.refset_id, item.referenced_component_id)[..],
            EMPTY_VALUE,
        );
        installed.insert(item.refset_id);
        stats.memberships += 1;
        pending += 1;

        if pending >= BATCH_SIZE {
            store
                .component_refsets
                .apply_batch(std::mem::take(&mut component_batch))
                .map_err(crate::StoreError::from)?;
            store
                .refset_members
                .apply_batch(std::mem::take(&mut member_batch))
                .map_err(crate::StoreError::from)?;
            pending = 0;
        }
    }
    if pending > 0 {
        store
            .component_refsets
            .apply_batch(component_batch)
            .map_err(crate::StoreError::from)?;
        store
            .refset_members
            .apply_batch(member_batch)
            .map_err(crate::StoreError::from)?;
    }

    for refset_id in &installed {
        store
            .installed_refsets
            .insert(&keys::id(*refset_id)[..], EMPTY_VALUE)
            .map_err(crate::StoreError::from)?;
    }
    stats.installed_refsets = installed.len();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use terminus_types::{
        well_known, CharacteristicType, Concept, DefinitionStatus, ModifierType, RefsetItem,
        RefsetPayload, Relationship,
    };
    use uuid::Uuid;

    fn make_concept(id: SctId) -> Concept {
        Concept {
            id,
            effective_time: 20240101,
            active: true,
            module_id: well_known::CORE_MODULE,
            definition_status_id: DefinitionStatus::PRIMITIVE_ID,
        }
    }

    fn make_is_a(id: SctId, source: SctId, destination: SctId) -> Relationship {
        make_edge(id, source, destination, well_known::IS_A, 0, true)
    }

    fn make_edge(
        id: SctId,
        source: SctId,
        destination: SctId,
        type_id: SctId,
        group: u16,
        active: bool,
    ) -> Relationship {
        Relationship {
            id,
            effective_time: 20240101,
            active,
            module_id: well_known::CORE_MODULE,
            source_id: source,
            destination_id: destination,
            relationship_group: group,
            type_id,
            characteristic_type_id: CharacteristicType::INFERRED_ID,
            modifier_id: ModifierType::EXISTENTIAL_ID,
        }
    }

    fn make_member(refset_id: SctId, component_id: SctId, active: bool) -> RefsetItem {
        RefsetItem {
            id: Uuid::new_v4(),
            effective_time: 20240101,
            active,
            module_id: well_known::CORE_MODULE,
            refset_id,
            referenced_component_id: component_id,
            payload: RefsetPayload::Simple,
        }
    }

    fn fixture_store(dir: &tempfile::TempDir) -> ComponentStore {
        let store = ComponentStore::open(dir.path().join("store.db"), false).unwrap();
        store
            .put_concepts(&[make_concept(100), make_concept(200), make_concept(300)])
            .unwrap();
        store
            .put_relationships(&[
                make_is_a(1, 200, 100),
                make_is_a(2, 300, 200),
                make_edge(3, 300, 400, well_known::FINDING_SITE, 1, true),
                make_edge(4, 300, 100, well_known::IS_A, 0, false),
            ])
            .unwrap();
        store
    }

    #[test]
    fn closure_follows_active_is_a_edges() {
        let dir = tempfile::tempdir().unwrap();
        let store = fixture_store(&dir);

        let stats = build_indexes(&store).unwrap();
        assert_eq!(stats.relationships, 3); // the inactive edge is skipped
        assert_eq!(stats.cycles, 0);

        let mut descendants = store.descendants(100).unwrap();
        descendants.sort_unstable();
        assert_eq!(descendants, vec![200, 300]);
        assert_eq!(store.descendants(200).unwrap(), vec![300]);
        assert!(store.descendants(300).unwrap().is_empty());

        assert!(store.is_descendant_of(300, 100).unwrap());
        assert!(!store.is_descendant_of(100, 300).unwrap());

        let mut ancestors = store.ancestors(300).unwrap();
        ancestors.sort_unstable();
        assert_eq!(ancestors, vec![100, 200]);
    }

    #[test]
    fn edge_indexes_answer_typed_scans() {
        let dir = tempfile::tempdir().unwrap();
        let store = fixture_store(&dir);
        build_indexes(&store).unwrap();

        assert_eq!(
            store.parents_of_type(300, Some(well_known::IS_A)).unwrap(),
            vec![200]
        );
        assert_eq!(
            store
                .parents_of_type(300, Some(well_known::FINDING_SITE))
                .unwrap(),
            vec![400]
        );
        let mut all = store.parents_of_type(300, None).unwrap();
        all.sort_unstable();
        assert_eq!(all, vec![200, 400]);

        assert_eq!(
            store.children_of_type(100, Some(well_known::IS_A)).unwrap(),
            vec![200]
        );

        let edges = store.parent_edges(300).unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges
            .iter()
            .any(|e| e.type_id == well_known::FINDING_SITE && e.group == 1 && e.target == 400));
    }

    #[test]
    fn refset_membership_agrees_both_ways() {
        let dir = tempfile::tempdir().unwrap();
        let store = fixture_store(&dir);
        const R1: SctId = 900001;

        store
            .put_refset_items(&[
                make_member(R1, 200, true),
                make_member(R1, 300, true),
                make_member(R1, 100, false),
            ])
            .unwrap();
        let stats = build_indexes(&store).unwrap();
        assert_eq!(stats.memberships, 2);
        assert_eq!(stats.installed_refsets, 1);

        let mut members = store.members_of(R1).unwrap();
        members.sort_unstable();
        assert_eq!(members, vec![200, 300]);
        assert_eq!(store.member_count(R1).unwrap(), 2);

        for member in members {
            assert!(store.refsets_for(member).unwrap().contains(&R1));
        }
        assert!(store.refsets_for(100).unwrap().is_empty());
        assert!(store.members_of(424242).unwrap().is_empty());
        assert_eq!(store.installed_refsets().unwrap(), vec![R1]);
    }

    #[test]
    fn cycles_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = ComponentStore::open(dir.path().join("store.db"), false).unwrap();
        store
            .put_concepts(&[make_concept(1), make_concept(2), make_concept(3)])
            .unwrap();
        // 1 → 2 → 1 is a cycle; 3 → 1 hangs off it.
        store
            .put_relationships(&[
                make_is_a(10, 1, 2),
                make_is_a(11, 2, 1),
                make_is_a(12, 3, 1),
            ])
            .unwrap();

        let stats = build_indexes(&store).unwrap();
        assert_eq!(stats.cycles, 2);

        // Neither cycle participant descends from itself.
        assert!(!store.is_descendant_of(1, 1).unwrap());
        assert!(!store.is_descendant_of(2, 2).unwrap());
        // The concept below the cycle still reaches both participants.
        assert!(store.is_descendant_of(3, 1).unwrap());
        assert!(store.is_descendant_of(3, 2).unwrap());
    }

    #[test]
    fn rebuild_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = fixture_store(&dir);

        let first = build_indexes(&store).unwrap();
        let second = build_indexes(&store).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.descendants(200).unwrap(), vec![300]);
    }
}
