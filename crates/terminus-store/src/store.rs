//! The persistent component store.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use sled::transaction::{ConflictableTransactionResult, TransactionError};
use sled::{Batch, Db, Transactional, Tree};
use terminus_types::{well_known, Concept, Description, RefsetItem, Relationship, SctId};
use uuid::Uuid;

use crate::error::StoreError;
use crate::keys;

const NEEDS_REINDEX: &[u8] = b"needs_reindex";

/// Secondary index entries carry no value, only their composite key.
const EMPTY_VALUE: &[u8] = &[];

/// One decoded entry of a relationship index scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipEdge {
    /// Relationship type.
    pub type_id: SctId,
    /// Role group; 0 means ungrouped.
    pub group: u16,
    /// The concept at the far end of the edge.
    pub target: SctId,
    /// The relationship row behind this entry.
    pub relationship_id: SctId,
}

/// Row counts of the primary tables and indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStatus {
    /// Retained concept rows.
    pub concepts: usize,
    /// Retained description rows.
    pub descriptions: usize,
    /// Retained relationship rows.
    pub relationships: usize,
    /// Retained refset member rows.
    pub refset_items: usize,
    /// Distinct reference sets with active members.
    pub installed_refsets: usize,
    /// Transitive IS_A closure entries.
    pub descendant_edges: usize,
    /// Active component-to-refset membership entries.
    pub refset_memberships: usize,
    /// True when an import has not yet been followed by a successful
    /// index build.
    pub needs_reindex: bool,
}

/// Persistent ordered maps holding the terminology components and their
/// derived indices.
///
/// One instance owns the on-disk container; sled's directory lock rejects
/// a second opener. Reads are concurrent; writes are expected to come
/// from one writer per component type (the import pipeline's contract).
pub struct ComponentStore {
    pub(crate) path: PathBuf,
    pub(crate) read_only: bool,
    pub(crate) db: Db,
    pub(crate) concepts: Tree,
    pub(crate) descriptions: Tree,
    pub(crate) relationships: Tree,
    pub(crate) refset_items: Tree,
    pub(crate) concept_descriptions: Tree,
    pub(crate) parent_rels: Tree,
    pub(crate) child_rels: Tree,
    pub(crate) descendant_rels: Tree,
    pub(crate) installed_refsets: Tree,
    pub(crate) component_refsets: Tree,
    pub(crate) refset_members: Tree,
    pub(crate) refset_field_names: Tree,
    meta: Tree,
}

impl std::fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStore")
            .field("path", &self.path)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl ComponentStore {
    /// Opens (or creates) the container at `path`.
    ///
    /// A container already opened by another handle fails with
    /// [`StoreError::Locked`]. With `read_only`, every write operation
    /// fails with [`StoreError::ReadOnly`]; the on-disk files are still
    /// opened through sled, so the single-opener rule applies regardless.
    pub fn open<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let db = sled::Config::new()
            .path(&path)
            .open()
            .map_err(|source| classify_open_error(&path, source))?;

        let tree = |name: &str| -> Result<Tree, StoreError> { Ok(db.open_tree(name)?) };

        Ok(Self {
            concepts: tree("concepts")?,
            descriptions: tree("descriptions")?,
            relationships: tree("relationships")?,
            refset_items: tree("refset_items")?,
            concept_descriptions: tree("concept_descriptions")?,
            parent_rels: tree("concept_parent_relationships")?,
            child_rels: tree("concept_child_relationships")?,
            descendant_rels: tree("descendant_relationships")?,
            installed_refsets: tree("installed_refsets")?,
            component_refsets: tree("component_refsets")?,
            refset_members: tree("refset_members")?,
            refset_field_names: tree("refset_field_names")?,
            meta: tree("meta")?,
            path,
            read_only,
            db,
        })
    }

    /// The container path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when opened read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.read_only {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// True when an import has run without a subsequent successful index
    /// build.
    pub fn is_dirty(&self) -> Result<bool, StoreError> {
        Ok(self
            .meta
            .get(NEEDS_REINDEX)?
            .map(|v| v.as_ref() == &[1u8][..])
            .unwrap_or(false))
    }

    /// Marks or clears the needs-reindex flag.
    pub fn set_dirty(&self, dirty: bool) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.meta
            .insert(NEEDS_REINDEX, if dirty { &[1u8][..] } else { &[0u8][..] })?;
        Ok(())
    }

    /// Flushes buffered writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    // ── batched writes ────────────────────────────────────────────────

    /// Applies a concept batch with effective-time reconciliation.
    pub fn put_concepts(&self, batch: &[Concept]) -> Result<(), StoreError> {
        self.ensure_writable()?;
        let winners = latest_wins(batch.iter().map(|c| (c.id, c)), |c| {
            (c.effective_time, c.active)
        });

        let mut writes = Batch::default();
        let mut any = false;
        for (concept_id, concept) in winners {
            let key = keys::id(concept_id);
            if let Some(existing) = self.concepts.get(key)? {
                let old: Concept = bincode::deserialize(&existing)?;
                if !supersedes(
                    (concept.effective_time, concept.active),
                    (old.effective_time, old.active),
                ) {
                    continue;
                }
            }
            writes.insert(&key[..], bincode::serialize(concept)?);
            any = true;
        }
        if any {
            self.concepts.apply_batch(writes)?;
        }
        Ok(())
    }

    /// Applies a description batch, maintaining the concept-to-description
    /// index in the same transaction.
    pub fn put_descriptions(&self, batch: &[Description]) -> Result<(), StoreError> {
        self.ensure_writable()?;
        let winners = latest_wins(batch.iter().map(|d| (d.id, d)), |d| {
            (d.effective_time, d.active)
        });

        struct Op {
            key: [u8; 8],
            value: Vec<u8>,
            link: [u8; 16],
            stale_link: Option<[u8; 16]>,
        }

        let mut ops = Vec::new();
        for (description_id, description) in winners {
            let key = keys::id(description_id);
            let mut stale_link = None;
            if let Some(existing) = self.descriptions.get(key)? {
                let old: Description = bincode::deserialize(&existing)?;
                if !supersedes(
                    (description.effective_time, description.active),
                    (old.effective_time, old.active),
                ) {
                    continue;
                }
                if old.concept_id != description.concept_id {
                    stale_link = Some(keys::pair(old.concept_id, description_id));
                }
            }
            ops.push(Op {
                key,
                value: bincode::serialize(description)?,
                link: keys::pair(description.concept_id, description_id),
                stale_link,
            });
        }
        if ops.is_empty() {
            return Ok(());
        }

        (&self.descriptions, &self.concept_descriptions)
            .transaction(|(descriptions, links)| -> ConflictableTransactionResult<(), ()> {
                for op in &ops {
                    descriptions.insert(&op.key[..], op.value.clone())?;
                    if let Some(stale) = op.stale_link {
                        links.remove(&stale[..])?;
                    }
                    links.insert(&op.link[..], EMPTY_VALUE)?;
                }
                Ok(())
            })
            .map_err(|err| match err {
                TransactionError::Storage(source) => StoreError::Backend(source),
                TransactionError::Abort(()) => {
                    StoreError::corrupt("description batch aborted")
                }
            })?;
        Ok(())
    }

    /// Applies a relationship batch with effective-time reconciliation.
    /// The parent/child edge indices are derived later by the index build.
    pub fn put_relationships(&self, batch: &[Relationship]) -> Result<(), StoreError> {
        self.ensure_writable()?;
        let winners = latest_wins(batch.iter().map(|r| (r.id, r)), |r| {
            (r.effective_time, r.active)
        });

        let mut writes = Batch::default();
        let mut any = false;
        for (relationship_id, relationship) in winners {
            let key = keys::id(relationship_id);
            if let Some(existing) = self.relationships.get(key)? {
                let old: Relationship = bincode::deserialize(&existing)?;
                if !supersedes(
                    (relationship.effective_time, relationship.active),
                    (old.effective_time, old.active),
                ) {
                    continue;
                }
            }
            writes.insert(&key[..], bincode::serialize(relationship)?);
            any = true;
        }
        if any {
            self.relationships.apply_batch(writes)?;
        }
        Ok(())
    }

    /// Applies a refset member batch with effective-time reconciliation.
    pub fn put_refset_items(&self, batch: &[RefsetItem]) -> Result<(), StoreError> {
        self.ensure_writable()?;
        let winners = latest_wins(batch.iter().map(|m| (m.id, m)), |m| {
            (m.effective_time, m.active)
        });

        let mut writes = Batch::default();
        let mut any = false;
        for (member_id, member) in winners {
            let key = *member_id.as_bytes();
            if let Some(existing) = self.refset_items.get(key)? {
                let old: RefsetItem = bincode::deserialize(&existing)?;
                if !supersedes(
                    (member.effective_time, member.active),
                    (old.effective_time, old.active),
                ) {
                    continue;
                }
            }
            writes.insert(&key[..], bincode::serialize(member)?);
            any = true;
        }
        if any {
            self.refset_items.apply_batch(writes)?;
        }
        Ok(())
    }

    /// Records the extension column names of a refset's schema.
    pub fn put_refset_field_names(
        &self,
        refset_id: SctId,
        names: &[String],
    ) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.refset_field_names
            .insert(&keys::id(refset_id)[..], bincode::serialize(&names)?)?;
        Ok(())
    }

    /// Returns the recorded extension column names for a refset.
    pub fn refset_field_names(&self, refset_id: SctId) -> Result<Option<Vec<String>>, StoreError> {
        match self.refset_field_names.get(keys::id(refset_id))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    // ── point reads ───────────────────────────────────────────────────

    /// Returns the retained concept row for `id`.
    pub fn concept(&self, id: SctId) -> Result<Option<Concept>, StoreError> {
        decode_opt(self.concepts.get(keys::id(id))?)
    }

    /// Returns the retained description row for `id`.
    pub fn description(&self, id: SctId) -> Result<Option<Description>, StoreError> {
        decode_opt(self.descriptions.get(keys::id(id))?)
    }

    /// Returns the retained relationship row for `id`.
    pub fn relationship(&self, id: SctId) -> Result<Option<Relationship>, StoreError> {
        decode_opt(self.relationships.get(keys::id(id))?)
    }

    /// Returns the retained refset member row for `id`.
    pub fn refset_item(&self, id: &Uuid) -> Result<Option<RefsetItem>, StoreError> {
        decode_opt(self.refset_items.get(id.as_bytes())?)
    }

    /// True if a concept row is retained for `id`.
    pub fn has_concept(&self, id: SctId) -> Result<bool, StoreError> {
        Ok(self.concepts.contains_key(keys::id(id))?)
    }

    // ── prefix scans ──────────────────────────────────────────────────

    /// All descriptions of a concept, in description-id order.
    pub fn descriptions_for(&self, concept_id: SctId) -> Result<Vec<Description>, StoreError> {
        let mut out = Vec::new();
        for item in self.concept_descriptions.scan_prefix(keys::id(concept_id)) {
            let (key, _) = item?;
            let description_id = keys::decode_pair_tail(&key)?;
            if let Some(description) = self.description(description_id)? {
                out.push(description);
            }
        }
        Ok(out)
    }

    /// Forward (source-to-destination) edges of a concept from the
    /// relationship index.
    pub fn parent_edges(&self, source_id: SctId) -> Result<Vec<RelationshipEdge>, StoreError> {
        scan_edges(&self.parent_rels, keys::id(source_id))
    }

    /// Reverse (destination-to-source) edges of a concept from the
    /// relationship index.
    pub fn child_edges(&self, destination_id: SctId) -> Result<Vec<RelationshipEdge>, StoreError> {
        scan_edges(&self.child_rels, keys::id(destination_id))
    }

    /// Destinations of the concept's edges, optionally restricted to one
    /// relationship type.
    pub fn parents_of_type(
        &self,
        concept_id: SctId,
        type_id: Option<SctId>,
    ) -> Result<Vec<SctId>, StoreError> {
        scan_edge_targets(&self.parent_rels, concept_id, type_id)
    }

    /// Sources of the edges pointing at the concept, optionally restricted
    /// to one relationship type.
    pub fn children_of_type(
        &self,
        concept_id: SctId,
        type_id: Option<SctId>,
    ) -> Result<Vec<SctId>, StoreError> {
        scan_edge_targets(&self.child_rels, concept_id, type_id)
    }

    /// All transitive descendants of a concept (strict: never includes the
    /// concept itself).
    pub fn descendants(&self, concept_id: SctId) -> Result<Vec<SctId>, StoreError> {
        let mut out = Vec::new();
        for item in self.descendant_rels.scan_prefix(keys::id(concept_id)) {
            let (key, _) = item?;
            out.push(keys::decode_pair_tail(&key)?);
        }
        Ok(out)
    }

    /// Number of transitive descendants, for query planning.
    pub fn descendant_count(&self, concept_id: SctId) -> Result<usize, StoreError> {
        let mut count = 0;
        for item in self.descendant_rels.scan_prefix(keys::id(concept_id)) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// True if `descendant_id` lies below `ancestor_id` in the IS_A
    /// closure.
    pub fn is_descendant_of(
        &self,
        descendant_id: SctId,
        ancestor_id: SctId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .descendant_rels
            .contains_key(keys::pair(ancestor_id, descendant_id))?)
    }

    /// All transitive ancestors of a concept (strict), by walking the
    /// parent edge index upward.
    pub fn ancestors(&self, concept_id: SctId) -> Result<Vec<SctId>, StoreError> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<SctId> = self
            .parents_of_type(concept_id, Some(well_known::IS_A))?
            .into();
        while let Some(current) = queue.pop_front() {
            if seen.insert(current) {
                for parent in self.parents_of_type(current, Some(well_known::IS_A))? {
                    queue.push_back(parent);
                }
            }
        }
        seen.remove(&concept_id);
        Ok(seen.into_iter().collect())
    }

    /// The active refset member rows referencing a component.
    pub fn refset_items_for(&self, component_id: SctId) -> Result<Vec<RefsetItem>, StoreError> {
        let mut out = Vec::new();
        for item in self.component_refsets.scan_prefix(keys::id(component_id)) {
            let (key, _) = item?;
            if key.len() != 32 {
                return Err(StoreError::corrupt(format!(
                    "membership key of length {}",
                    key.len()
                )));
            }
            let member_id = Uuid::from_slice(&key[16..32])
                .map_err(|_| StoreError::corrupt("membership key uuid"))?;
            if let Some(member) = self.refset_item(&member_id)? {
                out.push(member);
            }
        }
        Ok(out)
    }

    /// Reference sets the component is an active member of.
    pub fn refsets_for(&self, component_id: SctId) -> Result<Vec<SctId>, StoreError> {
        let mut out = BTreeSet::new();
        for item in self.component_refsets.scan_prefix(keys::id(component_id)) {
            let (key, _) = item?;
            if key.len() != 32 {
                return Err(StoreError::corrupt(format!(
                    "membership key of length {}",
                    key.len()
                )));
            }
            out.insert(keys::read_u64(&key[8..16]));
        }
        Ok(out.into_iter().collect())
    }

    /// Active members of a reference set. An unknown refset id yields an
    /// empty set.
    pub fn members_of(&self, refset_id: SctId) -> Result<Vec<SctId>, StoreError> {
        let mut out = Vec::new();
        for item in self.refset_members.scan_prefix(keys::id(refset_id)) {
            let (key, _) = item?;
            out.push(keys::decode_pair_tail(&key)?);
        }
        Ok(out)
    }

    /// Number of active members of a reference set, for query planning.
    pub fn member_count(&self, refset_id: SctId) -> Result<usize, StoreError> {
        let mut count = 0;
        for item in self.refset_members.scan_prefix(keys::id(refset_id)) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Reference sets that have at least one active member.
    pub fn installed_refsets(&self) -> Result<Vec<SctId>, StoreError> {
        let mut out = Vec::new();
        for item in self.installed_refsets.iter() {
            let (key, _) = item?;
            if key.len() != 8 {
                return Err(StoreError::corrupt(format!(
                    "installed refset key of length {}",
                    key.len()
                )));
            }
            out.push(keys::read_u64(&key));
        }
        Ok(out)
    }

    // ── full scans (index and search builds) ──────────────────────────

    /// Iterates every retained concept row.
    pub fn iter_concepts(&self) -> impl Iterator<Item = Result<Concept, StoreError>> + '_ {
        self.concepts.iter().map(decode_iter_item)
    }

    /// Iterates every retained description row.
    pub fn iter_descriptions(&self) -> impl Iterator<Item = Result<Description, StoreError>> + '_ {
        self.descriptions.iter().map(decode_iter_item)
    }

    /// Iterates every retained relationship row.
    pub fn iter_relationships(
        &self,
    ) -> impl Iterator<Item = Result<Relationship, StoreError>> + '_ {
        self.relationships.iter().map(decode_iter_item)
    }

    /// Iterates every retained refset member row.
    pub fn iter_refset_items(&self) -> impl Iterator<Item = Result<RefsetItem, StoreError>> + '_ {
        self.refset_items.iter().map(decode_iter_item)
    }

    // ── maintenance ───────────────────────────────────────────────────

    /// Current row counts.
    pub fn status(&self) -> Result<StoreStatus, StoreError> {
        Ok(StoreStatus {
            concepts: self.concepts.len(),
            descriptions: self.descriptions.len(),
            relationships: self.relationships.len(),
            refset_items: self.refset_items.len(),
            installed_refsets: self.installed_refsets.len(),
            descendant_edges: self.descendant_rels.len(),
            refset_memberships: self.component_refsets.len(),
            needs_reindex: self.is_dirty()?,
        })
    }

    /// Rewrites the container to reclaim space, preserving logical
    /// contents exactly. Consumes the handle and returns a fresh one over
    /// the rewritten container.
    pub fn compact(self) -> Result<Self, StoreError> {
        self.ensure_writable()?;
        let path = self.path.clone();
        let read_only = self.read_only;

        let staging = path.with_extension("compacting");
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }

        {
            let fresh = sled::Config::new()
                .path(&staging)
                .open()
                .map_err(|source| classify_open_error(&staging, source))?;
            fresh.import(self.db.export());
            fresh.flush()?;
        }

        // Release our lock before swapping directories.
        drop(self);

        let retired = path.with_extension("retired");
        if retired.exists() {
            fs::remove_dir_all(&retired)?;
        }
        fs::rename(&path, &retired)?;
        fs::rename(&staging, &path)?;
        fs::remove_dir_all(&retired)?;

        Self::open(&path, read_only)
    }
}

fn classify_open_error(path: &Path, source: sled::Error) -> StoreError {
    let locked = match &source {
        sled::Error::Io(io) => {
            io.kind() == std::io::ErrorKind::WouldBlock
                || io.to_string().to_ascii_lowercase().contains("lock")
        }
        _ => false,
    };
    if locked {
        StoreError::Locked {
            path: path.display().to_string(),
        }
    } else {
        StoreError::Open {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Keeps the record with the greatest effective time; an equal time
/// prefers the active row.
fn supersedes(new: (u32, bool), old: (u32, bool)) -> bool {
    new.0 > old.0 || (new.0 == old.0 && new.1 && !old.1)
}

/// Reconciles duplicates within a single batch under the same rule
/// applied against the stored rows.
fn latest_wins<K, T, I, F>(items: I, meta: F) -> HashMap<K, T>
where
    K: Eq + Hash,
    I: Iterator<Item = (K, T)>,
    F: Fn(&T) -> (u32, bool),
{
    let mut winners: HashMap<K, T> = HashMap::new();
    for (key, item) in items {
        match winners.get(&key) {
            Some(current) if !supersedes(meta(&item), meta(current)) => {}
            _ => {
                winners.insert(key, item);
            }
        }
    }
    winners
}

fn decode_opt<T: serde::de::DeserializeOwned>(
    value: Option<sled::IVec>,
) -> Result<Option<T>, StoreError> {
    match value {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

fn decode_iter_item<T: serde::de::DeserializeOwned>(
    item: Result<(sled::IVec, sled::IVec), sled::Error>,
) -> Result<T, StoreError> {
    let (_, value) = item?;
    Ok(bincode::deserialize(&value)?)
}

fn scan_edges(tree: &Tree, prefix: [u8; 8]) -> Result<Vec<RelationshipEdge>, StoreError> {
    let mut out = Vec::new();
    for item in tree.scan_prefix(prefix) {
        let (key, _) = item?;
        let (type_id, group, target, relationship_id) = keys::decode_relationship(&key)?;
        out.push(RelationshipEdge {
            type_id,
            group,
            target,
            relationship_id,
        });
    }
    Ok(out)
}

fn scan_edge_targets(
    tree: &Tree,
    concept_id: SctId,
    type_id: Option<SctId>,
) -> Result<Vec<SctId>, StoreError> {
    let prefix: Vec<u8> = match type_id {
        Some(type_id) => keys::pair(concept_id, type_id).to_vec(),
        None => keys::id(concept_id).to_vec(),
    };
    let mut out = BTreeSet::new();
    for item in tree.scan_prefix(prefix) {
        let (key, _) = item?;
        let (_, _, target, _) = keys::decode_relationship(&key)?;
        out.insert(target);
    }
    Ok(out.into_iter().collect())
}
