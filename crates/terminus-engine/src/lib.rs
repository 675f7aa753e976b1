//! # terminus-engine
//!
//! The terminology engine facade: one handle unifying the component
//! store, the search index, and the ECL evaluator.
//!
//! A database directory holds the sled container (`store.db`) and the
//! search index (`search.db`). The lifecycle is import → index → query:
//!
//! ```no_run
//! use terminus_engine::{Engine, SearchRequest};
//!
//! let engine = Engine::open("./snomed-db", false)?;
//! engine.import(&["./SnomedCT_Release"])?;
//! engine.build_indexes()?;
//!
//! let infections = engine.expand_ecl("<< 40733004")?;
//! let hits = engine.search(&SearchRequest::new("infec"))?;
//! # let _ = (infections, hits);
//! # Ok::<(), terminus_engine::EngineError>(())
//! ```
//!
//! Reads are concurrent and lock-free once indexing completes. One
//! engine instance owns a database directory; a second opener is
//! rejected by the store's lock.

#![warn(missing_docs)]

mod error;
mod extended;
mod import;
mod provider;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use tracing::info;

use terminus_ecl::{evaluate, parse};
use terminus_rf2::discover_release_files;
use terminus_search::{DescriptionDocument, SearchIndex};
use terminus_store::{build_indexes as build_store_indexes, ComponentStore, StoreError};
use terminus_types::{
    Acceptability, Concept, Description, ExtendedConcept, RefsetPayload, SctId,
};

pub use error::EngineError;
pub use import::ImportStats;
pub use terminus_ecl::EclError;
pub use terminus_rf2::{ComponentKind, ReleaseFile, ReleaseType, Rf2Error};
pub use terminus_search::{SearchError, SearchHit, SearchRequest};
pub use terminus_store::{IndexError, IndexStats, StoreStatus};

use provider::StoreProvider;

const STORE_DIR: &str = "store.db";
const SEARCH_DIR: &str = "search.db";

/// Counts from a completed index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    /// Store-index counters.
    pub index: IndexStats,
    /// Description documents in the rebuilt search index.
    pub search_documents: usize,
}

/// Table and index counts for `status` reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatus {
    /// Component store counts.
    pub store: StoreStatus,
    /// Description documents in the search index.
    pub search_documents: u64,
}

/// The terminology service: a single read/write handle over one database
/// directory.
pub struct Engine {
    root: PathBuf,
    store: Option<ComponentStore>,
    search: SearchIndex,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Opens (or, unless `read_only`, creates) the database under `root`.
    pub fn open<P: AsRef<Path>>(root: P, read_only: bool) -> Result<Self, EngineError> {
        let root = root.as_ref().to_path_buf();
        if read_only && !root.exists() {
            return Err(EngineError::Usage(format!(
                "database directory not found: {}",
                root.display()
            )));
        }
        std::fs::create_dir_all(&root).map_err(StoreError::from)?;

        let store = ComponentStore::open(root.join(STORE_DIR), read_only)?;
        let search = SearchIndex::open(root.join(SEARCH_DIR))?;
        info!(root = %root.display(), read_only, "terminology database open");

        Ok(Self {
            root,
            store: Some(store),
            search,
        })
    }

    /// The database directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Closes the engine, releasing the store lock.
    pub fn close(self) {}

    fn store(&self) -> Result<&ComponentStore, EngineError> {
        self.store.as_ref().ok_or(EngineError::Closed)
    }

    // ── lifecycle ─────────────────────────────────────────────────────

    /// Reports the importable RF2 files under the given paths without
    /// touching the database.
    pub fn list_import_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ReleaseFile>, EngineError> {
        Ok(discover_release_files(paths)?)
    }

    /// Imports the RF2 files found under the given paths.
    ///
    /// The store is flagged needs-reindex for the duration; run
    /// [`build_indexes`](Self::build_indexes) afterwards. Importing the
    /// same release twice is a no-op for the second run.
    pub fn import<P: AsRef<Path>>(&self, paths: &[P]) -> Result<ImportStats, EngineError> {
        self.import_with_cancel(paths, &AtomicBool::new(false))
    }

    /// As [`import`](Self::import), stopping cooperatively between
    /// batches once `cancel` becomes true. In-flight batches complete, so
    /// no partial batch persists.
    pub fn import_with_cancel<P: AsRef<Path>>(
        &self,
        paths: &[P],
        cancel: &AtomicBool,
    ) -> Result<ImportStats, EngineError> {
        if paths.is_empty() {
            return Err(EngineError::Usage("no import paths given".to_string()));
        }
        let files = discover_release_files(paths)?;
        let store = self.store()?;
        let stats = import::run_import(store, &files, import::DEFAULT_BATCH_SIZE, cancel)?;
        store.flush()?;
        Ok(stats)
    }

    /// Rebuilds every derived index: relationship maps, IS_A closure,
    /// refset membership, and the full-text description index. Clears
    /// the needs-reindex flag on success.
    pub fn build_indexes(&self) -> Result<BuildStats, EngineError> {
        let store = self.store()?;
        let index = build_store_indexes(store)?;
        let search_documents = self.rebuild_search(store)?;
        store.set_dirty(false)?;
        store.flush()?;
        info!(
            relationships = index.relationships,
            descendant_edges = index.descendant_edges,
            memberships = index.memberships,
            search_documents,
            "indexes built"
        );
        Ok(BuildStats {
            index,
            search_documents,
        })
    }

    /// Rewrites the store container to reclaim space. All reads return
    /// identical results afterwards.
    pub fn compact(&mut self) -> Result<(), EngineError> {
        let store = self.store.take().ok_or(EngineError::Closed)?;
        let store = store.compact()?;
        self.store = Some(store);
        info!("store compacted");
        Ok(())
    }

    /// Current table and index counts.
    pub fn status(&self) -> Result<EngineStatus, EngineError> {
        Ok(EngineStatus {
            store: self.store()?.status()?,
            search_documents: self.search.num_docs(),
        })
    }

    // ── concept reads ─────────────────────────────────────────────────

    /// The retained concept row for `id`.
    pub fn concept(&self, id: SctId) -> Result<Option<Concept>, EngineError> {
        Ok(self.store()?.concept(id)?)
    }

    /// The concept projected together with its descriptions, aggregated
    /// ancestor relationships, and refset memberships.
    pub fn extended_concept(&self, id: SctId) -> Result<Option<ExtendedConcept>, EngineError> {
        Ok(extended::build(self.store()?, id)?)
    }

    /// All retained descriptions of a concept, active or not.
    pub fn descriptions(&self, concept_id: SctId) -> Result<Vec<Description>, EngineError> {
        Ok(self.store()?.descriptions_for(concept_id)?)
    }

    /// The active fully specified name of a concept.
    pub fn fully_specified_name(
        &self,
        concept_id: SctId,
    ) -> Result<Option<Description>, EngineError> {
        Ok(self
            .store()?
            .descriptions_for(concept_id)?
            .into_iter()
            .find(|d| d.active && d.is_fsn()))
    }

    /// The synonym preferred in any of the given language refsets,
    /// falling back to the first active synonym when no language refset
    /// marks one preferred.
    pub fn preferred_synonym(
        &self,
        concept_id: SctId,
        language_refsets: &[SctId],
    ) -> Result<Option<Description>, EngineError> {
        let store = self.store()?;
        let synonyms: Vec<Description> = store
            .descriptions_for(concept_id)?
            .into_iter()
            .filter(|d| d.active && d.is_synonym())
            .collect();

        for synonym in &synonyms {
            for member in store.refset_items_for(synonym.id)? {
                if language_refsets.contains(&member.refset_id) && member.is_preferred() {
                    return Ok(Some(synonym.clone()));
                }
            }
        }
        Ok(synonyms.into_iter().next())
    }

    /// True iff `child_id` is `parent_id` or one of its transitive IS_A
    /// descendants.
    pub fn subsumes(&self, parent_id: SctId, child_id: SctId) -> Result<bool, EngineError> {
        if parent_id == child_id {
            return Ok(self.store()?.has_concept(parent_id)?);
        }
        Ok(self.store()?.is_descendant_of(child_id, parent_id)?)
    }

    /// All transitive descendants of a concept (strict).
    pub fn descendants(&self, concept_id: SctId) -> Result<Vec<SctId>, EngineError> {
        Ok(self.store()?.descendants(concept_id)?)
    }

    /// Reference sets a component is an active member of.
    pub fn refsets_for(&self, component_id: SctId) -> Result<Vec<SctId>, EngineError> {
        Ok(self.store()?.refsets_for(component_id)?)
    }

    /// Active members of a reference set; empty when unknown.
    pub fn members_of(&self, refset_id: SctId) -> Result<Vec<SctId>, EngineError> {
        Ok(self.store()?.members_of(refset_id)?)
    }

    // ── search and ECL ────────────────────────────────────────────────

    /// Ranked full-text search over descriptions.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, EngineError> {
        Ok(self.search.search(request)?)
    }

    /// Evaluates an ECL expression to its concept-id set.
    pub fn expand_ecl(&self, expression: &str) -> Result<HashSet<SctId>, EngineError> {
        let constraint = parse(expression)?;
        let store = self.store()?;
        Ok(evaluate(&constraint, &StoreProvider::new(store))?)
    }

    /// Full-text search constrained to the concepts an ECL expression
    /// selects. Any concept filter already on the request intersects with
    /// the ECL result.
    pub fn search_with_ecl(
        &self,
        text: &str,
        expression: &str,
        mut request: SearchRequest,
    ) -> Result<Vec<SearchHit>, EngineError> {
        let allowed = self.expand_ecl(expression)?;
        request.text = text.to_string();
        request.concept_id_filter = Some(match request.concept_id_filter.take() {
            Some(existing) => existing.intersection(&allowed).copied().collect(),
            None => allowed,
        });
        self.search(&request)
    }

    // ── search index build ────────────────────────────────────────────

    /// One document per active description, denormalised with language
    /// acceptability and concept refset membership. Runs after the store
    /// indices so the membership scans see the fresh build.
    fn rebuild_search(&self, store: &ComponentStore) -> Result<usize, EngineError> {
        let mut preferred_in: HashMap<SctId, Vec<SctId>> = HashMap::new();
        let mut acceptable_in: HashMap<SctId, Vec<SctId>> = HashMap::new();
        for item in store.iter_refset_items() {
            let item = item?;
            if !item.active {
                continue;
            }
            if let RefsetPayload::Language { acceptability_id } = item.payload {
                match Acceptability::from_id(acceptability_id) {
                    Some(Acceptability::Preferred) => preferred_in
                        .entry(item.referenced_component_id)
                        .or_default()
                        .push(item.refset_id),
                    Some(Acceptability::Acceptable) => acceptable_in
                        .entry(item.referenced_component_id)
                        .or_default()
                        .push(item.refset_id),
                    None => {}
                }
            }
        }

        let mut documents = Vec::new();
        for concept in store.iter_concepts() {
            let concept = concept?;
            let descriptions = store.descriptions_for(concept.id)?;
            let refsets = store.refsets_for(concept.id)?;
            let preferred_term = choose_preferred_term(&descriptions, &preferred_in);

            for description in descriptions.into_iter().filter(|d| d.active) {
                documents.push(DescriptionDocument {
                    concept_id: concept.id,
                    description_id: description.id,
                    type_id: description.type_id,
                    concept_active: concept.active,
                    preferred_in: preferred_in
                        .get(&description.id)
                        .cloned()
                        .unwrap_or_default(),
                    acceptable_in: acceptable_in
                        .get(&description.id)
                        .cloned()
                        .unwrap_or_default(),
                    refsets: refsets.clone(),
                    preferred_term: preferred_term.clone(),
                    term: description.term,
                });
            }
        }

        Ok(self.search.rebuild(documents)?)
    }
}

/// A preferred synonym if any language refset marks one, else the first
/// active synonym, else the FSN.
fn choose_preferred_term(
    descriptions: &[Description],
    preferred_in: &HashMap<SctId, Vec<SctId>>,
) -> String {
    let active = descriptions.iter().filter(|d| d.active);
    let mut first_synonym = None;
    let mut fsn = None;
    for description in active {
        if description.is_synonym() {
            if preferred_in.contains_key(&description.id) {
                return description.term.clone();
            }
            first_synonym.get_or_insert(&description.term);
        } else if description.is_fsn() {
            fsn.get_or_insert(&description.term);
        }
    }
    first_synonym
        .or(fsn)
        .cloned()
        .unwrap_or_default()
}
