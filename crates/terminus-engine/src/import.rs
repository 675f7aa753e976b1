//! The RF2 import pipeline.
//!
//! Parser workers fan out over the release files on the rayon pool; each
//! worker streams records and groups them into per-component-type
//! batches. Batches travel over bounded channels, so a slow writer
//! backpressures the parsers, and exactly one writer per component type
//! applies them to the store in submission order.
//!
//! A failure in any task raises a shared flag; workers stop at the next
//! batch boundary, writers stop at the next batch, and already-committed
//! batches remain. The store stays flagged needs-reindex until a
//! subsequent index build succeeds. Cancellation works the same way,
//! between batches, so no partial batch is ever persisted.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

use rayon::prelude::*;
use terminus_rf2::{Record, RecordReader, ReleaseFile};
use terminus_store::{ComponentStore, StoreError};
use terminus_types::{Concept, Description, RefsetItem, Relationship, SctId};
use tracing::{debug, info};

use crate::EngineError;

/// Records per batch handed to a writer.
pub(crate) const DEFAULT_BATCH_SIZE: usize = 5_000;

/// Batches in flight per component type before senders block.
const QUEUE_DEPTH: usize = 4;

/// Record counts from a completed import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Release files parsed.
    pub files: usize,
    /// Concept rows submitted to the store.
    pub concepts: usize,
    /// Description rows submitted to the store.
    pub descriptions: usize,
    /// Relationship rows submitted to the store.
    pub relationships: usize,
    /// Refset member rows submitted to the store.
    pub refset_items: usize,
}

enum RefsetMessage {
    Batch(Vec<RefsetItem>),
    Schema(SctId, Vec<String>),
}

pub(crate) fn run_import(
    store: &ComponentStore,
    files: &[ReleaseFile],
    batch_size: usize,
    cancel: &AtomicBool,
) -> Result<ImportStats, EngineError> {
    if files.is_empty() {
        return Err(EngineError::Usage(
            "no importable release files found".to_string(),
        ));
    }
    store.set_dirty(true)?;

    let failed = AtomicBool::new(false);
    let failed = &failed;

    let (concept_tx, concept_rx) = sync_channel::<Vec<Concept>>(QUEUE_DEPTH);
    let (description_tx, description_rx) = sync_channel::<Vec<Description>>(QUEUE_DEPTH);
    let (relationship_tx, relationship_rx) = sync_channel::<Vec<Relationship>>(QUEUE_DEPTH);
    let (refset_tx, refset_rx) = sync_channel::<RefsetMessage>(QUEUE_DEPTH);

    let (worker_result, writer_results) = std::thread::scope(|scope| {
        let concept_writer =
            scope.spawn(move || drain(concept_rx, failed, |batch| store.put_concepts(batch)));
        let description_writer = scope.spawn(move || {
            drain(description_rx, failed, |batch| store.put_descriptions(batch))
        });
        let relationship_writer = scope.spawn(move || {
            drain(relationship_rx, failed, |batch| {
                store.put_relationships(batch)
            })
        });
        let refset_writer = scope.spawn(move || drain_refsets(refset_rx, failed, store));

        let worker_result = files.par_iter().try_for_each(|file| {
            parse_file(
                file,
                batch_size,
                failed,
                cancel,
                &concept_tx,
                &description_tx,
                &relationship_tx,
                &refset_tx,
            )
        });

        // Close the channels so the writers drain and stop.
        drop(concept_tx);
        drop(description_tx);
        drop(relationship_tx);
        drop(refset_tx);

        let writer_results = [
            concept_writer.join(),
            description_writer.join(),
            relationship_writer.join(),
            refset_writer.join(),
        ];
        (worker_result, writer_results)
    });

    let mut counts = [0usize; 4];
    for (slot, joined) in counts.iter_mut().zip(writer_results) {
        match joined {
            Ok(Ok(written)) => *slot = written,
            Ok(Err(store_err)) => return Err(store_err.into()),
            Err(_) => return Err(EngineError::Aborted),
        }
    }
    worker_result?;

    let stats = ImportStats {
        files: files.len(),
        concepts: counts[0],
        descriptions: counts[1],
        relationships: counts[2],
        refset_items: counts[3],
    };
    info!(
        files = stats.files,
        concepts = stats.concepts,
        descriptions = stats.descriptions,
        relationships = stats.relationships,
        refset_items = stats.refset_items,
        "import committed"
    );
    Ok(stats)
}

/// Single writer for one component type: applies batches in arrival
/// order, raising the shared failure flag if the store rejects one.
fn drain<T>(
    rx: Receiver<Vec<T>>,
    failed: &AtomicBool,
    mut apply: impl FnMut(&[T]) -> Result<(), StoreError>,
) -> Result<usize, StoreError> {
    let mut written = 0;
    for batch in rx {
        match apply(&batch) {
            Ok(()) => written += batch.len(),
            Err(err) => {
                failed.store(true, Ordering::SeqCst);
                return Err(err);
            }
        }
    }
    Ok(written)
}

fn drain_refsets(
    rx: Receiver<RefsetMessage>,
    failed: &AtomicBool,
    store: &ComponentStore,
) -> Result<usize, StoreError> {
    let mut written = 0;
    for message in rx {
        let applied = match message {
            RefsetMessage::Batch(batch) => {
                store.put_refset_items(&batch).map(|()| batch.len())
            }
            RefsetMessage::Schema(refset_id, fields) => {
                store.put_refset_field_names(refset_id, &fields).map(|()| 0)
            }
        };
        match applied {
            Ok(count) => written += count,
            Err(err) => {
                failed.store(true, Ordering::SeqCst);
                return Err(err);
            }
        }
    }
    Ok(written)
}

#[allow(clippy::too_many_arguments)]
fn parse_file(
    file: &ReleaseFile,
    batch_size: usize,
    failed: &AtomicBool,
    cancel: &AtomicBool,
    concepts: &SyncSender<Vec<Concept>>,
    descriptions: &SyncSender<Vec<Description>>,
    relationships: &SyncSender<Vec<Relationship>>,
    refsets: &SyncSender<RefsetMessage>,
) -> Result<(), EngineError> {
    checkpoint(failed, cancel)?;

    let mut reader = match RecordReader::open(file) {
        Ok(reader) => reader,
        Err(err) => {
            failed.store(true, Ordering::SeqCst);
            return Err(err.into());
        }
    };
    let schema_fields = reader.refset_schema().map(|s| s.field_names());

    let mut concept_batch: Vec<Concept> = Vec::new();
    let mut description_batch: Vec<Description> = Vec::new();
    let mut relationship_batch: Vec<Relationship> = Vec::new();
    let mut refset_batch: Vec<RefsetItem> = Vec::new();
    let mut refset_ids: BTreeSet<SctId> = BTreeSet::new();

    for record in reader.by_ref() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                failed.store(true, Ordering::SeqCst);
                return Err(err.into());
            }
        };
        match record {
            Record::Concept(concept) => {
                concept_batch.push(concept);
                if concept_batch.len() >= batch_size {
                    checkpoint(failed, cancel)?;
                    send(concepts, &mut concept_batch)?;
                }
            }
            Record::Description(description) => {
                description_batch.push(description);
                if description_batch.len() >= batch_size {
                    checkpoint(failed, cancel)?;
                    send(descriptions, &mut description_batch)?;
                }
            }
            Record::Relationship(relationship) => {
                relationship_batch.push(relationship);
                if relationship_batch.len() >= batch_size {
                    checkpoint(failed, cancel)?;
                    send(relationships, &mut relationship_batch)?;
                }
            }
            Record::RefsetItem(item) => {
                refset_ids.insert(item.refset_id);
                refset_batch.push(item);
                if refset_batch.len() >= batch_size {
                    checkpoint(failed, cancel)?;
                    send_refsets(refsets, &mut refset_batch)?;
                }
            }
        }
    }

    checkpoint(failed, cancel)?;
    send(concepts, &mut concept_batch)?;
    send(descriptions, &mut description_batch)?;
    send(relationships, &mut relationship_batch)?;
    send_refsets(refsets, &mut refset_batch)?;

    if let Some(fields) = schema_fields {
        for refset_id in refset_ids {
            refsets
                .send(RefsetMessage::Schema(refset_id, fields.clone()))
                .map_err(|_| EngineError::Aborted)?;
        }
    }

    debug!(file = %file.file_name(), "release file parsed");
    Ok(())
}

fn checkpoint(failed: &AtomicBool, cancel: &AtomicBool) -> Result<(), EngineError> {
    if failed.load(Ordering::SeqCst) {
        return Err(EngineError::Aborted);
    }
    if cancel.load(Ordering::SeqCst) {
        return Err(EngineError::Cancelled);
    }
    Ok(())
}

fn send<T>(tx: &SyncSender<Vec<T>>, batch: &mut Vec<T>) -> Result<(), EngineError> {
    if batch.is_empty() {
        return Ok(());
    }
    tx.send(std::mem::take(batch))
        .map_err(|_| EngineError::Aborted)
}

fn send_refsets(
    tx: &SyncSender<RefsetMessage>,
    batch: &mut Vec<RefsetItem>,
) -> Result<(), EngineError> {
    if batch.is_empty() {
        return Ok(());
    }
    tx.send(RefsetMessage::Batch(std::mem::take(batch)))
        .map_err(|_| EngineError::Aborted)
}
