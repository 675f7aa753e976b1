//! Composite key encoding.
//!
//! Secondary index keys are concatenations of big-endian fixed-width
//! fields, so the tree's lexicographic byte order equals tuple order and
//! a prefix of leading fields selects a contiguous key range.

use terminus_types::SctId;
use uuid::Uuid;

use crate::error::StoreError;

/// A single id key.
pub fn id(id: SctId) -> [u8; 8] {
    id.to_be_bytes()
}

/// A `(a, b)` pair key.
pub fn pair(a: SctId, b: SctId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&a.to_be_bytes());
    key[8..].copy_from_slice(&b.to_be_bytes());
    key
}

/// A relationship index key:
/// `(head, type, group, tail, relationship_id)`.
///
/// For the parent index head/tail are source/destination; the child index
/// swaps them.
pub fn relationship(
    head: SctId,
    type_id: SctId,
    group: u16,
    tail: SctId,
    relationship_id: SctId,
) -> [u8; 34] {
    let mut key = [0u8; 34];
    key[..8].copy_from_slice(&head.to_be_bytes());
    key[8..16].copy_from_slice(&type_id.to_be_bytes());
    key[16..18].copy_from_slice(&group.to_be_bytes());
    key[18..26].copy_from_slice(&tail.to_be_bytes());
    key[26..34].copy_from_slice(&relationship_id.to_be_bytes());
    key
}

/// Decodes the tail of a relationship index key:
/// `(type_id, group, tail, relationship_id)`.
pub fn decode_relationship(key: &[u8]) -> Result<(SctId, u16, SctId, SctId), StoreError> {
    if key.len() != 34 {
        return Err(StoreError::corrupt(format!(
            "relationship index key of length {}",
            key.len()
        )));
    }
    Ok((
        read_u64(&key[8..16]),
        u16::from_be_bytes([key[16], key[17]]),
        read_u64(&key[18..26]),
        read_u64(&key[26..34]),
    ))
}

/// A `(component, refset, member)` membership key.
pub fn membership(component: SctId, refset: SctId, member: Uuid) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..8].copy_from_slice(&component.to_be_bytes());
    key[8..16].copy_from_slice(&refset.to_be_bytes());
    key[16..].copy_from_slice(member.as_bytes());
    key
}

/// Reads a big-endian `u64` at a fixed offset of a composite key.
pub fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}

/// Decodes the second field of a pair key.
pub fn decode_pair_tail(key: &[u8]) -> Result<SctId, StoreError> {
    if key.len() != 16 {
        return Err(StoreError::corrupt(format!(
            "pair key of length {}",
            key.len()
        )));
    }
    Ok(read_u64(&key[8..16]))
}
