//! SNOMED CT identifier type.

/// A SNOMED CT identifier (SCTID).
///
/// SCTIDs are 64-bit unsigned integers identifying components within
/// SNOMED CT. The engine treats them as opaque: partition digits and the
/// Verhoeff check digit are never interpreted.
///
/// # Examples
///
/// ```
/// use terminus_types::SctId;
///
/// let concept_id: SctId = 73211009; // Diabetes mellitus
/// let is_a: SctId = 116680003;      // IS_A relationship type
/// ```
pub type SctId = u64;
