//! Well-known SNOMED CT concept identifiers.
//!
//! The subset of metadata concepts the engine itself relies on, plus the
//! top-level hierarchy roots clients most often anchor queries to.

use crate::SctId;

/// SNOMED CT root concept.
pub const ROOT: SctId = 138875005;

/// IS_A relationship type. Forms the concept hierarchy.
pub const IS_A: SctId = 116680003;

/// Finding site attribute.
pub const FINDING_SITE: SctId = 363698007;

/// Causative agent attribute.
pub const CAUSATIVE_AGENT: SctId = 246075003;

/// Has active ingredient attribute.
pub const HAS_ACTIVE_INGREDIENT: SctId = 127489000;

/// Clinical finding hierarchy.
pub const CLINICAL_FINDING: SctId = 404684003;

/// Procedure hierarchy.
pub const PROCEDURE: SctId = 71388002;

/// Body structure hierarchy.
pub const BODY_STRUCTURE: SctId = 123037004;

/// Pharmaceutical / biologic product hierarchy.
pub const PHARMACEUTICAL_PRODUCT: SctId = 373873005;

/// SNOMED CT core module.
pub const CORE_MODULE: SctId = 900000000000207008;

/// SNOMED CT model component module.
pub const MODEL_COMPONENT_MODULE: SctId = 900000000000012004;

/// US English language reference set.
pub const US_ENGLISH_LANGUAGE_REFSET: SctId = 900000000000509007;

/// GB English language reference set.
pub const GB_ENGLISH_LANGUAGE_REFSET: SctId = 900000000000508004;

/// "REPLACED BY" historical association reference set.
pub const REPLACED_BY_ASSOCIATION_REFSET: SctId = 900000000000526001;

/// "SAME AS" historical association reference set.
pub const SAME_AS_ASSOCIATION_REFSET: SctId = 900000000000527005;

/// ICD-10 simple map reference set.
pub const ICD10_SIMPLE_MAP_REFSET: SctId = 447562003;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_hold_published_ids() {
        assert_eq!(ROOT, 138875005);
        assert_eq!(IS_A, 116680003);
        assert_eq!(CLINICAL_FINDING, 404684003);
        assert_eq!(US_ENGLISH_LANGUAGE_REFSET, 900000000000509007);
    }
}
