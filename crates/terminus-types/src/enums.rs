//! Enumerations for SNOMED CT coded values.
//!
//! Each enum pairs the coded SCTIDs with a Rust value and offers
//! `from_id` / `to_id` conversions. Unrecognised ids convert to `None`
//! rather than failing: releases add metadata concepts over time.

use serde::{Deserialize, Serialize};

use crate::SctId;

/// Definition status of a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefinitionStatus {
    /// Necessary conditions only.
    Primitive,
    /// Necessary and sufficient conditions.
    FullyDefined,
}

impl DefinitionStatus {
    /// SCTID for primitive definition status.
    pub const PRIMITIVE_ID: SctId = 900000000000074008;
    /// SCTID for fully defined definition status.
    pub const FULLY_DEFINED_ID: SctId = 900000000000073002;

    /// Converts from an SCTID, if recognised.
    pub fn from_id(id: SctId) -> Option<Self> {
        match id {
            Self::PRIMITIVE_ID => Some(Self::Primitive),
            Self::FULLY_DEFINED_ID => Some(Self::FullyDefined),
            _ => None,
        }
    }

    /// Converts to the corresponding SCTID.
    pub fn to_id(self) -> SctId {
        match self {
            Self::Primitive => Self::PRIMITIVE_ID,
            Self::FullyDefined => Self::FULLY_DEFINED_ID,
        }
    }
}

/// Description type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptionType {
    /// Fully Specified Name: unambiguous, with semantic tag.
    Fsn,
    /// Synonym: acceptable alternative term.
    Synonym,
    /// Textual definition.
    Definition,
}

impl DescriptionType {
    /// SCTID for the FSN description type.
    pub const FSN_ID: SctId = 900000000000003001;
    /// SCTID for the synonym description type.
    pub const SYNONYM_ID: SctId = 900000000000013009;
    /// SCTID for the definition description type.
    pub const DEFINITION_ID: SctId = 900000000000550004;

    /// Converts from an SCTID, if recognised.
    pub fn from_id(id: SctId) -> Option<Self> {
        match id {
            Self::FSN_ID => Some(Self::Fsn),
            Self::SYNONYM_ID => Some(Self::Synonym),
            Self::DEFINITION_ID => Some(Self::Definition),
            _ => None,
        }
    }

    /// Converts to the corresponding SCTID.
    pub fn to_id(self) -> SctId {
        match self {
            Self::Fsn => Self::FSN_ID,
            Self::Synonym => Self::SYNONYM_ID,
            Self::Definition => Self::DEFINITION_ID,
        }
    }
}

/// Acceptability of a description within a language reference set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Acceptability {
    /// The preferred term for the dialect.
    Preferred,
    /// Acceptable but not preferred.
    Acceptable,
}

impl Acceptability {
    /// SCTID for preferred acceptability.
    pub const PREFERRED_ID: SctId = 900000000000548007;
    /// SCTID for acceptable acceptability.
    pub const ACCEPTABLE_ID: SctId = 900000000000549004;

    /// Converts from an SCTID, if recognised.
    pub fn from_id(id: SctId) -> Option<Self> {
        match id {
            Self::PREFERRED_ID => Some(Self::Preferred),
            Self::ACCEPTABLE_ID => Some(Self::Acceptable),
            _ => None,
        }
    }

    /// Converts to the corresponding SCTID.
    pub fn to_id(self) -> SctId {
        match self {
            Self::Preferred => Self::PREFERRED_ID,
            Self::Acceptable => Self::ACCEPTABLE_ID,
        }
    }
}

/// Case significance of a description term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseSignificance {
    /// Entire term case insensitive.
    CaseInsensitive,
    /// Entire term case sensitive.
    EntireTermCaseSensitive,
    /// Only the initial character is case sensitive.
    InitialCharacterCaseSensitive,
}

impl CaseSignificance {
    /// SCTID for case insensitive.
    pub const CASE_INSENSITIVE_ID: SctId = 900000000000448009;
    /// SCTID for entire term case sensitive.
    pub const ENTIRE_TERM_CASE_SENSITIVE_ID: SctId = 900000000000017005;
    /// SCTID for initial character case sensitive.
    pub const INITIAL_CHAR_CASE_SENSITIVE_ID: SctId = 900000000000020002;

    /// Converts from an SCTID, if recognised.
    pub fn from_id(id: SctId) -> Option<Self> {
        match id {
            Self::CASE_INSENSITIVE_ID => Some(Self::CaseInsensitive),
            Self::ENTIRE_TERM_CASE_SENSITIVE_ID => Some(Self::EntireTermCaseSensitive),
            Self::INITIAL_CHAR_CASE_SENSITIVE_ID => Some(Self::InitialCharacterCaseSensitive),
            _ => None,
        }
    }

    /// Converts to the corresponding SCTID.
    pub fn to_id(self) -> SctId {
        match self {
            Self::CaseInsensitive => Self::CASE_INSENSITIVE_ID,
            Self::EntireTermCaseSensitive => Self::ENTIRE_TERM_CASE_SENSITIVE_ID,
            Self::InitialCharacterCaseSensitive => Self::INITIAL_CHAR_CASE_SENSITIVE_ID,
        }
    }
}

/// Characteristic type of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacteristicType {
    /// As authored.
    Stated,
    /// Computed by the classifier.
    Inferred,
    /// Additional (non-defining).
    Additional,
}

impl CharacteristicType {
    /// SCTID for stated relationships.
    pub const STATED_ID: SctId = 900000000000010007;
    /// SCTID for inferred relationships.
    pub const INFERRED_ID: SctId = 900000000000011006;
    /// SCTID for additional relationships.
    pub const ADDITIONAL_ID: SctId = 900000000000227009;

    /// Converts from an SCTID, if recognised.
    pub fn from_id(id: SctId) -> Option<Self> {
        match id {
            Self::STATED_ID => Some(Self::Stated),
            Self::INFERRED_ID => Some(Self::Inferred),
            Self::ADDITIONAL_ID => Some(Self::Additional),
            _ => None,
        }
    }

    /// Converts to the corresponding SCTID.
    pub fn to_id(self) -> SctId {
        match self {
            Self::Stated => Self::STATED_ID,
            Self::Inferred => Self::INFERRED_ID,
            Self::Additional => Self::ADDITIONAL_ID,
        }
    }
}

/// Relationship quantification modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierType {
    /// Existential (some).
    Existential,
    /// Universal (all).
    Universal,
}

impl ModifierType {
    /// SCTID for the existential modifier.
    pub const EXISTENTIAL_ID: SctId = 900000000000451002;
    /// SCTID for the universal modifier.
    pub const UNIVERSAL_ID: SctId = 900000000000450001;

    /// Converts from an SCTID, if recognised.
    pub fn from_id(id: SctId) -> Option<Self> {
        match id {
            Self::EXISTENTIAL_ID => Some(Self::Existential),
            Self::UNIVERSAL_ID => Some(Self::Universal),
            _ => None,
        }
    }

    /// Converts to the corresponding SCTID.
    pub fn to_id(self) -> SctId {
        match self {
            Self::Existential => Self::EXISTENTIAL_ID,
            Self::Universal => Self::UNIVERSAL_ID,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_status_roundtrip() {
        assert_eq!(
            DefinitionStatus::from_id(DefinitionStatus::PRIMITIVE_ID),
            Some(DefinitionStatus::Primitive)
        );
        assert_eq!(DefinitionStatus::from_id(12345), None);
        assert_eq!(
            DefinitionStatus::FullyDefined.to_id(),
            DefinitionStatus::FULLY_DEFINED_ID
        );
    }

    #[test]
    fn description_type_roundtrip() {
        for ty in [
            DescriptionType::Fsn,
            DescriptionType::Synonym,
            DescriptionType::Definition,
        ] {
            assert_eq!(DescriptionType::from_id(ty.to_id()), Some(ty));
        }
    }

    #[test]
    fn acceptability_roundtrip() {
        assert_eq!(
            Acceptability::from_id(Acceptability::PREFERRED_ID),
            Some(Acceptability::Preferred)
        );
        assert_eq!(
            Acceptability::from_id(Acceptability::ACCEPTABLE_ID),
            Some(Acceptability::Acceptable)
        );
        assert_eq!(Acceptability::from_id(1), None);
    }

    #[test]
    fn characteristic_type_roundtrip() {
        for ty in [
            CharacteristicType::Stated,
            CharacteristicType::Inferred,
            CharacteristicType::Additional,
        ] {
            assert_eq!(CharacteristicType::from_id(ty.to_id()), Some(ty));
        }
    }

    #[test]
    fn modifier_roundtrip() {
        assert_eq!(
            ModifierType::from_id(ModifierType::UNIVERSAL_ID),
            Some(ModifierType::Universal)
        );
        assert_eq!(
            ModifierType::Existential.to_id(),
            ModifierType::EXISTENTIAL_ID
        );
    }
}
