//! SNOMED CT description component.

use serde::{Deserialize, Serialize};

use crate::{CaseSignificance, DescriptionType, SctId};

/// A lexical label bound to a concept.
///
/// Corresponds to a row of an RF2 `Description` file. A concept typically
/// has one Fully Specified Name and several synonyms, distinguished by
/// `type_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    /// Unique identifier for this description (SCTID).
    pub id: SctId,
    /// Effective date in `YYYYMMDD` form.
    pub effective_time: u32,
    /// Whether this description is active.
    pub active: bool,
    /// The module containing this description.
    pub module_id: SctId,
    /// The concept this description labels.
    pub concept_id: SctId,
    /// ISO language code, e.g. `"en"`.
    pub language_code: String,
    /// Description type (FSN, synonym, definition).
    pub type_id: SctId,
    /// The term text.
    pub term: String,
    /// Case significance rules for the term.
    pub case_significance_id: SctId,
}

impl Description {
    /// Returns the description type enum value, if recognised.
    pub fn description_type(&self) -> Option<DescriptionType> {
        DescriptionType::from_id(self.type_id)
    }

    /// Returns true if this is a Fully Specified Name.
    pub fn is_fsn(&self) -> bool {
        self.type_id == DescriptionType::FSN_ID
    }

    /// Returns true if this is a synonym.
    pub fn is_synonym(&self) -> bool {
        self.type_id == DescriptionType::SYNONYM_ID
    }

    /// Returns the case significance enum value, if recognised.
    pub fn case_significance(&self) -> Option<CaseSignificance> {
        CaseSignificance::from_id(self.case_significance_id)
    }

    /// Returns the semantic tag of an FSN term, the text between the final
    /// parentheses. `"Diabetes mellitus (disorder)"` yields `"disorder"`.
    ///
    /// Returns `None` for non-FSN descriptions or malformed terms.
    pub fn semantic_tag(&self) -> Option<&str> {
        if !self.is_fsn() {
            return None;
        }
        let start = self.term.rfind('(')?;
        let end = self.term.rfind(')')?;
        if start < end {
            Some(&self.term[start + 1..end])
        } else {
            None
        }
    }
}
