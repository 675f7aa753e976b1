//! Search documents, requests, and hits.

use std::collections::HashSet;

use terminus_types::SctId;

/// One indexable description, denormalised with everything ranking and
/// filtering need at query time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionDocument {
    /// The concept the description labels.
    pub concept_id: SctId,
    /// The description row id.
    pub description_id: SctId,
    /// The term text as released.
    pub term: String,
    /// Description type (FSN, synonym, definition).
    pub type_id: SctId,
    /// Whether the labelled concept is active.
    pub concept_active: bool,
    /// Language refsets in which this description is the preferred term.
    pub preferred_in: Vec<SctId>,
    /// Language refsets in which this description is acceptable.
    pub acceptable_in: Vec<SctId>,
    /// Reference sets the labelled concept belongs to.
    pub refsets: Vec<SctId>,
    /// The concept's preferred term, carried for display.
    pub preferred_term: String,
}

/// A search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Free text; the last token matches as a prefix.
    pub text: String,
    /// Maximum hits returned.
    pub max_hits: usize,
    /// Edit-distance tolerance per token, 0 to 2.
    pub fuzziness: u8,
    /// Restrict hits to descriptions acceptable in any of these language
    /// refsets (preferred counts as acceptable). Empty means no
    /// restriction.
    pub acceptable_in: HashSet<SctId>,
    /// Language refsets whose preferred terms rank highest.
    pub preferred_in: HashSet<SctId>,
    /// Restrict hits to these concepts, e.g. an ECL result.
    pub concept_id_filter: Option<HashSet<SctId>>,
    /// Restrict hits to concepts belonging to any of these refsets.
    pub refset_filter: Option<HashSet<SctId>>,
    /// Restrict hits to these description types.
    pub type_filter: Option<HashSet<SctId>>,
    /// Drop descriptions of inactive concepts.
    pub active_only: bool,
    /// Include fully specified names among the hits.
    pub include_fsn: bool,
}

impl SearchRequest {
    /// A request with the given text and default settings.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_hits: 100,
            fuzziness: 0,
            acceptable_in: HashSet::new(),
            preferred_in: HashSet::new(),
            concept_id_filter: None,
            refset_filter: None,
            type_filter: None,
            active_only: true,
            include_fsn: true,
        }
    }
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// The matching concept.
    pub concept_id: SctId,
    /// The matching description.
    pub description_id: SctId,
    /// The matching term.
    pub term: String,
    /// The concept's preferred term.
    pub preferred_term: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults() {
        let request = SearchRequest::new("infec");
        assert_eq!(request.text, "infec");
        assert_eq!(request.max_hits, 100);
        assert_eq!(request.fuzziness, 0);
        assert!(request.active_only);
        assert!(request.include_fsn);
        assert!(request.concept_id_filter.is_none());
    }
}
