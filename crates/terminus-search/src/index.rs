//! The tantivy-backed description index.

use std::collections::HashSet;
use std::path::Path;

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, INDEXED, STORED,
};
use tantivy::tokenizer::{AsciiFoldingFilter, LowerCaser, SimpleTokenizer, TextAnalyzer};
use tantivy::{Index, IndexReader, TantivyDocument, Term};
use terminus_types::{DescriptionType, SctId};
use tracing::debug;

use crate::document::{DescriptionDocument, SearchHit, SearchRequest};
use crate::SearchError;

const TOKENIZER: &str = "term_folding";
const WRITER_BUFFER_BYTES: usize = 50_000_000;

/// How far beyond `max_hits` the engine collects before post-filtering.
const OVERFETCH: usize = 8;

#[derive(Clone, Copy)]
struct Fields {
    concept_id: Field,
    description_id: Field,
    term: Field,
    type_id: Field,
    concept_active: Field,
    preferred_in: Field,
    acceptable_in: Field,
    refsets: Field,
    preferred_term: Field,
}

/// The on-disk inverted index over description terms.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    fields: Fields,
    analyzer: TextAnalyzer,
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex").finish_non_exhaustive()
    }
}

fn folding_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(AsciiFoldingFilter)
        .build()
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();

    let term_options = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();

    let fields = Fields {
        concept_id: builder.add_u64_field("concept_id", INDEXED | STORED),
        description_id: builder.add_u64_field("description_id", STORED),
        term: builder.add_text_field("term", term_options),
        type_id: builder.add_u64_field("type_id", INDEXED | STORED),
        concept_active: builder.add_u64_field("concept_active", INDEXED | STORED),
        preferred_in: builder.add_u64_field("preferred_in", STORED),
        acceptable_in: builder.add_u64_field("acceptable_in", STORED),
        refsets: builder.add_u64_field("refsets", STORED),
        preferred_term: builder.add_text_field("preferred_term", STORED),
    };

    (builder.build(), fields)
}

impl SearchIndex {
    /// Opens (or creates) the index under `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SearchError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let (schema, fields) = build_schema();
        let directory = MmapDirectory::open(path)?;
        let index = Index::open_or_create(directory, schema)?;
        index.tokenizers().register(TOKENIZER, folding_analyzer());
        let reader = index.reader()?;

        Ok(Self {
            index,
            reader,
            fields,
            analyzer: folding_analyzer(),
        })
    }

    /// Replaces the index contents with the given documents.
    ///
    /// Returns the number of documents indexed. The index becomes
    /// searchable with the new contents before this returns.
    pub fn rebuild<I>(&self, documents: I) -> Result<usize, SearchError>
    where
        I: IntoIterator<Item = DescriptionDocument>,
    {
        let mut writer: tantivy::IndexWriter = self.index.writer(WRITER_BUFFER_BYTES)?;
        writer.delete_all_documents()?;

        let mut count = 0;
        for document in documents {
            let mut doc = TantivyDocument::new();
            doc.add_u64(self.fields.concept_id, document.concept_id);
            doc.add_u64(self.fields.description_id, document.description_id);
            doc.add_text(self.fields.term, &document.term);
            doc.add_u64(self.fields.type_id, document.type_id);
            doc.add_u64(
                self.fields.concept_active,
                u64::from(document.concept_active),
            );
            for refset_id in &document.preferred_in {
                doc.add_u64(self.fields.preferred_in, *refset_id);
            }
            for refset_id in &document.acceptable_in {
                doc.add_u64(self.fields.acceptable_in, *refset_id);
            }
            for refset_id in &document.refsets {
                doc.add_u64(self.fields.refsets, *refset_id);
            }
            doc.add_text(self.fields.preferred_term, &document.preferred_term);
            writer.add_document(doc)?;
            count += 1;
        }

        writer.commit()?;
        self.reader.reload()?;
        debug!(documents = count, "search index rebuilt");
        Ok(count)
    }

    /// Number of indexed description documents.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Tokenises text the same way terms were indexed.
    fn tokens(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        tokens
    }

    /// Runs a ranked, filtered search.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        if request.max_hits == 0 {
            return Ok(Vec::new());
        }
        let tokens = self.tokens(&request.text);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let folded_query = tokens.join(" ");

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (position, token) in tokens.iter().enumerate() {
            let term = Term::from_field_text(self.fields.term, token);
            let last = position + 1 == tokens.len();
            let query: Box<dyn Query> = if last {
                Box::new(FuzzyTermQuery::new_prefix(term, request.fuzziness, true))
            } else if request.fuzziness > 0 {
                Box::new(FuzzyTermQuery::new(term, request.fuzziness, true))
            } else {
                Box::new(TermQuery::new(term, IndexRecordOption::Basic))
            };
            clauses.push((Occur::Must, query));
        }
        if request.active_only {
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_u64(self.fields.concept_active, 1),
                    IndexRecordOption::Basic,
                )),
            ));
        }
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let fetch_limit = request.max_hits * OVERFETCH + 64;
        let top_docs = searcher.search(&query, &TopDocs::with_limit(fetch_limit))?;

        let mut candidates = Vec::new();
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(candidate) = self.rank(&doc, score, &folded_query, request) {
                candidates.push(candidate);
            }
        }

        candidates.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then(
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.term_len.cmp(&b.term_len))
                .then(a.hit.description_id.cmp(&b.hit.description_id))
        });
        candidates.truncate(request.max_hits);

        Ok(candidates.into_iter().map(|c| c.hit).collect())
    }

    /// Applies post-filters and assigns a ranking tier; `None` drops the
    /// document.
    fn rank(
        &self,
        doc: &TantivyDocument,
        score: f32,
        folded_query: &str,
        request: &SearchRequest,
    ) -> Option<Candidate> {
        let get_u64 = |field: Field| doc.get_first(field).and_then(|v| v.as_u64());
        let get_set = |field: Field| -> HashSet<SctId> {
            doc.get_all(field).filter_map(|v| v.as_u64()).collect()
        };

        let concept_id = get_u64(self.fields.concept_id)?;
        let description_id = get_u64(self.fields.description_id)?;
        let type_id = get_u64(self.fields.type_id)?;
        let concept_active = get_u64(self.fields.concept_active)? == 1;
        let term = doc
            .get_first(self.fields.term)
            .and_then(|v| v.as_str())?
            .to_string();
        let preferred_term = doc
            .get_first(self.fields.preferred_term)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        if request.active_only && !concept_active {
            return None;
        }
        if !request.include_fsn && type_id == DescriptionType::FSN_ID {
            return None;
        }
        if let Some(types) = &request.type_filter {
            if !types.contains(&type_id) {
                return None;
            }
        }
        if let Some(concepts) = &request.concept_id_filter {
            if !concepts.contains(&concept_id) {
                return None;
            }
        }

        let preferred_in = get_set(self.fields.preferred_in);
        let acceptable_in = get_set(self.fields.acceptable_in);
        let refsets = get_set(self.fields.refsets);

        if let Some(filter) = &request.refset_filter {
            if refsets.is_disjoint(filter) {
                return None;
            }
        }
        if !request.acceptable_in.is_empty()
            && preferred_in.is_disjoint(&request.acceptable_in)
            && acceptable_in.is_disjoint(&request.acceptable_in)
        {
            return None;
        }

        let folded_term = self.tokens(&term).join(" ");
        let tier = if folded_term == folded_query {
            0
        } else if !preferred_in.is_disjoint(&request.preferred_in) {
            1
        } else if !acceptable_in.is_disjoint(&request.preferred_in)
            || !acceptable_in.is_disjoint(&request.acceptable_in)
        {
            2
        } else if type_id == DescriptionType::FSN_ID {
            4
        } else {
            3
        };

        let term_len = term.chars().count();
        Some(Candidate {
            tier,
            score: score / (1.0 + 0.015 * term_len as f32),
            term_len,
            hit: SearchHit {
                concept_id,
                description_id,
                term,
                preferred_term,
            },
        })
    }
}

struct Candidate {
    tier: u8,
    score: f32,
    term_len: usize,
    hit: SearchHit,
}
