pub mod channel;
pub mod normalize;
pub mod protocol;
pub mod worker;

use std::collections::HashSet;

use tantivy::collector::TopDocs;
use tantivy::query::{
    BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query, RegexQuery, TermQuery,
};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED,
};
use tantivy::tokenizer::{TextAnalyzer, WhitespaceTokenizer};
use tantivy::{doc, Index, IndexReader, ReloadPolicy, Term};

use crate::core::config::SearchConfig;
use crate::core::errors::Result;
use crate::models::{ScheduleEntry, Suggestion, SuggestionKind};

use normalize::{normalize_text, tokenize};

pub use channel::{ChannelState, SearchChannel};

const WRITER_HEAP_BYTES: usize = 20_000_000;
const MAX_EDIT_DISTANCE: u8 = 2;
/// Tokens shorter than this must match exactly (or as a prefix).
const FUZZY_MIN_CHARS: usize = 4;
/// Tokens shorter than this never match inside a word.
const SUBSTRING_MIN_CHARS: usize = 3;
/// Input is already folded by [`normalize_text`], so splitting on
/// whitespace keeps clock times like `08:00am` whole.
const TOKENIZER: &str = "classboard_whitespace";
const EXACT_TERM_BOOST: f32 = 2.0;

/// Controls how a query string is matched against one fuzzy index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchParams {
    /// Allowed edits per query character, see [`edit_budget`].
    pub threshold: f32,
    /// Query tokens shorter than this are ignored.
    pub min_token_len: usize,
    pub prefix: bool,
    pub substring: bool,
    pub limit: usize,
}

impl MatchParams {
    pub fn for_search(config: &SearchConfig) -> Self {
        Self {
            threshold: config.search_threshold,
            min_token_len: config.search_min_token_len,
            prefix: config.prefix_matching,
            substring: config.substring_matching,
            limit: config.max_results,
        }
    }

    pub fn for_suggest(config: &SearchConfig) -> Self {
        Self {
            threshold: config.suggest_threshold,
            min_token_len: config.suggest_min_token_len,
            prefix: config.prefix_matching,
            substring: config.substring_matching,
            limit: config.max_suggestions.saturating_mul(4),
        }
    }
}

/// Edit distance a token of this length may be off by.
///
/// Tokens under four characters and tokens carrying digits (clock times,
/// group numbers) get none. Longer tokens get `round(len * threshold)`
/// clamped to one or two edits.
pub fn edit_budget(token: &str, threshold: f32) -> u8 {
    let len = token.chars().count();
    if threshold <= 0.0 || len < FUZZY_MIN_CHARS || token.chars().any(|c| c.is_ascii_digit()) {
        return 0;
    }
    let budget = (len as f32 * threshold).round();
    if budget >= f32::from(MAX_EDIT_DISTANCE) {
        MAX_EDIT_DISTANCE
    } else {
        (budget as u8).max(1)
    }
}

/// Searchable text for one entry, covering every field a user might type.
pub fn searchable_blob(entry: &ScheduleEntry, config: &SearchConfig) -> String {
    let parts = [
        entry.subject.as_str(),
        config.subject_display(&entry.subject),
        entry.group.as_str(),
        entry.doctor_ar.as_str(),
        entry.doctor_en.as_str(),
        entry.day.as_str(),
        entry.time.as_str(),
        entry.original_time.as_deref().unwrap_or(""),
        entry.code.as_str(),
        entry.room.as_str(),
    ];
    normalize_text(&parts.join(" "))
}

/// Distinct subjects and doctor names offered as "did you mean" prompts.
pub fn suggestion_items(entries: &[ScheduleEntry]) -> Vec<Suggestion> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    let sources: [(SuggestionKind, fn(&ScheduleEntry) -> &str); 3] = [
        (SuggestionKind::Subject, |e| e.subject.as_str()),
        (SuggestionKind::Doctor, |e| e.doctor_en.as_str()),
        (SuggestionKind::Doctor, |e| e.doctor_ar.as_str()),
    ];

    for (kind, field) in sources {
        for entry in entries {
            let value = field(entry).trim();
            if value.is_empty() || value == "-" {
                continue;
            }
            if seen.insert((kind, value.to_string())) {
                items.push(Suggestion {
                    kind,
                    text: value.to_string(),
                    display: value.to_string(),
                });
            }
        }
    }
    items
}

/// The two fuzzy indices over one dataset. Built in one go; a new dataset
/// means a new `SearchIndex`.
pub struct SearchIndex {
    config: SearchConfig,
    entries: Vec<ScheduleEntry>,
    suggestions: Vec<Suggestion>,
    main: FuzzyIndex,
    suggest: FuzzyIndex,
}

impl SearchIndex {
    pub fn build(entries: Vec<ScheduleEntry>, config: SearchConfig) -> Result<Self> {
        let main = FuzzyIndex::create(
            entries
                .iter()
                .enumerate()
                .map(|(i, e)| (i as u64, searchable_blob(e, &config))),
        )?;

        let suggestions = suggestion_items(&entries);
        let suggest = FuzzyIndex::create(
            suggestions
                .iter()
                .enumerate()
                .map(|(i, s)| (i as u64, normalize_text(&s.text))),
        )?;

        Ok(Self {
            config,
            entries,
            suggestions,
            main,
            suggest,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Entries matching every eligible query token, best match first.
    pub fn search(&self, query: &str) -> Result<Vec<ScheduleEntry>> {
        let hits = self
            .main
            .search(query, &MatchParams::for_search(&self.config))?;
        Ok(hits
            .into_iter()
            .filter_map(|ordinal| self.entries.get(ordinal as usize).cloned())
            .collect())
    }

    /// Up to `max_suggestions` subject or doctor names close to `query`.
    pub fn suggest(&self, query: &str) -> Result<Vec<Suggestion>> {
        let hits = self
            .suggest
            .search(query, &MatchParams::for_suggest(&self.config))?;
        Ok(hits
            .into_iter()
            .filter_map(|ordinal| self.suggestions.get(ordinal as usize).cloned())
            .take(self.config.max_suggestions)
            .collect())
    }
}

/// An in-memory tantivy index of `(ordinal, text)` documents.
struct FuzzyIndex {
    reader: IndexReader,
    text_field: Field,
    ordinal_field: Field,
}

impl FuzzyIndex {
    fn create(docs: impl Iterator<Item = (u64, String)>) -> Result<Self> {
        let indexing = TextFieldIndexing::default()
            .set_tokenizer(TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let mut builder = Schema::builder();
        let text_field =
            builder.add_text_field("text", TextOptions::default().set_indexing_options(indexing));
        let ordinal_field = builder.add_u64_field("ordinal", STORED);
        let index = Index::create_in_ram(builder.build());
        index
            .tokenizers()
            .register(TOKENIZER, TextAnalyzer::from(WhitespaceTokenizer::default()));

        let mut writer = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        for (ordinal, text) in docs {
            writer.add_document(doc!(
                text_field => text,
                ordinal_field => ordinal
            ))?;
        }
        writer.commit()?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            reader,
            text_field,
            ordinal_field,
        })
    }

    /// Ordinals of matching documents in relevance order.
    fn search(&self, query: &str, params: &MatchParams) -> Result<Vec<u64>> {
        if params.limit == 0 {
            return Ok(Vec::new());
        }
        let Some(query) = self.build_query(query, params)? else {
            return Ok(Vec::new());
        };

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(query.as_ref(), &TopDocs::with_limit(params.limit))?;
        let mut scored = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let retrieved = searcher.doc(address)?;
            if let Some(ordinal) = retrieved
                .get_first(self.ordinal_field)
                .and_then(|v| v.as_u64())
            {
                scored.push((score, ordinal));
            }
        }
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(scored.into_iter().map(|(_, ordinal)| ordinal).collect())
    }

    /// One MUST clause per eligible token; each clause prefers an exact term
    /// hit over a fuzzy or in-word one. `None` when no token is long enough.
    fn build_query(&self, query: &str, params: &MatchParams) -> Result<Option<Box<dyn Query>>> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for token in tokenize(query) {
            let len = token.chars().count();
            if len < params.min_token_len {
                continue;
            }
            let distance = edit_budget(&token, params.threshold);
            let term = Term::from_field_text(self.text_field, &token);
            let exact: Box<dyn Query> = Box::new(BoostQuery::new(
                Box::new(TermQuery::new(term.clone(), IndexRecordOption::WithFreqs)),
                EXACT_TERM_BOOST,
            ));
            let fuzzy: Box<dyn Query> = if params.prefix {
                Box::new(FuzzyTermQuery::new_prefix(term, distance, true))
            } else {
                Box::new(FuzzyTermQuery::new(term, distance, true))
            };
            let mut either = vec![(Occur::Should, exact), (Occur::Should, fuzzy)];

            // Only plain words, so the pattern needs no escaping.
            if params.substring
                && len >= SUBSTRING_MIN_CHARS
                && token.chars().all(char::is_alphanumeric)
            {
                let inside = RegexQuery::from_pattern(&format!(".*{token}.*"), self.text_field)?;
                either.push((Occur::Should, Box::new(inside)));
            }
            clauses.push((Occur::Must, Box::new(BooleanQuery::new(either))));
        }

        if clauses.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Box::new(BooleanQuery::new(clauses))))
        }
    }
}
