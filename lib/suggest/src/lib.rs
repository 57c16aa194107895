//! # schemadict Suggest
//!
//! Finds the known datasets whose schemas best explain a new sample and
//! turns the resulting mappings into rename suggestions.
//!
//! ```text
//!   SchemaDictionary ──snapshot──► SchemaSuggest (buckets by field count)
//!                                        │
//!   query SchemaSummary ──search(k)──────┤  expanding radius, lower-bound pruning
//!                                        ▼
//!                         Vec<DictionaryMapping> ──► SuggestResponse (text / JSON)
//! ```

pub mod report;
pub mod suggest;

pub use report::{FieldRename, SuggestResponse, SuggestionReport, UnmatchedField, RANKING_HEADER};
pub use suggest::{DictionaryMapping, SchemaSuggest, SearchOutcome, SearchStats, QUERY_LABEL};
