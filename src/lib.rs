//! # schemadict
//!
//! Statistical schema summaries and approximate schema matching.
//!
//! schemadict profiles a sample of structured records into a
//! [`SchemaSummary`] (a tree of per-field statistics), keeps summaries of
//! well-labeled datasets in a persistent [`SchemaDictionary`], and ranks the
//! known datasets closest to a new, anonymous sample. Each ranked match comes
//! with a field mapping: which query fields correspond to which known fields,
//! which ones have no counterpart, and the total edit cost.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! schema-dict ./dict add people.json --label people
//! schema-suggest ./dict anonymous.json -k 3
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use schemadict::prelude::*;
//!
//! # fn main() -> schemadict::Result<()> {
//! let dictionary = SchemaDictionary::open("./dict")?;
//! dictionary.add_dictionary_elt(&Sample::from_path("people.json")?, "people")?;
//!
//! let suggest = SchemaSuggest::new(&dictionary)?;
//! let matches = suggest.infer_schema_mapping(&Sample::from_path("anonymous.json")?, 3)?;
//! print!("{}", SuggestResponse::from_matches(&matches).render(false));
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - [`schemadict-core`](https://docs.rs/schemadict-core) - schemas, samples, summaries, costs, alignment, binary codec
//! - [`schemadict-storage`](https://docs.rs/schemadict-storage) - the persistent schema dictionary
//! - [`schemadict-suggest`](https://docs.rs/schemadict-suggest) - bucketed top-k search and reports

pub mod logging;

// Re-export core types
pub use schemadict_core::{
    Aligner, Datum, Error, Field, GreedyAligner, MappingOp, MatchConfig, Result, Sample, Schema,
    SchemaKind, SchemaMapping, SchemaSummary, SuggestConfig, SummaryBuilder, SummaryConfig,
};

// Re-export storage
pub use schemadict_storage::{DictionaryEntry, SchemaDictionary};

// Re-export search
pub use schemadict_suggest::{DictionaryMapping, SchemaSuggest, SearchOutcome, SuggestResponse};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Aligner, Datum, DictionaryEntry, DictionaryMapping, Error, Field, GreedyAligner,
        MatchConfig, Result, Sample, Schema, SchemaDictionary, SchemaMapping, SchemaSuggest,
        SchemaSummary, SuggestConfig, SuggestResponse, SummaryConfig,
    };
}
