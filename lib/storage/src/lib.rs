//! # schemadict Storage
//!
//! Persistence layer for schemadict: the append-only [`SchemaDictionary`]
//! of well-labeled datasets and their precomputed summaries.

pub mod dictionary;

pub use dictionary::{Contents, DictionaryEntry, SchemaDictionary};
