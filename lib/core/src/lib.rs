//! # schemadict Core
//!
//! Core library for schemadict: statistical schema profiles and approximate
//! schema matching.
//!
//! This crate provides the fundamental data structures and algorithms:
//!
//! - [`Schema`] / [`Datum`] - Declared structure and decoded values
//! - [`SchemaSummary`] - Per-node statistics gathered from sampled records
//! - [`SchemaMapping`] - Edit script aligning one summary onto another
//! - [`GreedyAligner`] - Greedy leaf matching with structural promotion
//! - [`codec`] - Versioned binary format for summaries
//!
//! ```text
//!   Sample (schema + records)
//!          │
//!          ▼
//!   SummaryBuilder ──finish()──► SchemaSummary ──┐
//!                                                ├──► Aligner ──► SchemaMapping
//!   SchemaSummary (known dataset) ───────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use schemadict_core::{Datum, Field, Schema, SchemaSummary};
//!
//! let schema = Schema::record("person", vec![
//!     Field::new("id", Schema::Int),
//!     Field::new("name", Schema::String),
//! ]);
//! let records: Vec<Datum> = (0..10)
//!     .map(|i| Datum::record([("id", Datum::Int(i)), ("name", Datum::from(format!("p{}", i)))]))
//!     .collect();
//!
//! let a = Arc::new(SchemaSummary::from_data(&schema, &records, "a").unwrap());
//! let b = Arc::new(SchemaSummary::from_data(&schema, &records, "b").unwrap());
//! assert_eq!(a.best_mapping(&b).cost(), 0.0);
//! ```

pub mod codec;
pub mod config;
pub mod cost;
pub mod error;
pub mod mapping;
pub mod profile;
pub mod sample;
pub mod schema;
pub mod summary;

pub use config::{MatchConfig, SuggestConfig, SummaryConfig};
pub use error::{Error, Result};
pub use mapping::{minimum_mapping_cost, Aligner, GreedyAligner, MappingOp, SchemaMapping};
pub use profile::{NodeId, NodeStats, NumericStats, ProfileNode, StringStats, UnionBranch};
pub use sample::Sample;
pub use schema::{Datum, Field, Schema, SchemaKind};
pub use summary::{SchemaSummary, SummaryBuilder, ROOT_LABEL};
