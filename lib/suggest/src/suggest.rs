//! Nearest-schema search over a dictionary
//!
//! Entries are spread over pigeonhole buckets by field count. A query starts
//! in its own bucket and widens the radius one step at a time:
//!
//! ```text
//!   bucket:   0   1   2  [3]  4   5  ...  19 (19 and above)
//!   radius 0:            [x]
//!   radius 1:        [x] [x] [x]
//!   radius 2:    [x] [x] [x] [x] [x]
//! ```
//!
//! Mapping a tree with `q` fields onto one with `m` fields costs at least
//! `|q - m|` structural edits, so the search stops as soon as the k-th best
//! cost found is no worse than that bound for every bucket not yet visited.

use std::collections::BTreeMap;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::debug;

use schemadict_core::{
    minimum_mapping_cost, Aligner, GreedyAligner, Result, Sample, SchemaMapping, SchemaSummary,
    SuggestConfig,
};
use schemadict_storage::{DictionaryEntry, SchemaDictionary};

/// Dataset label given to summaries built by [`SchemaSuggest::infer_schema_mapping`]
pub const QUERY_LABEL: &str = "query";

/// A dictionary entry together with the mapping of the query onto it
#[derive(Debug, Clone)]
pub struct DictionaryMapping {
    pub cost: f64,
    pub mapping: SchemaMapping,
    pub entry: Arc<DictionaryEntry>,
}

/// Bookkeeping of one search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Radius at which the search stopped
    pub final_radius: usize,
    /// Buckets whose entries were compared
    pub buckets_visited: usize,
    /// Entries the query was aligned against
    pub entries_examined: usize,
}

/// Ranked matches plus search bookkeeping
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub matches: Vec<DictionaryMapping>,
    pub stats: SearchStats,
}

/// Bucketed index over a dictionary snapshot
pub struct SchemaSuggest {
    buckets: Vec<Vec<Arc<DictionaryEntry>>>,
    aligner: Box<dyn Aligner>,
    config: SuggestConfig,
    num_entries: usize,
}

impl SchemaSuggest {
    /// Index the current contents of `dictionary` with default settings.
    pub fn new(dictionary: &SchemaDictionary) -> Result<Self> {
        Self::with_config(dictionary, SuggestConfig::default())
    }

    pub fn with_config(dictionary: &SchemaDictionary, config: SuggestConfig) -> Result<Self> {
        Self::from_entries(dictionary.contents(), config)
    }

    /// Index an arbitrary set of entries.
    pub fn from_entries<I>(entries: I, config: SuggestConfig) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<DictionaryEntry>>,
    {
        config.validate()?;
        let mut buckets: Vec<Vec<Arc<DictionaryEntry>>> = vec![Vec::new(); config.num_buckets];
        let mut num_entries = 0;
        for entry in entries {
            let bucket = bucket_index(entry.summary().field_count(), config.num_buckets);
            buckets[bucket].push(entry);
            num_entries += 1;
        }
        debug!(
            entries = num_entries,
            buckets = config.num_buckets,
            "schema suggest index built"
        );

        Ok(Self {
            buckets,
            aligner: Box::new(GreedyAligner::new(config.matching.clone())),
            config,
            num_entries,
        })
    }

    /// Replace the alignment strategy.
    #[must_use]
    pub fn with_aligner<A: Aligner + 'static>(mut self, aligner: A) -> Self {
        self.aligner = Box::new(aligner);
        self
    }

    pub fn config(&self) -> &SuggestConfig {
        &self.config
    }

    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    /// Bucket holding summaries with `field_count` fields.
    pub fn bucket_of(&self, field_count: usize) -> usize {
        bucket_index(field_count, self.buckets.len())
    }

    /// Profile `sample` and return its `k` closest dictionary entries.
    pub fn infer_schema_mapping(&self, sample: &Sample, k: usize) -> Result<Vec<DictionaryMapping>> {
        let summary = SchemaSummary::from_sample_with(sample, QUERY_LABEL, &self.config.summary)?;
        Ok(self.infer_from_summary(Arc::new(summary), k))
    }

    /// The `k` closest entries to an already built summary, best first.
    /// Entries tied with the k-th cost are included.
    pub fn infer_from_summary(&self, query: Arc<SchemaSummary>, k: usize) -> Vec<DictionaryMapping> {
        self.search(query, k).matches
    }

    /// Like [`infer_from_summary`](Self::infer_from_summary), also reporting
    /// how much of the index was examined.
    pub fn search(&self, query: Arc<SchemaSummary>, k: usize) -> SearchOutcome {
        let mut stats = SearchStats::default();
        if k == 0 || self.num_entries == 0 {
            return SearchOutcome {
                matches: Vec::new(),
                stats,
            };
        }

        let num_buckets = self.buckets.len();
        let query_size = query.field_count();
        let home = self.bucket_of(query_size);

        let mut visited = vec![false; num_buckets];
        let mut ranked: BTreeMap<(OrderedFloat<f64>, usize), DictionaryMapping> = BTreeMap::new();
        let mut radius = 0;

        loop {
            let low = home.saturating_sub(radius);
            let high = (home + radius).min(num_buckets - 1);
            for bucket in low..=high {
                if visited[bucket] {
                    continue;
                }
                visited[bucket] = true;
                stats.buckets_visited += 1;
                for entry in &self.buckets[bucket] {
                    let mapping = self.aligner.align(&query, entry.summary());
                    let cost = mapping.cost();
                    ranked.insert(
                        (OrderedFloat(cost), stats.entries_examined),
                        DictionaryMapping {
                            cost,
                            mapping,
                            entry: Arc::clone(entry),
                        },
                    );
                    stats.entries_examined += 1;
                }
            }

            let bound = (0..num_buckets)
                .filter(|&bucket| !visited[bucket])
                .map(|bucket| self.bucket_lower_bound(query_size, bucket))
                .fold(None, |acc: Option<f64>, b| Some(acc.map_or(b, |a| a.min(b))));
            let Some(bound) = bound else {
                break;
            };
            if let Some(((kth, _), _)) = ranked.iter().nth(k - 1) {
                if kth.into_inner() <= bound {
                    break;
                }
            }
            radius += 1;
        }
        stats.final_radius = radius;

        let mut matches: Vec<DictionaryMapping> = ranked.into_values().collect();
        if matches.len() > k {
            let kth = matches[k - 1].cost;
            let ties = matches[k..].iter().take_while(|m| m.cost == kth).count();
            matches.truncate(k + ties);
        }

        debug!(
            query = %query.dataset_label(),
            fields = query_size,
            radius = stats.final_radius,
            buckets = stats.buckets_visited,
            examined = stats.entries_examined,
            returned = matches.len(),
            "schema search finished"
        );
        SearchOutcome { matches, stats }
    }

    /// Smallest possible mapping cost between the query and any entry of `bucket`.
    fn bucket_lower_bound(&self, query_size: usize, bucket: usize) -> f64 {
        let last = self.buckets.len() - 1;
        // The last bucket also holds every larger size.
        let nearest = if bucket == last {
            query_size.max(last)
        } else {
            bucket
        };
        minimum_mapping_cost(query_size, nearest, self.aligner.config())
    }
}

fn bucket_index(field_count: usize, num_buckets: usize) -> usize {
    field_count.min(num_buckets - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemadict_core::{Datum, Field, Schema};

    /// Record with `width` int fields named `prefix0..`, filled with `rows` rows.
    fn entry(id: u64, label: &str, prefix: &str, width: usize, rows: i32) -> Arc<DictionaryEntry> {
        let schema = Schema::record(
            "row",
            (0..width)
                .map(|f| Field::new(format!("{}{}", prefix, f), Schema::Int))
                .collect(),
        );
        let records: Vec<Datum> = (0..rows)
            .map(|i| {
                Datum::Record(
                    (0..width)
                        .map(|f| (format!("{}{}", prefix, f), Datum::Int(i * (f as i32 + 1))))
                        .collect(),
                )
            })
            .collect();
        let summary = SchemaSummary::from_data(&schema, &records, label).unwrap();
        Arc::new(DictionaryEntry::new(id, label, schema, summary))
    }

    #[test]
    fn test_bucket_index_saturates() {
        let suggest = SchemaSuggest::from_entries(Vec::new(), SuggestConfig::default()).unwrap();
        assert_eq!(suggest.bucket_of(0), 0);
        assert_eq!(suggest.bucket_of(7), 7);
        assert_eq!(suggest.bucket_of(19), 19);
        assert_eq!(suggest.bucket_of(250), 19);
    }

    #[test]
    fn test_empty_dictionary_or_zero_k() {
        let query = entry(0, "q", "c", 3, 5);
        let empty = SchemaSuggest::from_entries(Vec::new(), SuggestConfig::default()).unwrap();
        assert!(empty.infer_from_summary(Arc::clone(query.summary()), 3).is_empty());

        let suggest = SchemaSuggest::from_entries(vec![entry(1, "a", "c", 3, 5)], SuggestConfig::default()).unwrap();
        assert!(suggest.infer_from_summary(Arc::clone(query.summary()), 0).is_empty());
    }

    #[test]
    fn test_stops_at_radius_zero_on_exact_match() {
        let entries = vec![
            entry(1, "exact", "c", 3, 10),
            entry(2, "wide", "w", 10, 10),
            entry(3, "wider", "x", 15, 10),
        ];
        let suggest = SchemaSuggest::from_entries(entries, SuggestConfig::default()).unwrap();
        let query = entry(0, "query", "c", 3, 10);

        let outcome = suggest.search(Arc::clone(query.summary()), 1);
        assert_eq!(outcome.stats.final_radius, 0);
        assert_eq!(outcome.stats.buckets_visited, 1);
        assert_eq!(outcome.stats.entries_examined, 1);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].entry.label(), "exact");
        assert_eq!(outcome.matches[0].cost, 0.0);
    }

    #[test]
    fn test_ties_at_kth_cost_are_kept() {
        let entries = vec![
            entry(1, "copy-a", "c", 2, 6),
            entry(2, "copy-b", "c", 2, 6),
            entry(3, "other", "zz", 4, 6),
        ];
        let suggest = SchemaSuggest::from_entries(entries, SuggestConfig::default()).unwrap();
        let query = entry(0, "query", "c", 2, 6);

        let matches = suggest.infer_from_summary(Arc::clone(query.summary()), 1);
        let labels: Vec<&str> = matches.iter().map(|m| m.entry.label()).collect();
        assert_eq!(labels, vec!["copy-a", "copy-b"]);
        assert!(matches.iter().all(|m| m.cost == 0.0));
    }

    #[test]
    fn test_matches_exhaustive_search() {
        let entries: Vec<Arc<DictionaryEntry>> = (1..=8)
            .map(|i| entry(i, &format!("e{}", i), if i % 2 == 0 { "c" } else { "d" }, i as usize, 4 + i as i32))
            .collect();
        let query = entry(0, "query", "c", 5, 7);
        let config = SuggestConfig {
            num_buckets: 4,
            ..Default::default()
        };
        let suggest = SchemaSuggest::from_entries(entries.clone(), config).unwrap();

        let mut brute: Vec<f64> = entries
            .iter()
            .map(|e| query.summary().best_mapping(e.summary()).cost())
            .collect();
        brute.sort_by(|a, b| a.total_cmp(b));

        let k = 3;
        let matches = suggest.infer_from_summary(Arc::clone(query.summary()), k);
        assert!(matches.len() >= k);
        for (found, expected) in matches.iter().zip(&brute) {
            assert_eq!(found.cost, *expected);
        }
        assert!(matches.windows(2).all(|w| w[0].cost <= w[1].cost));
    }

    #[test]
    fn test_infer_from_sample() {
        let suggest = SchemaSuggest::from_entries(vec![entry(1, "known", "c", 2, 4)], SuggestConfig::default()).unwrap();
        let schema = Schema::record("q", vec![Field::new("c0", Schema::Int), Field::new("c1", Schema::Int)]);
        let records = (0..4)
            .map(|i| Datum::record([("c0", Datum::Int(i)), ("c1", Datum::Int(i * 2))]))
            .collect();
        let matches = suggest.infer_schema_mapping(&Sample::new(schema, records), 1).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].mapping.source().dataset_label(), QUERY_LABEL);
        assert_eq!(matches[0].cost, 0.0);
    }
}
