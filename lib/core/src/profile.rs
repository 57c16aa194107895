//! Profile nodes
//!
//! One [`ProfileNode`] per schema position. Nodes live in an arena owned by
//! the summary and refer to each other through [`NodeId`] indices; the parent
//! link is a plain index, never an owning reference. Once a summary is
//! finished a node's id is its preorder index.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SummaryConfig;
use crate::schema::{Schema, SchemaKind};

/// Index of a node in a summary's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(idx: usize) -> Self {
        NodeId(idx)
    }
}

/// Running sum plus a bounded reservoir of observed values
#[derive(Debug, Clone, Default)]
pub struct NumericStats {
    pub(crate) total: f64,
    pub(crate) samples: Vec<f64>,
    /// Replacement source, seeded once the reservoir first overflows.
    rng: Option<StdRng>,
}

impl PartialEq for NumericStats {
    fn eq(&self, other: &Self) -> bool {
        self.total == other.total && self.samples == other.samples
    }
}

impl NumericStats {
    pub(crate) fn from_parts(total: f64, samples: Vec<f64>) -> Self {
        Self {
            total,
            samples,
            rng: None,
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Record one value. `seen` is the number of values observed so far,
    /// including this one.
    pub(crate) fn observe(&mut self, value: f64, seen: u32, config: &SummaryConfig) {
        self.total += value;
        if self.samples.len() < config.max_numeric_samples {
            self.samples.push(value);
            return;
        }
        // Every node starts from the same seed, so summaries of identical
        // inputs are identical.
        let rng = self
            .rng
            .get_or_insert_with(|| StdRng::seed_from_u64(config.reservoir_seed));
        let slot = rng.random_range(0..seen as usize);
        if slot < self.samples.len() {
            self.samples[slot] = value;
        }
    }

    pub fn mean(&self, num_data: u32) -> Option<f64> {
        (num_data > 0).then(|| self.total / f64::from(num_data))
    }

    /// Variance around the running mean, estimated from the reservoir.
    ///
    /// When every observed value is retained this is the population variance;
    /// otherwise the reservoir is a sample and the unbiased estimator is used.
    pub fn variance(&self, num_data: u32) -> Option<f64> {
        let mean = self.mean(num_data)?;
        let n = self.samples.len();
        let divisor = if n >= num_data as usize { n } else { n.saturating_sub(1) };
        if divisor == 0 {
            return None;
        }
        let squares: f64 = self.samples.iter().map(|v| (v - mean) * (v - mean)).sum();
        Some(squares / divisor as f64)
    }
}

/// Total length plus a bounded set of distinct values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringStats {
    pub(crate) total_length: u32,
    pub(crate) distinct: BTreeSet<String>,
}

impl StringStats {
    pub fn total_length(&self) -> u32 {
        self.total_length
    }

    pub fn distinct(&self) -> &BTreeSet<String> {
        &self.distinct
    }

    pub(crate) fn observe(&mut self, value: &str, config: &SummaryConfig) {
        self.total_length = self.total_length.saturating_add(value.len() as u32);
        if self.distinct.len() < config.max_distinct_strings && !self.distinct.contains(value) {
            self.distinct.insert(value.to_string());
        }
    }
}

/// One declared branch of a union
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnionBranch {
    pub(crate) node: NodeId,
    pub(crate) count: u32,
}

impl UnionBranch {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Per-kind statistics of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeStats {
    Array {
        total_size: u32,
        element: NodeId,
    },
    Boolean {
        num_true: u32,
        num_false: u32,
    },
    Bytes {
        total_size: u32,
    },
    Double(NumericStats),
    Enum {
        name: String,
        symbol_counts: BTreeMap<String, u32>,
    },
    Fixed {
        name: String,
        size: u32,
        total_size: u32,
    },
    Float(NumericStats),
    Int(NumericStats),
    Long(NumericStats),
    Map {
        /// Schema used to grow a child for each new key. Not persisted, so
        /// decoded summaries cannot take more data.
        value_schema: Option<Schema>,
        entries: BTreeMap<String, NodeId>,
    },
    Null,
    Record {
        name: String,
        fields: BTreeMap<String, NodeId>,
    },
    String(StringStats),
    Union {
        branches: BTreeMap<SchemaKind, UnionBranch>,
    },
}

impl NodeStats {
    pub fn kind(&self) -> SchemaKind {
        match self {
            NodeStats::Array { .. } => SchemaKind::Array,
            NodeStats::Boolean { .. } => SchemaKind::Boolean,
            NodeStats::Bytes { .. } => SchemaKind::Bytes,
            NodeStats::Double(_) => SchemaKind::Double,
            NodeStats::Enum { .. } => SchemaKind::Enum,
            NodeStats::Fixed { .. } => SchemaKind::Fixed,
            NodeStats::Float(_) => SchemaKind::Float,
            NodeStats::Int(_) => SchemaKind::Int,
            NodeStats::Long(_) => SchemaKind::Long,
            NodeStats::Map { .. } => SchemaKind::Map,
            NodeStats::Null => SchemaKind::Null,
            NodeStats::Record { .. } => SchemaKind::Record,
            NodeStats::String(_) => SchemaKind::String,
            NodeStats::Union { .. } => SchemaKind::Union,
        }
    }

    /// Numeric statistics for int, long, float and double nodes.
    pub fn numeric(&self) -> Option<&NumericStats> {
        match self {
            NodeStats::Int(s) | NodeStats::Long(s) | NodeStats::Float(s) | NodeStats::Double(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    /// Children in traversal order: record fields and map keys by name,
    /// union branches by kind, then the array element.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeStats::Array { element, .. } => vec![*element],
            NodeStats::Map { entries, .. } => entries.values().copied().collect(),
            NodeStats::Record { fields, .. } => fields.values().copied().collect(),
            NodeStats::Union { branches } => branches.values().map(|b| b.node).collect(),
            _ => Vec::new(),
        }
    }

    /// Name under which `child` hangs off this node, for records and maps.
    pub fn child_name(&self, child: NodeId) -> Option<&str> {
        let named = match self {
            NodeStats::Map { entries, .. } => entries,
            NodeStats::Record { fields, .. } => fields,
            _ => return None,
        };
        named
            .iter()
            .find(|(_, id)| **id == child)
            .map(|(name, _)| name.as_str())
    }

    pub(crate) fn remap(&mut self, map: impl Fn(NodeId) -> NodeId) {
        match self {
            NodeStats::Array { element, .. } => *element = map(*element),
            NodeStats::Map { entries, .. } => entries.values_mut().for_each(|id| *id = map(*id)),
            NodeStats::Record { fields, .. } => fields.values_mut().for_each(|id| *id = map(*id)),
            NodeStats::Union { branches } => {
                branches.values_mut().for_each(|b| b.node = map(b.node))
            }
            _ => {}
        }
    }
}

/// Statistical profile of one schema position
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) num_data: u32,
    pub(crate) doc: String,
    pub(crate) stats: NodeStats,
}

impl ProfileNode {
    pub(crate) fn new(parent: Option<NodeId>, doc: impl Into<String>, stats: NodeStats) -> Self {
        Self {
            parent,
            num_data: 0,
            doc: doc.into(),
            stats,
        }
    }

    #[inline]
    pub fn kind(&self) -> SchemaKind {
        self.stats.kind()
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.kind().is_leaf()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Number of values observed at this position
    pub fn num_data(&self) -> u32 {
        self.num_data
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    /// Upper-case kind name, e.g. `INT` or `RECORD`.
    pub fn type_desc(&self) -> &'static str {
        self.kind().name()
    }

    /// Short statistics string used by descriptions and dumps.
    pub fn stats_desc(&self) -> String {
        let n = self.num_data;
        match &self.stats {
            NodeStats::Boolean {
                num_true,
                num_false,
            } => format!("numData: {}, numTrue: {}, numFalse: {}", n, num_true, num_false),
            NodeStats::Int(s) | NodeStats::Long(s) | NodeStats::Float(s) | NodeStats::Double(s) => {
                match (s.mean(n), s.variance(n)) {
                    (Some(mean), Some(var)) => {
                        format!("numData: {}, avg: {}, var: {}", n, mean, var)
                    }
                    (Some(mean), None) => format!("numData: {}, avg: {}", n, mean),
                    _ => format!("numData: {}", n),
                }
            }
            NodeStats::String(s) => format!(
                "numData: {}, avgLen: {}, distinct: {}",
                n,
                if n > 0 {
                    f64::from(s.total_length) / f64::from(n)
                } else {
                    0.0
                },
                s.distinct.len()
            ),
            NodeStats::Bytes { total_size } => {
                format!("numData: {}, totalSize: {}", n, total_size)
            }
            NodeStats::Fixed {
                name,
                size,
                total_size,
            } => format!(
                "name: {}, size: {}, numData: {}, totalSize: {}",
                name, size, n, total_size
            ),
            NodeStats::Enum {
                name,
                symbol_counts,
            } => {
                let counts: Vec<String> = symbol_counts
                    .iter()
                    .map(|(symbol, count)| format!("{}={}", symbol, count))
                    .collect();
                format!("name: {}, numData: {}, symbols: [{}]", name, n, counts.join(", "))
            }
            NodeStats::Array { total_size, .. } => format!(
                "numData: {}, avgSize: {}",
                n,
                if n > 0 {
                    f64::from(*total_size) / f64::from(n)
                } else {
                    0.0
                }
            ),
            NodeStats::Union { branches } => {
                let counts: Vec<String> = branches
                    .iter()
                    .map(|(kind, b)| format!("{}={}", kind, b.count))
                    .collect();
                format!("numData: {}, branches: [{}]", n, counts.join(", "))
            }
            NodeStats::Record { name, .. } if !name.is_empty() => {
                format!("name: {}, numData: {}", name, n)
            }
            _ => format!("numData: {}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservoir_is_bounded() {
        let config = SummaryConfig {
            max_numeric_samples: 5,
            ..Default::default()
        };
        let mut stats = NumericStats::default();
        for i in 1..=100u32 {
            stats.observe(f64::from(i), i, &config);
        }
        assert_eq!(stats.samples().len(), 5);
        assert_eq!(stats.total(), 5050.0);
        assert_eq!(stats.mean(100), Some(50.5));
        assert!(stats.samples().iter().all(|v| (1.0..=100.0).contains(v)));
    }

    #[test]
    fn test_reservoir_is_deterministic() {
        let config = SummaryConfig {
            max_numeric_samples: 3,
            ..Default::default()
        };
        let run = || {
            let mut stats = NumericStats::default();
            for i in 1..=40u32 {
                stats.observe(f64::from(i * 7 % 13), i, &config);
            }
            stats
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_reservoir_rng_is_seeded_once() {
        let config = SummaryConfig {
            max_numeric_samples: 2,
            ..Default::default()
        };
        let mut stats = NumericStats::default();
        stats.observe(1.0, 1, &config);
        stats.observe(2.0, 2, &config);
        assert!(stats.rng.is_none());

        stats.observe(3.0, 3, &config);
        let after_first = stats.rng.clone();
        assert!(after_first.is_some());
        stats.observe(4.0, 4, &config);
        assert_ne!(
            after_first.map(|mut rng| rng.random::<u64>()),
            stats.rng.clone().map(|mut rng| rng.random::<u64>())
        );
        assert_eq!(stats.samples().len(), 2);
    }

    #[test]
    fn test_variance() {
        let config = SummaryConfig::default();
        let mut stats = NumericStats::default();
        for (i, v) in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].into_iter().enumerate() {
            stats.observe(v, i as u32 + 1, &config);
        }
        assert_eq!(stats.mean(8), Some(5.0));
        assert_eq!(stats.variance(8), Some(4.0));

        let empty = NumericStats::default();
        assert_eq!(empty.mean(0), None);
        assert_eq!(empty.variance(0), None);
    }

    #[test]
    fn test_distinct_strings_are_capped() {
        let config = SummaryConfig {
            max_distinct_strings: 2,
            ..Default::default()
        };
        let mut stats = StringStats::default();
        for value in ["a", "bb", "a", "ccc"] {
            stats.observe(value, &config);
        }
        assert_eq!(stats.total_length(), 7);
        assert_eq!(stats.distinct().len(), 2);
        assert!(stats.distinct().contains("a"));
        assert!(stats.distinct().contains("bb"));
    }

    #[test]
    fn test_children_order_and_names() {
        let mut fields = BTreeMap::new();
        fields.insert("zeta".to_string(), NodeId(1));
        fields.insert("alpha".to_string(), NodeId(2));
        let stats = NodeStats::Record {
            name: "r".to_string(),
            fields,
        };
        assert_eq!(stats.children(), vec![NodeId(2), NodeId(1)]);
        assert_eq!(stats.child_name(NodeId(1)), Some("zeta"));
        assert_eq!(stats.child_name(NodeId(7)), None);
    }
}
