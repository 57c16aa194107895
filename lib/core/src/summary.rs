//! Schema statistical summary
//!
//! A [`SummaryBuilder`] mirrors a record schema as a tree of profile nodes
//! and accumulates statistics record by record. [`SummaryBuilder::finish`]
//! freezes it into a read-only [`SchemaSummary`]:
//!
//! ```text
//!   Schema ──► SummaryBuilder ──add_record()──► ... ──finish()──► SchemaSummary
//!                (mutable arena)                         (preorder ids, labels)
//! ```
//!
//! Finishing reorders the arena so that every node id equals its preorder
//! index and caches the dotted label of every node. Both happen exactly once.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::config::{MatchConfig, SummaryConfig};
use crate::error::{Error, Result};
use crate::mapping::{Aligner, GreedyAligner, SchemaMapping};
use crate::profile::{NodeId, NodeStats, NumericStats, ProfileNode, StringStats, UnionBranch};
use crate::sample::Sample;
use crate::schema::{Datum, Schema};
use crate::{codec, cost};

/// Label of the root node
pub const ROOT_LABEL: &str = "<root>";

/// Mutable profile tree that accepts records
#[derive(Debug)]
pub struct SummaryBuilder {
    nodes: Vec<ProfileNode>,
    root: NodeId,
    dataset_label: String,
    config: SummaryConfig,
    records: usize,
}

impl SummaryBuilder {
    /// Mirror `schema`, which must be a record, as an empty profile tree.
    pub fn new(schema: &Schema, dataset_label: impl Into<String>) -> Result<Self> {
        Self::with_config(schema, dataset_label, SummaryConfig::default())
    }

    pub fn with_config(
        schema: &Schema,
        dataset_label: impl Into<String>,
        config: SummaryConfig,
    ) -> Result<Self> {
        if !matches!(schema, Schema::Record { .. }) {
            return Err(Error::NotARecord(schema.kind()));
        }
        config.validate()?;

        let mut builder = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            dataset_label: dataset_label.into(),
            config,
            records: 0,
        };
        builder.root = builder.build(schema, schema.doc().unwrap_or_default(), None);
        Ok(builder)
    }

    /// Number of records added so far.
    pub fn records_seen(&self) -> usize {
        self.records
    }

    /// Fold one record into the profile.
    pub fn add_record(&mut self, record: &Datum) {
        self.records += 1;
        self.add_value(self.root, record);
    }

    /// Freeze the profile. Fails with [`Error::EmptySample`] if no record was added.
    pub fn finish(self) -> Result<SchemaSummary> {
        if self.records == 0 {
            return Err(Error::EmptySample);
        }
        Ok(SchemaSummary::from_arena(
            self.nodes,
            self.root,
            self.dataset_label,
        ))
    }

    fn build(&mut self, schema: &Schema, doc: &str, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ProfileNode::new(parent, doc, NodeStats::Null));

        let stats = match schema {
            Schema::Null => NodeStats::Null,
            Schema::Boolean => NodeStats::Boolean {
                num_true: 0,
                num_false: 0,
            },
            Schema::Int => NodeStats::Int(NumericStats::default()),
            Schema::Long => NodeStats::Long(NumericStats::default()),
            Schema::Float => NodeStats::Float(NumericStats::default()),
            Schema::Double => NodeStats::Double(NumericStats::default()),
            Schema::Bytes => NodeStats::Bytes { total_size: 0 },
            Schema::String => NodeStats::String(StringStats::default()),
            Schema::Enum { name, symbols, .. } => NodeStats::Enum {
                name: name.clone(),
                symbol_counts: symbols.iter().map(|s| (s.clone(), 1)).collect(),
            },
            Schema::Fixed { name, size, .. } => NodeStats::Fixed {
                name: name.clone(),
                size: u32::try_from(*size).unwrap_or(u32::MAX),
                total_size: 0,
            },
            Schema::Array(items) => {
                let element = self.build(items, items.doc().unwrap_or_default(), Some(id));
                NodeStats::Array {
                    total_size: 0,
                    element,
                }
            }
            Schema::Map(values) => NodeStats::Map {
                value_schema: Some((**values).clone()),
                entries: BTreeMap::new(),
            },
            Schema::Union(branches) => {
                let mut built = BTreeMap::new();
                for branch in branches {
                    if built.contains_key(&branch.kind()) {
                        warn!(
                            kind = %branch.kind(),
                            branch = %branch.type_name(),
                            "union already has a branch of this kind, profiling it with the first"
                        );
                        continue;
                    }
                    let node = self.build(branch, branch.doc().unwrap_or_default(), Some(id));
                    built.insert(branch.kind(), UnionBranch { node, count: 0 });
                }
                NodeStats::Union { branches: built }
            }
            Schema::Record { name, fields, .. } => {
                let mut children = BTreeMap::new();
                for field in fields {
                    let child = self.build(
                        &field.schema,
                        field.doc.as_deref().unwrap_or_default(),
                        Some(id),
                    );
                    children.insert(field.name.clone(), child);
                }
                NodeStats::Record {
                    name: name.clone(),
                    fields: children,
                }
            }
        };

        self.nodes[id.0].stats = stats;
        id
    }

    fn add_value(&mut self, id: NodeId, value: &Datum) {
        let config = &self.config;
        let node = &mut self.nodes[id.0];

        match (&mut node.stats, value) {
            (NodeStats::Null, Datum::Null) => node.num_data = node.num_data.saturating_add(1),
            (NodeStats::Boolean { num_true, num_false }, Datum::Boolean(b)) => {
                node.num_data = node.num_data.saturating_add(1);
                if *b {
                    *num_true = num_true.saturating_add(1);
                } else {
                    *num_false = num_false.saturating_add(1);
                }
            }
            (NodeStats::Int(stats), Datum::Int(v)) => {
                node.num_data = node.num_data.saturating_add(1);
                stats.observe(f64::from(*v), node.num_data, config);
            }
            (NodeStats::Long(stats), Datum::Long(v)) => {
                node.num_data = node.num_data.saturating_add(1);
                stats.observe(*v as f64, node.num_data, config);
            }
            (NodeStats::Float(stats), Datum::Float(v)) => {
                node.num_data = node.num_data.saturating_add(1);
                stats.observe(f64::from(*v), node.num_data, config);
            }
            (NodeStats::Double(stats), Datum::Double(v)) => {
                node.num_data = node.num_data.saturating_add(1);
                stats.observe(*v, node.num_data, config);
            }
            (NodeStats::String(stats), Datum::String(s)) => {
                node.num_data = node.num_data.saturating_add(1);
                stats.observe(s, config);
            }
            (NodeStats::Bytes { total_size }, Datum::Bytes(bytes)) => {
                node.num_data = node.num_data.saturating_add(1);
                *total_size = total_size.saturating_add(bytes.len() as u32);
            }
            (NodeStats::Fixed { total_size, .. }, Datum::Fixed(bytes)) => {
                node.num_data = node.num_data.saturating_add(1);
                *total_size = total_size.saturating_add(bytes.len() as u32);
            }
            (NodeStats::Enum { symbol_counts, .. }, Datum::Enum(symbol)) => {
                match symbol_counts.get_mut(symbol) {
                    Some(count) => {
                        *count = count.saturating_add(1);
                        node.num_data = node.num_data.saturating_add(1);
                    }
                    None => trace!(symbol = %symbol, "skipping undeclared enum symbol"),
                }
            }
            (NodeStats::Array { total_size, element }, Datum::Array(items)) => {
                node.num_data = node.num_data.saturating_add(1);
                *total_size = total_size.saturating_add(items.len() as u32);
                let element = *element;
                for item in items {
                    self.add_value(element, item);
                }
            }
            (NodeStats::Map { value_schema, entries }, Datum::Map(values)) => {
                node.num_data = node.num_data.saturating_add(1);
                let value_schema = value_schema.clone();
                let known: Vec<Option<NodeId>> =
                    values.keys().map(|k| entries.get(k).copied()).collect();
                for ((key, v), existing) in values.iter().zip(known) {
                    let child = match (existing, &value_schema) {
                        (Some(child), _) => child,
                        (None, Some(schema)) => self.grow_map(id, key, schema),
                        (None, None) => {
                            trace!(key = %key, "map node cannot grow, skipping value");
                            continue;
                        }
                    };
                    self.add_value(child, v);
                }
            }
            (NodeStats::Record { fields, .. }, Datum::Record(values)) => {
                node.num_data = node.num_data.saturating_add(1);
                let present: Vec<(NodeId, &Datum)> = fields
                    .iter()
                    .filter_map(|(name, child)| values.get(name).map(|v| (*child, v)))
                    .collect();
                for (child, v) in present {
                    self.add_value(child, v);
                }
            }
            (NodeStats::Union { branches }, v) => match branches.get_mut(&v.kind()) {
                Some(branch) => {
                    branch.count = branch.count.saturating_add(1);
                    node.num_data = node.num_data.saturating_add(1);
                    let target = branch.node;
                    self.add_value(target, v);
                }
                None => trace!(kind = %v.kind(), "skipping value outside union branches"),
            },
            (stats, v) => {
                trace!(declared = %stats.kind(), found = %v.kind(), "skipping mismatched value")
            }
        }
    }

    fn grow_map(&mut self, map: NodeId, key: &str, schema: &Schema) -> NodeId {
        let child = self.build(schema, schema.doc().unwrap_or_default(), Some(map));
        if let NodeStats::Map { entries, .. } = &mut self.nodes[map.0].stats {
            entries.insert(key.to_string(), child);
        }
        child
    }
}

/// Read-only statistical profile of one dataset
///
/// Node ids are preorder indices in `[0, len())`; node 0 is the root record.
#[derive(Debug, Clone)]
pub struct SchemaSummary {
    nodes: Vec<ProfileNode>,
    labels: Vec<String>,
    dataset_label: String,
}

impl SchemaSummary {
    /// Profile `records` under `schema`.
    pub fn from_data<'a, I>(schema: &Schema, records: I, dataset_label: &str) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Datum>,
    {
        Self::from_data_with(schema, records, dataset_label, &SummaryConfig::default())
    }

    pub fn from_data_with<'a, I>(
        schema: &Schema,
        records: I,
        dataset_label: &str,
        config: &SummaryConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Datum>,
    {
        let mut builder = SummaryBuilder::with_config(schema, dataset_label, config.clone())?;
        for record in records {
            builder.add_record(record);
        }
        builder.finish()
    }

    pub fn from_sample(sample: &Sample, dataset_label: &str) -> Result<Self> {
        Self::from_data(sample.schema(), sample.records(), dataset_label)
    }

    pub fn from_sample_with(
        sample: &Sample,
        dataset_label: &str,
        config: &SummaryConfig,
    ) -> Result<Self> {
        Self::from_data_with(sample.schema(), sample.records(), dataset_label, config)
    }

    /// Reorder an arena into preorder, rebuild parent links and cache labels.
    pub(crate) fn from_arena(nodes: Vec<ProfileNode>, root: NodeId, dataset_label: String) -> Self {
        let order = compute_preorder(&nodes, root);
        let mut position = vec![NodeId(usize::MAX); nodes.len()];
        for (pos, old) in order.iter().enumerate() {
            position[old.0] = NodeId(pos);
        }

        let mut slots: Vec<Option<ProfileNode>> = nodes.into_iter().map(Some).collect();
        let mut ordered: Vec<ProfileNode> = Vec::with_capacity(order.len());
        for old in &order {
            if let Some(mut node) = slots[old.0].take() {
                node.stats.remap(|id| position[id.0]);
                node.parent = None;
                ordered.push(node);
            }
        }

        for idx in 0..ordered.len() {
            for child in ordered[idx].stats.children() {
                ordered[child.0].parent = Some(NodeId(idx));
            }
        }

        let labels = (0..ordered.len())
            .map(|idx| compute_label(&ordered, idx))
            .collect();

        Self {
            nodes: ordered,
            labels,
            dataset_label,
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &ProfileNode {
        &self.nodes[0]
    }

    /// Node at preorder index `idx`.
    #[inline]
    pub fn node(&self, idx: usize) -> &ProfileNode {
        &self.nodes[idx]
    }

    /// All nodes in preorder.
    pub fn nodes(&self) -> impl Iterator<Item = (usize, &ProfileNode)> + '_ {
        self.nodes.iter().enumerate()
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.nodes[idx].parent.map(NodeId::index)
    }

    pub fn children(&self, idx: usize) -> Vec<usize> {
        self.nodes[idx]
            .stats
            .children()
            .into_iter()
            .map(NodeId::index)
            .collect()
    }

    #[inline]
    pub fn is_leaf(&self, idx: usize) -> bool {
        self.nodes[idx].is_leaf()
    }

    /// Number of leaf positions. Leaves only ever pair with leaves, so this is
    /// the size used for bucketing and for the mapping lower bound.
    pub fn field_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Name of the dataset the summary was built from.
    pub fn dataset_label(&self) -> &str {
        &self.dataset_label
    }

    /// Dotted label of a node, e.g. `address.city`. The root is `<root>`.
    #[inline]
    pub fn label(&self, idx: usize) -> &str {
        &self.labels[idx]
    }

    pub fn type_desc(&self, idx: usize) -> &'static str {
        self.nodes[idx].type_desc()
    }

    pub fn doc(&self, idx: usize) -> &str {
        self.nodes[idx].doc()
    }

    /// `label: TYPE`, with statistics appended in verbose mode.
    pub fn describe(&self, idx: usize, verbose: bool) -> String {
        let node = &self.nodes[idx];
        if verbose {
            format!("{}: {}({})", self.label(idx), node.type_desc(), node.stats_desc())
        } else {
            format!("{}: {}", self.label(idx), node.type_desc())
        }
    }

    /// Indented rendering of the whole tree.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Summary of '{}'", self.dataset_label);
        self.dump_node(&mut out, 0, 0, None);
        out
    }

    fn dump_node(&self, out: &mut String, idx: usize, depth: usize, name: Option<&str>) {
        let node = &self.nodes[idx];
        let indent = "  ".repeat(depth + 1);
        let name = name.map(|n| format!("{} => ", n)).unwrap_or_default();
        let _ = writeln!(
            out,
            "{}{}{}({})",
            indent,
            name,
            node.type_desc(),
            node.stats_desc()
        );
        for child in node.stats.children() {
            let child_name = node.stats.child_name(child).map(str::to_string);
            self.dump_node(out, child.0, depth + 1, child_name.as_deref());
        }
    }

    /// Cost of transforming node `i` of this summary into node `j` of `other`.
    pub fn transform_cost(&self, i: usize, other: &SchemaSummary, j: usize, config: &MatchConfig) -> f64 {
        cost::transform_cost(self, i, other, j, config)
    }

    /// Cheapest mapping from this summary onto `other` under default costs.
    pub fn best_mapping(self: &Arc<Self>, other: &Arc<SchemaSummary>) -> SchemaMapping {
        GreedyAligner::default().align(self, other)
    }

    /// Serialize with the summary wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        codec::decode(data)
    }
}

fn compute_preorder(nodes: &[ProfileNode], root: NodeId) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        order.push(id);
        stack.extend(nodes[id.0].stats.children().into_iter().rev());
    }
    order
}

fn compute_label(nodes: &[ProfileNode], idx: usize) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let mut current = NodeId(idx);
    while let Some(parent) = nodes[current.0].parent {
        if let Some(name) = nodes[parent.0].stats.child_name(current) {
            parts.push(name);
        }
        current = parent;
    }
    if parts.is_empty() {
        return ROOT_LABEL.to_string();
    }
    parts.reverse();
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, SchemaKind};

    fn nested_schema() -> Schema {
        Schema::record(
            "customer",
            vec![
                Field::new("name", Schema::String).with_doc("Full name"),
                Field::new(
                    "address",
                    Schema::record(
                        "address",
                        vec![
                            Field::new("zip", Schema::Int),
                            Field::new("city", Schema::String),
                        ],
                    ),
                ),
                Field::new("tags", Schema::Array(Box::new(Schema::String))),
                Field::new("score", Schema::Union(vec![Schema::Null, Schema::Double])),
                Field::new("attrs", Schema::Map(Box::new(Schema::Long))),
            ],
        )
    }

    fn nested_record(i: i32) -> Datum {
        Datum::record([
            ("name", Datum::from(format!("n{}", i))),
            (
                "address",
                Datum::record([("zip", Datum::Int(10_000 + i)), ("city", Datum::from("rome"))]),
            ),
            ("tags", Datum::Array(vec![Datum::from("a"), Datum::from("b")])),
            (
                "score",
                if i % 2 == 0 {
                    Datum::Null
                } else {
                    Datum::Double(f64::from(i))
                },
            ),
            (
                "attrs",
                Datum::Map([("k".to_string(), Datum::Long(i64::from(i)))].into_iter().collect()),
            ),
        ])
    }

    fn nested_summary() -> SchemaSummary {
        let records: Vec<Datum> = (0..4).map(nested_record).collect();
        SchemaSummary::from_data(&nested_schema(), &records, "customers").unwrap()
    }

    #[test]
    fn test_counters_saturate() {
        let schema = Schema::record(
            "r",
            vec![Field::new("flag", Schema::Boolean), Field::new("n", Schema::Int)],
        );
        let mut builder = SummaryBuilder::new(&schema, "big").unwrap();
        for node in &mut builder.nodes {
            node.num_data = u32::MAX;
            if let NodeStats::Boolean { num_true, .. } = &mut node.stats {
                *num_true = u32::MAX;
            }
        }
        builder.add_record(&Datum::record([("flag", Datum::Boolean(true)), ("n", Datum::Int(5))]));
        let summary = builder.finish().unwrap();

        assert!(summary.nodes().all(|(_, node)| node.num_data() == u32::MAX));
        let NodeStats::Boolean { num_true, num_false } = summary.node(1).stats() else {
            panic!("expected a boolean node");
        };
        assert_eq!((*num_true, *num_false), (u32::MAX, 0));
    }

    #[test]
    fn test_same_kind_union_branches_share_a_node() {
        let branch = |name: &str, field: &str| {
            Schema::record(name, vec![Field::new(field, Schema::Int)])
        };
        let schema = Schema::record(
            "r",
            vec![Field::new(
                "u",
                Schema::Union(vec![Schema::Null, branch("A", "x"), branch("B", "y")]),
            )],
        );
        let records = vec![
            Datum::record([("u", Datum::record([("x", Datum::Int(1))]))]),
            Datum::record([("u", Datum::Null)]),
        ];
        let summary = SchemaSummary::from_data(&schema, &records, "u").unwrap();

        let NodeStats::Union { branches } = summary.node(1).stats() else {
            panic!("expected a union node");
        };
        assert_eq!(
            branches.keys().copied().collect::<Vec<_>>(),
            vec![SchemaKind::Null, SchemaKind::Record]
        );
        assert_eq!(summary.label(4), "u.x");
        assert_eq!(summary.len(), 5);
    }

    #[test]
    fn test_rejects_non_record_schema() {
        let err = SummaryBuilder::new(&Schema::Int, "x").unwrap_err();
        assert!(matches!(err, Error::NotARecord(SchemaKind::Int)));
    }

    #[test]
    fn test_rejects_empty_sample() {
        let schema = Schema::record("r", vec![Field::new("a", Schema::Int)]);
        let records: Vec<Datum> = Vec::new();
        assert!(matches!(
            SchemaSummary::from_data(&schema, &records, "empty"),
            Err(Error::EmptySample)
        ));
    }

    #[test]
    fn test_preorder_and_labels() {
        let summary = nested_summary();
        let described: Vec<(String, SchemaKind)> = summary
            .nodes()
            .map(|(idx, node)| (summary.label(idx).to_string(), node.kind()))
            .collect();

        assert_eq!(
            described,
            vec![
                ("<root>".to_string(), SchemaKind::Record),
                ("address".to_string(), SchemaKind::Record),
                ("address.city".to_string(), SchemaKind::String),
                ("address.zip".to_string(), SchemaKind::Int),
                ("attrs".to_string(), SchemaKind::Map),
                ("attrs.k".to_string(), SchemaKind::Long),
                ("name".to_string(), SchemaKind::String),
                ("score".to_string(), SchemaKind::Union),
                ("score".to_string(), SchemaKind::Double),
                ("score".to_string(), SchemaKind::Null),
                ("tags".to_string(), SchemaKind::Array),
                ("tags".to_string(), SchemaKind::String),
            ]
        );

        for (idx, _) in summary.nodes().skip(1) {
            let parent = summary.parent(idx).unwrap();
            assert!(parent < idx);
            assert!(summary.children(parent).contains(&idx));
        }
        assert_eq!(summary.parent(0), None);
        assert_eq!(summary.field_count(), 7);
    }

    #[test]
    fn test_statistics_are_accumulated() {
        let summary = nested_summary();
        assert_eq!(summary.root().num_data(), 4);
        assert_eq!(summary.doc(6), "Full name");

        let zip = summary.node(3);
        let stats = zip.stats().numeric().unwrap();
        assert_eq!(zip.num_data(), 4);
        assert_eq!(stats.mean(zip.num_data()), Some(10_001.5));

        match summary.node(7).stats() {
            NodeStats::Union { branches } => {
                assert_eq!(branches[&SchemaKind::Null].count(), 2);
                assert_eq!(branches[&SchemaKind::Double].count(), 2);
            }
            other => panic!("unexpected stats {:?}", other),
        }
        match summary.node(10).stats() {
            NodeStats::Array { total_size, .. } => assert_eq!(*total_size, 8),
            other => panic!("unexpected stats {:?}", other),
        }
        assert_eq!(summary.node(11).num_data(), 8);
    }

    #[test]
    fn test_mismatched_values_are_skipped() {
        let schema = Schema::record("r", vec![Field::new("a", Schema::Int)]);
        let records = vec![
            Datum::record([("a", Datum::Int(1))]),
            Datum::record([("a", Datum::from("oops"))]),
            Datum::record::<_, String>([]),
        ];
        let summary = SchemaSummary::from_data(&schema, &records, "r").unwrap();
        assert_eq!(summary.root().num_data(), 3);
        assert_eq!(summary.node(1).num_data(), 1);
    }

    #[test]
    fn test_enum_counts_start_at_one() {
        let schema = Schema::record(
            "r",
            vec![Field::new(
                "color",
                Schema::Enum {
                    name: "Color".to_string(),
                    symbols: vec!["RED".to_string(), "BLUE".to_string()],
                    doc: None,
                },
            )],
        );
        let records = vec![Datum::record([("color", Datum::Enum("RED".to_string()))])];
        let summary = SchemaSummary::from_data(&schema, &records, "r").unwrap();
        match summary.node(1).stats() {
            NodeStats::Enum { symbol_counts, .. } => {
                assert_eq!(symbol_counts["RED"], 2);
                assert_eq!(symbol_counts["BLUE"], 1);
            }
            other => panic!("unexpected stats {:?}", other),
        }
        assert_eq!(summary.node(1).num_data(), 1);
    }

    #[test]
    fn test_field_order_does_not_change_preorder() {
        let a = Schema::record(
            "r",
            vec![Field::new("x", Schema::Int), Field::new("y", Schema::String)],
        );
        let b = Schema::record(
            "r",
            vec![Field::new("y", Schema::String), Field::new("x", Schema::Int)],
        );
        let records = vec![Datum::record([("x", Datum::Int(1)), ("y", Datum::from("s"))])];
        let sa = SchemaSummary::from_data(&a, &records, "a").unwrap();
        let sb = SchemaSummary::from_data(&b, &records, "b").unwrap();
        for idx in 0..sa.len() {
            assert_eq!(sa.label(idx), sb.label(idx));
            assert_eq!(sa.node(idx).kind(), sb.node(idx).kind());
        }
    }

    #[test]
    fn test_describe_and_dump() {
        let summary = nested_summary();
        assert_eq!(summary.describe(3, false), "address.zip: INT");
        assert!(summary.describe(3, true).starts_with("address.zip: INT(numData: 4, avg: 10001.5"));

        let dump = summary.dump();
        assert!(dump.starts_with("Summary of 'customers'"));
        assert!(dump.contains("address => RECORD"));
        assert!(dump.contains("zip => INT"));
    }
}
