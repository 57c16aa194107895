//! Tree alignment between two summaries
//!
//! A [`SchemaMapping`] is a list of edit operations that turns a source
//! summary into a target summary. Alignment sits behind the [`Aligner`]
//! trait; [`GreedyAligner`] is the stock implementation:
//!
//! 1. every leaf pair is costed once and the pairs are sorted by
//!    `(cost, source index, target index)`;
//! 2. pairs are accepted greedily while both sides are free and the pair is
//!    cheaper than a delete plus a create;
//! 3. non-leaves are promoted bottom-up when all their matched children land
//!    under one free non-leaf of the same kind, and the two roots are
//!    paired even if nothing below them matched;
//! 4. whatever is left is deleted (source) or created (target).
//!
//! The result is a good mapping, not necessarily the optimal one.

use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::AHashSet;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::config::MatchConfig;
use crate::cost;
use crate::summary::SchemaSummary;

/// One edit operation; indices are preorder positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum MappingOp {
    /// Source node `src` becomes target node `dst`
    Transform { src: usize, dst: usize, cost: f64 },
    /// Target node `dst` has no source counterpart
    Create { dst: usize, cost: f64 },
    /// Source node `src` has no target counterpart
    Delete { src: usize, cost: f64 },
}

impl MappingOp {
    #[inline]
    pub fn cost(&self) -> f64 {
        match self {
            MappingOp::Transform { cost, .. }
            | MappingOp::Create { cost, .. }
            | MappingOp::Delete { cost, .. } => *cost,
        }
    }
}

/// Edit script from a source summary onto a target summary
#[derive(Debug, Clone)]
pub struct SchemaMapping {
    source: Arc<SchemaSummary>,
    target: Arc<SchemaSummary>,
    cost: f64,
    ops: Vec<MappingOp>,
}

impl SchemaMapping {
    /// Total cost is the sum of the operation costs.
    pub fn new(source: Arc<SchemaSummary>, target: Arc<SchemaSummary>, ops: Vec<MappingOp>) -> Self {
        let cost = ops.iter().map(MappingOp::cost).sum();
        Self {
            source,
            target,
            cost,
            ops,
        }
    }

    pub fn source(&self) -> &Arc<SchemaSummary> {
        &self.source
    }

    pub fn target(&self) -> &Arc<SchemaSummary> {
        &self.target
    }

    /// Lower is better; 0 means identical.
    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn ops(&self) -> &[MappingOp] {
        &self.ops
    }

    /// `(src, dst, cost)` for every transform.
    pub fn transforms(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.ops.iter().filter_map(|op| match *op {
            MappingOp::Transform { src, dst, cost } => Some((src, dst, cost)),
            _ => None,
        })
    }

    /// Target nodes with no source counterpart.
    pub fn creates(&self) -> impl Iterator<Item = usize> + '_ {
        self.ops.iter().filter_map(|op| match *op {
            MappingOp::Create { dst, .. } => Some(dst),
            _ => None,
        })
    }

    /// Source nodes with no target counterpart.
    pub fn deletes(&self) -> impl Iterator<Item = usize> + '_ {
        self.ops.iter().filter_map(|op| match *op {
            MappingOp::Delete { src, .. } => Some(src),
            _ => None,
        })
    }
}

/// Strategy that aligns one summary onto another
pub trait Aligner: Send + Sync {
    fn align(&self, source: &Arc<SchemaSummary>, target: &Arc<SchemaSummary>) -> SchemaMapping;

    /// Costs the aligner works with; search uses them for lower bounds.
    fn config(&self) -> &MatchConfig;
}

/// Lower bound on the cost of mapping a tree with `k` leaves onto one with `m`.
#[inline]
pub fn minimum_mapping_cost(k: usize, m: usize, config: &MatchConfig) -> f64 {
    k.abs_diff(m) as f64 * config.min_edit_cost()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct CandidatePair {
    cost: OrderedFloat<f64>,
    src: usize,
    dst: usize,
}

/// Greedy leaf matching followed by structural promotion
#[derive(Debug, Clone, Default)]
pub struct GreedyAligner {
    config: MatchConfig,
}

impl GreedyAligner {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }
}

impl Aligner for GreedyAligner {
    fn align(&self, source: &Arc<SchemaSummary>, target: &Arc<SchemaSummary>) -> SchemaMapping {
        let t1 = source.as_ref();
        let t2 = target.as_ref();
        let config = &self.config;

        let (leaves1, inner1): (Vec<usize>, Vec<usize>) = (0..t1.len()).partition(|&i| t1.is_leaf(i));
        let leaves2: Vec<usize> = (0..t2.len()).filter(|&j| t2.is_leaf(j)).collect();

        let mut candidates = Vec::with_capacity(leaves1.len() * leaves2.len());
        for &i in &leaves1 {
            for &j in &leaves2 {
                candidates.push(CandidatePair {
                    cost: OrderedFloat(cost::transform_cost(t1, i, t2, j, config)),
                    src: i,
                    dst: j,
                });
            }
        }
        candidates.sort_unstable();

        let mut matched: Vec<Option<usize>> = vec![None; t1.len()];
        let mut taken: AHashSet<usize> = AHashSet::with_capacity(t2.len());
        let mut ops = Vec::new();

        let limit = leaves1.len().min(leaves2.len());
        let edit_cost = config.delete_cost + config.create_cost;
        let mut accepted = 0;
        for pair in candidates {
            if accepted == limit || pair.cost.into_inner() >= edit_cost {
                break;
            }
            if matched[pair.src].is_some() || taken.contains(&pair.dst) {
                continue;
            }
            matched[pair.src] = Some(pair.dst);
            taken.insert(pair.dst);
            ops.push(MappingOp::Transform {
                src: pair.src,
                dst: pair.dst,
                cost: pair.cost.into_inner(),
            });
            accepted += 1;
        }

        // Children precede parents in reverse preorder, so promoted
        // containers can in turn promote their own parents.
        for &i in inner1.iter().rev() {
            let parents: BTreeSet<Option<usize>> = t1
                .children(i)
                .into_iter()
                .filter_map(|child| matched[child])
                .map(|dst| t2.parent(dst))
                .collect();
            if parents.len() != 1 {
                continue;
            }
            let Some(Some(dst)) = parents.into_iter().next() else {
                continue;
            };
            if taken.contains(&dst) || t2.node(dst).kind() != t1.node(i).kind() {
                continue;
            }
            matched[i] = Some(dst);
            taken.insert(dst);
            ops.push(MappingOp::Transform { src: i, dst, cost: 0.0 });
        }

        // Roots always correspond, even when nothing below them matched.
        if matched[0].is_none() && !taken.contains(&0) && t1.node(0).kind() == t2.node(0).kind() {
            matched[0] = Some(0);
            taken.insert(0);
            ops.push(MappingOp::Transform { src: 0, dst: 0, cost: 0.0 });
        }

        for (src, m) in matched.iter().enumerate() {
            if m.is_none() {
                ops.push(MappingOp::Delete {
                    src,
                    cost: config.delete_cost,
                });
            }
        }
        for dst in 0..t2.len() {
            if !taken.contains(&dst) {
                ops.push(MappingOp::Create {
                    dst,
                    cost: config.create_cost,
                });
            }
        }

        SchemaMapping::new(Arc::clone(source), Arc::clone(target), ops)
    }

    fn config(&self) -> &MatchConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Datum, Field, Schema};

    fn summarize(schema: &Schema, records: &[Datum], label: &str) -> Arc<SchemaSummary> {
        Arc::new(SchemaSummary::from_data(schema, records, label).unwrap())
    }

    fn people(names: [&str; 2]) -> (Schema, Vec<Datum>) {
        let schema = Schema::record(
            "person",
            vec![
                Field::new(names[0], Schema::Int),
                Field::new(names[1], Schema::String),
            ],
        );
        let records = (0..10)
            .map(|i| {
                Datum::record([
                    (names[0], Datum::Int(i)),
                    (names[1], Datum::from(format!("person-{}", i))),
                ])
            })
            .collect();
        (schema, records)
    }

    #[test]
    fn test_identical_summaries_cost_zero() {
        let (schema, records) = people(["id", "name"]);
        let a = summarize(&schema, &records, "a");
        let b = summarize(&schema, &records, "b");

        let mapping = a.best_mapping(&b);
        assert_eq!(mapping.cost(), 0.0);
        assert_eq!(mapping.transforms().count(), 3);
        assert_eq!(mapping.creates().count(), 0);
        assert_eq!(mapping.deletes().count(), 0);
    }

    #[test]
    fn test_empty_records_cost_zero() {
        let schema = Schema::record("r", Vec::new());
        let records = vec![Datum::Record(Default::default()); 3];
        let a = summarize(&schema, &records, "a");
        let b = summarize(&schema, &records, "b");

        let mapping = a.best_mapping(&b);
        assert_eq!(mapping.cost(), 0.0);
        assert_eq!(mapping.ops(), &[MappingOp::Transform { src: 0, dst: 0, cost: 0.0 }]);
    }

    #[test]
    fn test_renamed_fields_map_by_kind() {
        let (s1, r1) = people(["f0", "f1"]);
        let (s2, r2) = people(["id", "name"]);
        let query = summarize(&s1, &r1, "query");
        let known = summarize(&s2, &r2, "known");

        let mapping = query.best_mapping(&known);
        let transforms: Vec<(usize, usize, f64)> = mapping.transforms().collect();
        assert_eq!(transforms, vec![(1, 1, 1.0), (2, 2, 1.0), (0, 0, 0.0)]);
        assert_eq!(query.label(1), "f0");
        assert_eq!(known.label(1), "id");
        assert_eq!(mapping.cost(), 2.0);
    }

    #[test]
    fn test_type_clash_is_constant() {
        let config = MatchConfig::default();
        let a = summarize(
            &Schema::record("r", vec![Field::new("x", Schema::Int)]),
            &[Datum::record([("x", Datum::Int(1))])],
            "a",
        );
        let b = summarize(
            &Schema::record("r", vec![Field::new("x", Schema::String)]),
            &[Datum::record([("x", Datum::from("1"))])],
            "b",
        );
        assert_eq!(a.transform_cost(1, &b, 1, &config), config.type_clash_cost);
        assert_eq!(b.transform_cost(1, &a, 1, &config), config.type_clash_cost);

        // A clash is never preferred over delete + create; the roots still
        // correspond.
        let mapping = a.best_mapping(&b);
        assert_eq!(mapping.transforms().collect::<Vec<_>>(), vec![(0, 0, 0.0)]);
        assert_eq!(mapping.deletes().collect::<Vec<_>>(), vec![1]);
        assert_eq!(mapping.creates().collect::<Vec<_>>(), vec![1]);
        assert_eq!(mapping.cost(), 2_000.0);
    }

    #[test]
    fn test_extra_fields_are_created_and_deleted() {
        let small = Schema::record("r", vec![Field::new("a", Schema::Int)]);
        let large = Schema::record(
            "r",
            vec![
                Field::new("a", Schema::Int),
                Field::new("b", Schema::Boolean),
                Field::new("c", Schema::Boolean),
            ],
        );
        let records_small = vec![Datum::record([("a", Datum::Int(1))]), Datum::record([("a", Datum::Int(3))])];
        let records_large = vec![
            Datum::record([("a", Datum::Int(1)), ("b", Datum::Boolean(true)), ("c", Datum::Boolean(false))]),
            Datum::record([("a", Datum::Int(3)), ("b", Datum::Boolean(false)), ("c", Datum::Boolean(true))]),
        ];
        let s = summarize(&small, &records_small, "small");
        let l = summarize(&large, &records_large, "large");

        let forward = s.best_mapping(&l);
        assert_eq!(forward.creates().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(forward.cost(), 2_000.0);

        let backward = l.best_mapping(&s);
        assert_eq!(backward.deletes().collect::<Vec<_>>(), vec![2, 3]);

        let config = MatchConfig::default();
        let bound = minimum_mapping_cost(s.field_count(), l.field_count(), &config);
        assert_eq!(bound, 2_000.0);
        assert!(forward.cost() >= bound);
        assert!(backward.cost() >= bound);
    }

    #[test]
    fn test_nested_records_are_promoted() {
        let inner = |name: &str| {
            Schema::record(
                name,
                vec![Field::new("street", Schema::String), Field::new("zip", Schema::Int)],
            )
        };
        let s1 = Schema::record("r", vec![Field::new("home", inner("home"))]);
        let s2 = Schema::record("r", vec![Field::new("address", inner("address"))]);
        let record = |field: &str| {
            Datum::record([(
                field,
                Datum::record([("street", Datum::from("main")), ("zip", Datum::Int(7))]),
            )])
        };
        let a = summarize(&s1, &[record("home")], "a");
        let b = summarize(&s2, &[record("address")], "b");

        let mapping = a.best_mapping(&b);
        let transforms: Vec<(usize, usize, f64)> = mapping.transforms().collect();
        assert!(transforms.contains(&(1, 1, 0.0)));
        assert!(transforms.contains(&(0, 0, 0.0)));
        assert_eq!(mapping.creates().count(), 0);
        assert_eq!(mapping.deletes().count(), 0);
    }

    #[test]
    fn test_custom_costs() {
        let config = MatchConfig {
            create_cost: 5.0,
            delete_cost: 3.0,
            ..Default::default()
        };
        assert_eq!(minimum_mapping_cost(4, 1, &config), 9.0);
        assert_eq!(minimum_mapping_cost(1, 4, &config), 9.0);
        assert_eq!(GreedyAligner::new(config.clone()).config(), &config);
    }
}
