//! Human and machine readable rendering of search results
//!
//! Each ranked match is grouped into three lists:
//!
//! - discovered labels: query fields paired with a known field (transforms)
//! - unmatched items in the target data type: known fields with no
//!   counterpart in the query (creates)
//! - unmatched items in the source data: query fields with no counterpart
//!   in the known dataset (deletes)

use std::fmt::Write as _;

use serde::Serialize;

use schemadict_core::{MappingOp, SchemaSummary};

use crate::suggest::DictionaryMapping;

/// Header line of a rendered ranking
pub const RANKING_HEADER: &str =
    "Ranking of closest known data types, with match-distance (smaller is better):";

/// A query field paired with a field of the known dataset
#[derive(Debug, Clone, Serialize)]
pub struct FieldRename {
    /// Dataset the query field comes from
    pub dataset: String,
    /// Label in the query
    pub source: String,
    /// Suggested label from the known dataset
    pub target: String,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_doc: Option<String>,
}

/// A field present on one side only
#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedField {
    pub label: String,
    pub type_desc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl UnmatchedField {
    fn from_node(summary: &SchemaSummary, idx: usize) -> Self {
        Self {
            label: summary.label(idx).to_string(),
            type_desc: summary.type_desc(idx),
            doc: non_empty(summary.doc(idx)),
        }
    }
}

/// One ranked suggestion with its rename plan
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionReport {
    pub rank: usize,
    /// Label of the known dataset
    pub label: String,
    pub distance: f64,
    pub renames: Vec<FieldRename>,
    pub unmatched_in_target: Vec<UnmatchedField>,
    pub unmatched_in_source: Vec<UnmatchedField>,
}

impl SuggestionReport {
    /// Group the operations of one match. The roots are never reported:
    /// their pairing is implied and they are not fields.
    pub fn from_mapping(rank: usize, matched: &DictionaryMapping) -> Self {
        let source = matched.mapping.source();
        let target = matched.mapping.target();

        let mut renames = Vec::new();
        let mut unmatched_in_target = Vec::new();
        let mut unmatched_in_source = Vec::new();
        for op in matched.mapping.ops() {
            match *op {
                MappingOp::Transform { src, dst, cost } => {
                    if src == 0 && dst == 0 {
                        continue;
                    }
                    renames.push(FieldRename {
                        dataset: source.dataset_label().to_string(),
                        source: source.label(src).to_string(),
                        target: target.label(dst).to_string(),
                        cost,
                        source_doc: non_empty(source.doc(src)),
                        target_doc: non_empty(target.doc(dst)),
                    });
                }
                MappingOp::Create { dst, .. } if dst != 0 => {
                    unmatched_in_target.push(UnmatchedField::from_node(target, dst))
                }
                MappingOp::Delete { src, .. } if src != 0 => {
                    unmatched_in_source.push(UnmatchedField::from_node(source, src))
                }
                MappingOp::Create { .. } | MappingOp::Delete { .. } => {}
            }
        }

        Self {
            rank,
            label: matched.entry.label().to_string(),
            distance: matched.cost,
            renames,
            unmatched_in_target,
            unmatched_in_source,
        }
    }

    /// Text block for this suggestion; `verbose` adds doc strings.
    pub fn render(&self, verbose: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}.  '{}', with distance: {}", self.rank, self.label, self.distance);

        let _ = writeln!(out);
        let _ = writeln!(out, " DISCOVERED LABELS");
        if self.renames.is_empty() {
            let _ = writeln!(out, "  (None)");
        }
        for (i, rename) in self.renames.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}.  In '{}', label '{}' AS {}",
                i + 1,
                rename.dataset,
                rename.source,
                rename.target
            );
            if verbose {
                if let Some(doc) = &rename.source_doc {
                    let _ = writeln!(
                        out,
                        "         '{}'  ==> '{}'",
                        doc,
                        rename.target_doc.as_deref().unwrap_or_default()
                    );
                }
            }
        }

        render_unmatched(&mut out, " UNMATCHED ITEMS IN TARGET DATA TYPE", &self.unmatched_in_target, verbose);
        render_unmatched(&mut out, " UNMATCHED ITEMS IN SOURCE DATA", &self.unmatched_in_source, verbose);
        out
    }
}

fn render_unmatched(out: &mut String, title: &str, fields: &[UnmatchedField], verbose: bool) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", title);
    if fields.is_empty() {
        let _ = writeln!(out, "  (None)");
    }
    for (i, field) in fields.iter().enumerate() {
        let _ = writeln!(out, "  {}.  {}", i + 1, field.label);
        if verbose {
            if let Some(doc) = &field.doc {
                let _ = writeln!(out, "         {}", doc);
            }
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Serializable ranking, as written by `schema-suggest -f`
#[derive(Debug, Clone, Serialize)]
pub struct SuggestResponse {
    pub result: Vec<SuggestionReport>,
}

impl SuggestResponse {
    pub fn from_matches(matches: &[DictionaryMapping]) -> Self {
        Self {
            result: matches
                .iter()
                .enumerate()
                .map(|(i, m)| SuggestionReport::from_mapping(i + 1, m))
                .collect(),
        }
    }

    /// Full text ranking, header first.
    pub fn render(&self, verbose: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", RANKING_HEADER);
        for report in &self.result {
            let _ = writeln!(out);
            out.push_str(&report.render(verbose));
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
