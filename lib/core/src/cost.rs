//! Cost model between two profile nodes
//!
//! Nodes of different kinds always cost the type-clash penalty. Nodes of the
//! same kind cost the distance between their labels plus a data term:
//!
//! | kind | data term |
//! |------|-----------|
//! | int, long, float, double | KL divergence of the fitted Gaussians |
//! | string | `1 - Jaccard` over retained distinct values |
//! | everything else | 0 |
//!
//! All ratios are guarded, so no cost is ever NaN.

use std::collections::BTreeSet;

use crate::config::MatchConfig;
use crate::profile::{NodeStats, NumericStats};
use crate::summary::SchemaSummary;

/// Number of single-character edits turning `a` into `b`.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    let m = short.len();
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut curr: Vec<usize> = vec![0; m + 1];

    for (j, lc) in long.iter().enumerate() {
        curr[0] = j + 1;
        for i in 1..=m {
            let substitution = if short[i - 1] == *lc { 0 } else { 1 };
            curr[i] = (prev[i] + 1)
                .min(curr[i - 1] + 1)
                .min(prev[i - 1] + substitution);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m]
}

/// Edit distance divided by the longer string's length, in `[0, 1]`.
#[inline]
pub fn normalized_levenshtein(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    levenshtein_distance(a, b) as f64 / longest as f64
}

/// Last dotted component of a label: `address.city` -> `city`.
#[inline]
pub fn trailing_component(label: &str) -> &str {
    label.rsplit('.').next().unwrap_or(label)
}

/// Distance between two node labels.
pub fn label_distance(a: &str, b: &str, config: &MatchConfig) -> f64 {
    if !config.use_attribute_labels {
        return 0.0;
    }
    normalized_levenshtein(trailing_component(a), trailing_component(b))
}

/// Gaussian fitted to a numeric node: `(mean, variance)`.
///
/// `None` when the node saw no data or too few samples to estimate a variance.
pub fn fit_gaussian(stats: &NumericStats, num_data: u32) -> Option<(f64, f64)> {
    Some((stats.mean(num_data)?, stats.variance(num_data)?))
}

/// KL divergence `D(p || q)` between two fitted Gaussians.
///
/// Degenerate fits (no estimate or zero variance) yield 0 when both sides are
/// degenerate in the same way and `max_divergence` otherwise. The result is
/// clamped to `[0, max_divergence]`.
pub fn gaussian_divergence(
    p: Option<(f64, f64)>,
    q: Option<(f64, f64)>,
    max_divergence: f64,
) -> f64 {
    let divergence = match (p, q) {
        (None, None) => 0.0,
        (Some((m1, v1)), Some((m2, v2))) if v1 > 0.0 && v2 > 0.0 => {
            (v2.sqrt() / v1.sqrt()).ln() + (v1 + (m1 - m2) * (m1 - m2)) / (2.0 * v2) - 0.5
        }
        (Some((m1, v1)), Some((m2, v2))) if v1 == 0.0 && v2 == 0.0 && means_equal(m1, m2) => 0.0,
        _ => max_divergence,
    };

    if divergence.is_nan() {
        max_divergence
    } else {
        divergence.clamp(0.0, max_divergence)
    }
}

fn means_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Jaccard similarity of two value sets, ignoring empty strings.
///
/// Two sets with no non-empty values are considered identical.
pub fn jaccard_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let a_len = a.iter().filter(|s| !s.is_empty()).count();
    let b_len = b.iter().filter(|s| !s.is_empty()).count();
    let shared = a
        .iter()
        .filter(|s| !s.is_empty() && b.contains(*s))
        .count();
    let union = a_len + b_len - shared;
    if union == 0 {
        return 1.0;
    }
    shared as f64 / union as f64
}

/// Cost of transforming node `i` of `t1` into node `j` of `t2`.
pub fn transform_cost(
    t1: &SchemaSummary,
    i: usize,
    t2: &SchemaSummary,
    j: usize,
    config: &MatchConfig,
) -> f64 {
    let a = t1.node(i);
    let b = t2.node(j);
    if a.kind() != b.kind() {
        return config.type_clash_cost;
    }

    let label = label_distance(t1.label(i), t2.label(j), config);
    let data = match (a.stats(), b.stats()) {
        (NodeStats::Int(x), NodeStats::Int(y))
        | (NodeStats::Long(x), NodeStats::Long(y))
        | (NodeStats::Float(x), NodeStats::Float(y))
        | (NodeStats::Double(x), NodeStats::Double(y)) => gaussian_divergence(
            fit_gaussian(x, a.num_data()),
            fit_gaussian(y, b.num_data()),
            config.max_divergence,
        ),
        (NodeStats::String(x), NodeStats::String(y)) => {
            1.0 - jaccard_similarity(x.distinct(), y.distinct())
        }
        _ => 0.0,
    };

    label + data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("f1", "name"), 4);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_normalized_levenshtein_bounds() {
        assert_eq!(normalized_levenshtein("", ""), 0.0);
        assert_eq!(normalized_levenshtein("f0", "id"), 1.0);
        assert_eq!(normalized_levenshtein("abc", ""), 1.0);
        let d = normalized_levenshtein("city", "cities");
        assert!(d > 0.0 && d < 1.0);
    }

    #[test]
    fn test_label_distance_uses_trailing_component() {
        let config = MatchConfig::default();
        assert_eq!(label_distance("address.city", "home.city", &config), 0.0);
        assert_eq!(trailing_component("<root>"), "<root>");

        let ignore = MatchConfig {
            use_attribute_labels: false,
            ..Default::default()
        };
        assert_eq!(label_distance("abc", "xyz", &ignore), 0.0);
    }

    #[test]
    fn test_gaussian_divergence_identical_is_zero() {
        let d = gaussian_divergence(Some((4.5, 8.25)), Some((4.5, 8.25)), 10_000.0);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_gaussian_divergence_grows_with_mean_shift() {
        let near = gaussian_divergence(Some((0.0, 1.0)), Some((1.0, 1.0)), 10_000.0);
        let far = gaussian_divergence(Some((0.0, 1.0)), Some((5.0, 1.0)), 10_000.0);
        assert!((near - 0.5).abs() < 1e-12);
        assert!(far > near);
    }

    #[test]
    fn test_gaussian_divergence_degenerate() {
        let max = 10_000.0;
        assert_eq!(gaussian_divergence(None, None, max), 0.0);
        assert_eq!(gaussian_divergence(Some((1.0, 2.0)), None, max), max);
        assert_eq!(gaussian_divergence(Some((3.0, 0.0)), Some((3.0, 0.0)), max), 0.0);
        assert_eq!(gaussian_divergence(Some((3.0, 0.0)), Some((4.0, 0.0)), max), max);
        assert_eq!(gaussian_divergence(Some((3.0, 0.0)), Some((3.0, 1.0)), max), max);
        assert_eq!(
            gaussian_divergence(Some((0.0, 1e-300)), Some((1e300, 1e-300)), max),
            max
        );
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard_similarity(&set(&["a", "b"]), &set(&["a", "b"])), 1.0);
        assert_eq!(jaccard_similarity(&set(&["a", "b"]), &set(&["b", "c"])), 1.0 / 3.0);
        assert_eq!(jaccard_similarity(&set(&[]), &set(&[])), 1.0);
        assert_eq!(jaccard_similarity(&set(&[""]), &set(&[])), 1.0);
        assert_eq!(jaccard_similarity(&set(&["", "a"]), &set(&["", "b"])), 0.0);
    }
}
