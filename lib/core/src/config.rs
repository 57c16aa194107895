//! Tunable policy constants
//!
//! Every constant that shapes profiling, matching or search lives in one of
//! three plain structs. Each has a `Default` carrying the reference values and
//! deserializes with `serde`, so callers can override single fields.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_TYPE_CLASH_COST: f64 = 10_000.0;
pub const DEFAULT_CREATE_COST: f64 = 1_000.0;
pub const DEFAULT_DELETE_COST: f64 = 1_000.0;
pub const DEFAULT_MAX_NUMERIC_SAMPLES: usize = 50;
pub const DEFAULT_MAX_DISTINCT_STRINGS: usize = 1_000;
pub const DEFAULT_RESERVOIR_SEED: u64 = 0x5eed_5c4e_3a00_0001;
pub const DEFAULT_NUM_BUCKETS: usize = 20;

/// Costs used when aligning two summaries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// Cost of pairing two nodes of different kinds
    pub type_clash_cost: f64,
    /// Cost of creating a target node with no source counterpart
    pub create_cost: f64,
    /// Cost of deleting a source node with no target counterpart
    pub delete_cost: f64,
    /// Upper bound for the numeric divergence term
    pub max_divergence: f64,
    /// When false, label distance is always 0 and only data statistics count
    pub use_attribute_labels: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            type_clash_cost: DEFAULT_TYPE_CLASH_COST,
            create_cost: DEFAULT_CREATE_COST,
            delete_cost: DEFAULT_DELETE_COST,
            max_divergence: DEFAULT_TYPE_CLASH_COST,
            use_attribute_labels: true,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("type_clash_cost", self.type_clash_cost),
            ("create_cost", self.create_cost),
            ("delete_cost", self.delete_cost),
            ("max_divergence", self.max_divergence),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Cheapest single structural edit.
    #[inline]
    pub fn min_edit_cost(&self) -> f64 {
        self.create_cost.min(self.delete_cost)
    }
}

/// Limits applied while profiling sampled data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SummaryConfig {
    /// Reservoir size for numeric nodes
    pub max_numeric_samples: usize,
    /// Distinct values retained per string node
    pub max_distinct_strings: usize,
    /// Seed for reservoir replacement, so identical inputs give identical summaries
    pub reservoir_seed: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_numeric_samples: DEFAULT_MAX_NUMERIC_SAMPLES,
            max_distinct_strings: DEFAULT_MAX_DISTINCT_STRINGS,
            reservoir_seed: DEFAULT_RESERVOIR_SEED,
        }
    }
}

impl SummaryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_numeric_samples == 0 {
            return Err(Error::InvalidConfig(
                "max_numeric_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Dictionary search settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuggestConfig {
    /// Number of pigeonhole buckets over field counts
    pub num_buckets: usize,
    /// Costs used by the default aligner
    pub matching: MatchConfig,
    /// Limits used when profiling query samples
    pub summary: SummaryConfig,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            num_buckets: DEFAULT_NUM_BUCKETS,
            matching: MatchConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

impl SuggestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_buckets == 0 {
            return Err(Error::InvalidConfig(
                "num_buckets must be at least 1".to_string(),
            ));
        }
        self.matching.validate()?;
        self.summary.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.type_clash_cost, 10_000.0);
        assert_eq!(config.min_edit_cost(), 1_000.0);
        assert!(config.validate().is_ok());
        assert_eq!(SuggestConfig::default().num_buckets, 20);
        assert_eq!(SummaryConfig::default().max_numeric_samples, 50);
    }

    #[test]
    fn test_partial_override_from_json() {
        let config: SuggestConfig =
            serde_json::from_str(r#"{"num_buckets": 5, "matching": {"create_cost": 10.0}}"#).unwrap();
        assert_eq!(config.num_buckets, 5);
        assert_eq!(config.matching.create_cost, 10.0);
        assert_eq!(config.matching.delete_cost, DEFAULT_DELETE_COST);
        assert_eq!(config.matching.min_edit_cost(), 10.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SuggestConfig {
            num_buckets: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let matching = MatchConfig {
            delete_cost: f64::NAN,
            ..Default::default()
        };
        assert!(matching.validate().is_err());
    }
}
