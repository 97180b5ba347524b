mod levels;
mod policy;
mod rules;

pub use levels::LevelTable;
pub use policy::{LevelSetPolicy, ScoringPolicy, TimestampPolicy};

pub(crate) use rules::cooldown_remaining;

use serde::{Deserialize, Serialize};

use super::domain::{CategoryScore, OrganizationConfig};

/// One-shot rubric replacements applied to a single bulk update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOverrides {
    #[serde(default)]
    pub weights: Option<Vec<u32>>,
    #[serde(default)]
    pub level_groups: Option<Vec<Vec<i64>>>,
}

/// Derived fields produced for a score vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub aggregate: i64,
    pub level: i64,
    /// Level of every breakpoint set, in configuration order.
    pub set_levels: Vec<i64>,
    /// Aggregate each set resolved: its category subgroup, or the overall aggregate.
    pub set_aggregates: Vec<i64>,
    pub included_categories: usize,
}

/// Stateless evaluator that applies an organization's rubric to a score vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    level_set: LevelSetPolicy,
}

impl Aggregator {
    pub fn new(level_set: LevelSetPolicy) -> Self {
        Self { level_set }
    }

    pub fn evaluate(&self, org: &OrganizationConfig, scores: &[CategoryScore]) -> Evaluation {
        self.evaluate_with(org, scores, &ScoreOverrides::default())
    }

    /// Evaluate with `overrides` standing in for the stored weights and level groups.
    ///
    /// Overrides are expected to have been validated against `org` already.
    pub fn evaluate_with(
        &self,
        org: &OrganizationConfig,
        scores: &[CategoryScore],
        overrides: &ScoreOverrides,
    ) -> Evaluation {
        let weights = overrides
            .weights
            .as_deref()
            .unwrap_or(org.category_weights.as_slice());
        let level_groups = overrides
            .level_groups
            .as_deref()
            .unwrap_or(org.level_groups.as_slice());

        let aggregate = rules::weighted_aggregate(scores, weights);
        let included_categories = scores
            .iter()
            .zip(weights)
            .filter(|(score, weight)| score.is_set() && **weight > 0)
            .count();

        let (set_levels, set_aggregates): (Vec<_>, Vec<_>) = org
            .breakpoint_sets
            .iter()
            .zip(level_groups)
            .zip(org.category_ranges())
            .filter_map(|((breakpoints, levels), range)| {
                let table = LevelTable::new(breakpoints, levels)?;
                let group_aggregate = if org.category_groups.is_empty() {
                    aggregate
                } else {
                    rules::weighted_aggregate(
                        scores.get(range.clone()).unwrap_or_default(),
                        weights.get(range).unwrap_or_default(),
                    )
                };
                Some((table.resolve(group_aggregate), group_aggregate))
            })
            .unzip();

        let index = self.level_set.index();
        let level = match set_levels.get(index) {
            Some(level) => *level,
            None => {
                tracing::warn!(
                    index,
                    available = set_levels.len(),
                    "selected level set missing; using the primary set"
                );
                set_levels.first().copied().unwrap_or_default()
            }
        };

        tracing::debug!(aggregate, level, included_categories, "evaluated score vector");

        Evaluation {
            aggregate,
            level,
            set_levels,
            set_aggregates,
            included_categories,
        }
    }
}
