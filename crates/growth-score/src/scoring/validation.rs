use super::domain::{OrganizationConfig, OrganizationDraft};
use super::evaluation::{LevelSetPolicy, ScoreOverrides};

/// Reasons a rubric or a one-shot override is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigViolation {
    #[error("category count must be at least 1")]
    NoCategories,
    #[error("expected {expected} category weights, found {found}")]
    WeightCount { expected: usize, found: usize },
    #[error("category weights must not sum to zero")]
    ZeroWeightSum,
    #[error("at least one breakpoint set is required")]
    NoBreakpointSets,
    #[error("{breakpoint_sets} breakpoint set(s) configured but {level_groups} level group(s)")]
    GroupCount {
        breakpoint_sets: usize,
        level_groups: usize,
    },
    #[error("breakpoint set {index} is not strictly increasing")]
    UnorderedBreakpoints { index: usize },
    #[error("level group {index} needs {expected} level(s), found {found}")]
    LevelCount {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("{groups} category group(s) configured for {breakpoint_sets} breakpoint set(s)")]
    CategoryGroupCount {
        groups: usize,
        breakpoint_sets: usize,
    },
    #[error("category group {index} is empty or out of order")]
    UnorderedCategoryGroups { index: usize },
    #[error("category groups end at {end} but there are {category_count} categories")]
    CategoryGroupCoverage { end: usize, category_count: usize },
    #[error("level set {index} is selected but only {available} are configured")]
    MissingLevelSet { index: usize, available: usize },
    #[error("minimum of {minimum} scored categories exceeds category count {category_count}")]
    MinimumScored {
        minimum: usize,
        category_count: usize,
    },
}

/// Guard responsible for admitting rubrics and overrides into the engine.
#[derive(Debug, Clone, Default)]
pub struct RubricValidator {
    level_set: LevelSetPolicy,
}

impl RubricValidator {
    pub fn new(level_set: LevelSetPolicy) -> Self {
        Self { level_set }
    }

    /// Check every shape invariant of an organization draft.
    pub fn validate(&self, draft: &OrganizationDraft) -> Result<(), ConfigViolation> {
        if draft.category_count == 0 {
            return Err(ConfigViolation::NoCategories);
        }

        check_weights(&draft.category_weights, draft.category_count)?;

        if draft.breakpoint_sets.is_empty() {
            return Err(ConfigViolation::NoBreakpointSets);
        }

        for (index, breakpoints) in draft.breakpoint_sets.iter().enumerate() {
            if breakpoints.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(ConfigViolation::UnorderedBreakpoints { index });
            }
        }

        check_level_groups(&draft.breakpoint_sets, &draft.level_groups)?;
        check_category_groups(draft)?;

        let index = self.level_set.index();
        if index >= draft.breakpoint_sets.len() {
            return Err(ConfigViolation::MissingLevelSet {
                index,
                available: draft.breakpoint_sets.len(),
            });
        }

        if draft.min_scored_categories > draft.category_count {
            return Err(ConfigViolation::MinimumScored {
                minimum: draft.min_scored_categories,
                category_count: draft.category_count,
            });
        }

        Ok(())
    }

    /// Overrides must fit the stored rubric they temporarily replace.
    pub fn validate_overrides(
        &self,
        org: &OrganizationConfig,
        overrides: &ScoreOverrides,
    ) -> Result<(), ConfigViolation> {
        if let Some(weights) = &overrides.weights {
            check_weights(weights, org.category_count)?;
        }
        if let Some(level_groups) = &overrides.level_groups {
            check_level_groups(&org.breakpoint_sets, level_groups)?;
        }
        Ok(())
    }
}

fn check_weights(weights: &[u32], category_count: usize) -> Result<(), ConfigViolation> {
    if weights.len() != category_count {
        return Err(ConfigViolation::WeightCount {
            expected: category_count,
            found: weights.len(),
        });
    }
    if weights.iter().all(|weight| *weight == 0) {
        return Err(ConfigViolation::ZeroWeightSum);
    }
    Ok(())
}

/// Group boundaries are exclusive end indices that must partition every category.
fn check_category_groups(draft: &OrganizationDraft) -> Result<(), ConfigViolation> {
    let groups = &draft.category_groups;
    if groups.is_empty() {
        return Ok(());
    }
    if groups.len() != draft.breakpoint_sets.len() {
        return Err(ConfigViolation::CategoryGroupCount {
            groups: groups.len(),
            breakpoint_sets: draft.breakpoint_sets.len(),
        });
    }

    let mut start = 0;
    for (index, end) in groups.iter().enumerate() {
        if *end <= start {
            return Err(ConfigViolation::UnorderedCategoryGroups { index });
        }
        start = *end;
    }

    if start != draft.category_count {
        return Err(ConfigViolation::CategoryGroupCoverage {
            end: start,
            category_count: draft.category_count,
        });
    }
    Ok(())
}

fn check_level_groups(
    breakpoint_sets: &[Vec<i64>],
    level_groups: &[Vec<i64>],
) -> Result<(), ConfigViolation> {
    if breakpoint_sets.len() != level_groups.len() {
        return Err(ConfigViolation::GroupCount {
            breakpoint_sets: breakpoint_sets.len(),
            level_groups: level_groups.len(),
        });
    }

    for (index, (breakpoints, levels)) in breakpoint_sets.iter().zip(level_groups).enumerate() {
        if levels.len() != breakpoints.len() + 1 {
            return Err(ConfigViolation::LevelCount {
                index,
                expected: breakpoints.len() + 1,
                found: levels.len(),
            });
        }
    }

    Ok(())
}
