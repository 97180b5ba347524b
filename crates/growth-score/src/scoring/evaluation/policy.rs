use serde::{Deserialize, Serialize};

/// How caller-supplied timestamps relate to the engine clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    /// Supplied timestamps are taken as-is, back-dating included.
    #[default]
    Authoritative,
    /// Supplied timestamps are recorded in logs only; the clock decides.
    Advisory,
}

impl TimestampPolicy {
    pub fn resolve(self, supplied: Option<i64>, now: i64) -> i64 {
        match (self, supplied) {
            (TimestampPolicy::Authoritative, Some(timestamp)) => timestamp,
            (TimestampPolicy::Advisory, Some(timestamp)) => {
                if timestamp != now {
                    tracing::debug!(supplied = timestamp, now, "ignoring advisory timestamp");
                }
                now
            }
            (_, None) => now,
        }
    }
}

/// Which breakpoint set determines a record's headline level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSetPolicy {
    #[default]
    Primary,
    Indexed(usize),
}

impl LevelSetPolicy {
    pub const fn index(self) -> usize {
        match self {
            LevelSetPolicy::Primary => 0,
            LevelSetPolicy::Indexed(index) => index,
        }
    }
}

/// Policy dials shared by the validator, the aggregator, and the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub timestamps: TimestampPolicy,
    pub level_set: LevelSetPolicy,
}
