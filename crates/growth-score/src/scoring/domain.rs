use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::evaluation::{Evaluation, ScoreOverrides};

/// Ledger identity of a signer, applicant, or mint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to a credential token issued by the external credential service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic storage address, see [`super::keys::derive_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(pub String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One category slot of a score vector. Serialized as `null` or an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<i64>", into = "Option<i64>")]
pub enum CategoryScore {
    Set(i64),
    #[default]
    Unset,
}

impl CategoryScore {
    pub const fn value(self) -> Option<i64> {
        match self {
            CategoryScore::Set(value) => Some(value),
            CategoryScore::Unset => None,
        }
    }

    pub const fn is_set(self) -> bool {
        matches!(self, CategoryScore::Set(_))
    }
}

impl From<Option<i64>> for CategoryScore {
    fn from(value: Option<i64>) -> Self {
        match value {
            Some(value) => CategoryScore::Set(value),
            None => CategoryScore::Unset,
        }
    }
}

impl From<CategoryScore> for Option<i64> {
    fn from(value: CategoryScore) -> Self {
        value.value()
    }
}

/// Lifecycle of a score record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    Registered,
    Verified,
    Scoring,
    Sent,
}

impl ScoreStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreStatus::Registered => "registered",
            ScoreStatus::Verified => "verified",
            ScoreStatus::Scoring => "scoring",
            ScoreStatus::Sent => "sent",
        }
    }
}

impl fmt::Display for ScoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn default_min_scored_categories() -> usize {
    1
}

/// Rubric submitted by an authority when creating an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationDraft {
    pub name: String,
    /// Fresh identity seeding the organization key; reuse collides.
    pub mint: Identity,
    pub category_count: usize,
    pub category_weights: Vec<u32>,
    pub breakpoint_sets: Vec<Vec<i64>>,
    pub level_groups: Vec<Vec<i64>>,
    /// Exclusive end index of each category subgroup, one per breakpoint set. Empty means
    /// every set resolves the overall aggregate.
    #[serde(default)]
    pub category_groups: Vec<usize>,
    pub public_uri: String,
    pub cooldown_seconds: u64,
    #[serde(default = "default_min_scored_categories")]
    pub min_scored_categories: usize,
}

/// Persisted, immutable rubric of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub key: StorageKey,
    pub name: String,
    pub mint: Identity,
    pub token: TokenId,
    pub authority: Identity,
    pub category_count: usize,
    pub category_weights: Vec<u32>,
    pub breakpoint_sets: Vec<Vec<i64>>,
    pub level_groups: Vec<Vec<i64>>,
    #[serde(default)]
    pub category_groups: Vec<usize>,
    pub public_uri: String,
    pub cooldown_seconds: u64,
    pub min_scored_categories: usize,
}

impl OrganizationConfig {
    /// Metadata location of the organization identity token.
    pub fn organization_uri(&self) -> String {
        organization_uri(&self.public_uri)
    }

    /// Metadata location for a credential stamped with `set_levels`, e.g. `{uri}/2-1.json`.
    pub fn metadata_uri(&self, set_levels: &[i64]) -> String {
        let levels = set_levels
            .iter()
            .map(|level| level.to_string())
            .collect::<Vec<_>>()
            .join("-");
        format!("{}/{}.json", base_uri(&self.public_uri), levels)
    }

    /// Category index ranges resolved by each breakpoint set, in configuration order.
    pub fn category_ranges(&self) -> Vec<Range<usize>> {
        if self.category_groups.is_empty() {
            return vec![0..self.category_count; self.breakpoint_sets.len()];
        }
        let mut start = 0;
        self.category_groups
            .iter()
            .map(|end| {
                let range = start..*end;
                start = *end;
                range
            })
            .collect()
    }
}

pub(crate) fn organization_uri(public_uri: &str) -> String {
    format!("{}/org.json", base_uri(public_uri))
}

fn base_uri(public_uri: &str) -> &str {
    public_uri.trim_end_matches('/')
}

/// Snapshot of the last finalized score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedScore {
    pub aggregate: i64,
    pub level: i64,
    pub uri: String,
    pub published_at: i64,
}

/// Per-applicant scoring state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub key: StorageKey,
    pub organization: StorageKey,
    pub applicant: Identity,
    pub name: String,
    pub flags: Vec<u8>,
    pub credential: TokenId,
    pub raw_scores: Vec<CategoryScore>,
    pub last_update: i64,
    pub aggregate: i64,
    pub level: i64,
    pub set_levels: Vec<i64>,
    #[serde(default)]
    pub set_aggregates: Vec<i64>,
    pub status: ScoreStatus,
    pub verified: bool,
    pub published: Option<PublishedScore>,
    pub sends: u32,
}

impl ScoreRecord {
    pub fn scored_categories(&self) -> usize {
        self.raw_scores.iter().filter(|score| score.is_set()).count()
    }

    pub(crate) fn apply(&mut self, evaluation: &Evaluation) {
        self.aggregate = evaluation.aggregate;
        self.level = evaluation.level;
        self.set_levels = evaluation.set_levels.clone();
        self.set_aggregates = evaluation.set_aggregates.clone();
    }

    /// Status to fall back to when the record holds no concrete scores.
    pub(crate) fn unscored_status(&self) -> ScoreStatus {
        if self.verified {
            ScoreStatus::Verified
        } else {
            ScoreStatus::Registered
        }
    }

    pub fn status_view(&self) -> ScoreStatusView {
        ScoreStatusView {
            organization: self.organization.clone(),
            applicant: self.applicant.clone(),
            name: self.name.clone(),
            status: self.status.label(),
            verified: self.verified,
            raw_scores: self.raw_scores.clone(),
            aggregate: self.aggregate,
            level: self.level,
            last_update: self.last_update,
            published_level: self.published.as_ref().map(|published| published.level),
        }
    }
}

/// Input to `register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub applicant: Identity,
    pub name: String,
    #[serde(default)]
    pub flags: Vec<u8>,
    pub timestamp: i64,
}

/// Input to the incremental `receive_score` path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub scores: Vec<CategoryScore>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Input to the administrative `update_scores` path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkScoreUpdate {
    pub scores: Vec<CategoryScore>,
    pub timestamp: i64,
    #[serde(flatten)]
    pub overrides: ScoreOverrides,
    #[serde(default)]
    pub force: bool,
}

/// Sanitized representation of a record's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreStatusView {
    pub organization: StorageKey,
    pub applicant: Identity,
    pub name: String,
    pub status: &'static str,
    pub verified: bool,
    pub raw_scores: Vec<CategoryScore>,
    pub aggregate: i64,
    pub level: i64,
    pub last_update: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_level: Option<i64>,
}
