//! Organization rubrics, applicant score records, and the score lifecycle.
//!
//! An organization authority publishes a rubric (category weights, breakpoint sets, and the
//! levels they map to), registers applicants, feeds category scores in, and finally sends the
//! resulting level to the applicant's credential. Collaborators for persistence and credential
//! tokens sit behind the traits in [`repository`].

pub mod authority;
pub mod clock;
pub mod domain;
pub mod evaluation;
pub mod keys;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use authority::{AuthorityGate, Unauthorized};
pub use clock::{Clock, SystemClock};
pub use domain::{
    BulkScoreUpdate, CategoryScore, Identity, OrganizationConfig, OrganizationDraft,
    PublishedScore, Registration, ScoreRecord, ScoreStatus, ScoreStatusView, ScoreSubmission,
    StorageKey, TokenId,
};
pub use evaluation::{
    Aggregator, Evaluation, LevelSetPolicy, LevelTable, ScoreOverrides, ScoringPolicy,
    TimestampPolicy,
};
pub use repository::{
    CredentialError, CredentialService, RepositoryError, ScoreRepository, TokenMetadata,
};
pub use router::{scoring_router, status_for, SIGNER_HEADER};
pub use service::{ScoreEngine, ScoreError};
pub use validation::{ConfigViolation, RubricValidator};
