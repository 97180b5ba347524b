use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use super::authority::{AuthorityGate, Unauthorized};
use super::clock::{Clock, SystemClock};
use super::domain::{
    organization_uri, BulkScoreUpdate, CategoryScore, Identity, OrganizationConfig,
    OrganizationDraft, PublishedScore, Registration, ScoreRecord, ScoreStatus, ScoreSubmission,
    StorageKey,
};
use super::evaluation::{cooldown_remaining, Aggregator, ScoringPolicy};
use super::keys::{organization_key, record_key};
use super::repository::{
    CredentialError, CredentialService, RepositoryError, ScoreRepository, TokenMetadata,
    CREDENTIAL_SYMBOL, ORGANIZATION_SYMBOL,
};
use super::validation::{ConfigViolation, RubricValidator};
use crate::config::ScoringSettings;

/// Orchestrates organizations, registrations, and the score state machine.
///
/// Every mutating operation holds the engine's write lock from its first read to its final
/// write. Collaborator calls happen before the write, so a rejected operation persists nothing.
/// A failed score write after a send restores the credential's previous metadata; a failed write
/// after a mint or collection add leaves the token in place.
pub struct ScoreEngine<R, C> {
    repository: Arc<R>,
    credentials: Arc<C>,
    clock: Arc<dyn Clock>,
    namespace: String,
    policy: ScoringPolicy,
    validator: RubricValidator,
    aggregator: Aggregator,
    write_lock: Mutex<()>,
}

impl<R, C> ScoreEngine<R, C>
where
    R: ScoreRepository + 'static,
    C: CredentialService + 'static,
{
    pub fn new(repository: Arc<R>, credentials: Arc<C>, settings: ScoringSettings) -> Self {
        Self::with_clock(repository, credentials, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<R>,
        credentials: Arc<C>,
        settings: ScoringSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ScoringSettings { namespace, policy } = settings;
        Self {
            repository,
            credentials,
            clock,
            namespace,
            validator: RubricValidator::new(policy.level_set),
            aggregator: Aggregator::new(policy.level_set),
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    pub fn organization_key(&self, mint: &Identity, authority: &Identity) -> StorageKey {
        organization_key(&self.namespace, mint, authority)
    }

    pub fn record_key(&self, organization: &StorageKey, applicant: &Identity) -> StorageKey {
        record_key(&self.namespace, organization, applicant)
    }

    /// Validate a rubric, mint the organization identity token, and persist the rubric.
    pub fn create_organization(
        &self,
        caller: &Identity,
        draft: OrganizationDraft,
    ) -> Result<OrganizationConfig, ScoreError> {
        let _guard = self.write_guard();

        if let Err(violation) = self.validator.validate(&draft) {
            warn!(%caller, %violation, "rejected organization rubric");
            return Err(violation.into());
        }

        let key = self.organization_key(&draft.mint, caller);
        if self.repository.organization(&key)?.is_some() {
            return Err(ScoreError::OrganizationExists { key });
        }

        let token = self.credentials.mint(
            &Identity::new(key.as_str()),
            TokenMetadata {
                name: format!("{} Organization", draft.name),
                symbol: ORGANIZATION_SYMBOL.to_string(),
                uri: organization_uri(&draft.public_uri),
                collection: None,
            },
        )?;

        let OrganizationDraft {
            name,
            mint,
            category_count,
            category_weights,
            breakpoint_sets,
            level_groups,
            category_groups,
            public_uri,
            cooldown_seconds,
            min_scored_categories,
        } = draft;

        let organization = OrganizationConfig {
            key: key.clone(),
            name,
            mint,
            token,
            authority: caller.clone(),
            category_count,
            category_weights,
            breakpoint_sets,
            level_groups,
            category_groups,
            public_uri,
            cooldown_seconds,
            min_scored_categories,
        };

        let stored = match self.repository.insert_organization(organization) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Err(ScoreError::OrganizationExists { key }),
            Err(other) => return Err(other.into()),
        };

        info!(
            organization = %stored.key,
            authority = %stored.authority,
            categories = stored.category_count,
            "organization created"
        );
        Ok(stored)
    }

    /// Open a score record for the applicant and mint their credential.
    pub fn register(
        &self,
        caller: &Identity,
        organization: &StorageKey,
        registration: Registration,
    ) -> Result<ScoreRecord, ScoreError> {
        let _guard = self.write_guard();
        let org = self.authorized_organization(caller, organization)?;

        let Registration {
            applicant,
            name,
            flags,
            timestamp,
        } = registration;

        let key = self.record_key(&org.key, &applicant);
        if self.repository.record(&key)?.is_some() {
            return Err(ScoreError::AlreadyRegistered { applicant });
        }
        let last_update = self.submission_time(Some(timestamp))?;

        let raw_scores = vec![CategoryScore::Unset; org.category_count];
        let evaluation = self.aggregator.evaluate(&org, &raw_scores);

        let credential = self.credentials.mint(
            &applicant,
            TokenMetadata {
                name: format!("{} - {}", org.name, name),
                symbol: CREDENTIAL_SYMBOL.to_string(),
                uri: org.metadata_uri(&evaluation.set_levels),
                collection: Some(org.token.clone()),
            },
        )?;

        let record = ScoreRecord {
            key,
            organization: org.key.clone(),
            applicant: applicant.clone(),
            name,
            flags,
            credential,
            raw_scores,
            last_update,
            aggregate: evaluation.aggregate,
            level: evaluation.level,
            set_levels: evaluation.set_levels,
            set_aggregates: evaluation.set_aggregates,
            status: ScoreStatus::Registered,
            verified: false,
            published: None,
            sends: 0,
        };

        let stored = match self.repository.insert_record(record) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                return Err(ScoreError::AlreadyRegistered { applicant });
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            organization = %stored.organization,
            applicant = %stored.applicant,
            last_update = stored.last_update,
            "applicant registered"
        );
        Ok(stored)
    }

    /// Add the applicant's credential to the organization collection.
    pub fn verify(
        &self,
        caller: &Identity,
        organization: &StorageKey,
        applicant: &Identity,
    ) -> Result<ScoreRecord, ScoreError> {
        let _guard = self.write_guard();
        let org = self.authorized_organization(caller, organization)?;
        let mut record = self.existing_record(&org, applicant)?;

        if record.verified {
            return Err(ScoreError::InvalidState {
                operation: "verify",
                status: record.status,
            });
        }

        self.credentials
            .add_to_collection(&record.credential, &org.token)?;

        record.verified = true;
        if record.status == ScoreStatus::Registered {
            record.status = ScoreStatus::Verified;
        }
        self.repository.update_record(record.clone())?;

        info!(
            organization = %org.key,
            applicant = %record.applicant,
            status = %record.status,
            "credential verified"
        );
        Ok(record)
    }

    /// Incremental path: overwrite the concrete categories once the cooldown has elapsed.
    pub fn receive_score(
        &self,
        caller: &Identity,
        organization: &StorageKey,
        applicant: &Identity,
        submission: ScoreSubmission,
    ) -> Result<ScoreRecord, ScoreError> {
        let _guard = self.write_guard();
        let org = self.authorized_organization(caller, organization)?;
        let mut record = self.existing_record(&org, applicant)?;
        check_shape(&org, &submission.scores)?;

        let now = self.submission_time(submission.timestamp)?;
        self.enforce_cooldown(&org, &record, now)?;

        let mut received = 0;
        for (slot, incoming) in record.raw_scores.iter_mut().zip(&submission.scores) {
            if incoming.is_set() {
                *slot = *incoming;
                received += 1;
            }
        }
        record.last_update = now;

        let evaluation = self.aggregator.evaluate(&org, &record.raw_scores);
        record.apply(&evaluation);
        if received > 0 {
            record.status = ScoreStatus::Scoring;
        }

        self.repository.update_record(record.clone())?;
        info!(
            organization = %org.key,
            applicant = %record.applicant,
            received,
            aggregate = record.aggregate,
            level = record.level,
            "scores received"
        );
        Ok(record)
    }

    /// Administrative path: replace the whole score vector, optionally bypassing the cooldown.
    ///
    /// A forced update takes its timestamp as given, even one ahead of the clock.
    pub fn update_scores(
        &self,
        caller: &Identity,
        organization: &StorageKey,
        applicant: &Identity,
        update: BulkScoreUpdate,
    ) -> Result<ScoreRecord, ScoreError> {
        let _guard = self.write_guard();
        let org = self.authorized_organization(caller, organization)?;
        let mut record = self.existing_record(&org, applicant)?;
        check_shape(&org, &update.scores)?;
        self.validator
            .validate_overrides(&org, &update.overrides)?;

        let now = if update.force {
            info!(
                organization = %org.key,
                applicant = %record.applicant,
                "forced score update bypasses cooldown"
            );
            self.policy
                .timestamps
                .resolve(Some(update.timestamp), self.clock.now())
        } else {
            let now = self.submission_time(Some(update.timestamp))?;
            self.enforce_cooldown(&org, &record, now)?;
            now
        };

        record.raw_scores = update.scores;
        record.last_update = now;

        let evaluation = self
            .aggregator
            .evaluate_with(&org, &record.raw_scores, &update.overrides);
        record.apply(&evaluation);
        record.status = if record.scored_categories() > 0 {
            ScoreStatus::Scoring
        } else {
            record.unscored_status()
        };

        self.repository.update_record(record.clone())?;
        info!(
            organization = %org.key,
            applicant = %record.applicant,
            aggregate = record.aggregate,
            level = record.level,
            forced = update.force,
            "scores replaced"
        );
        Ok(record)
    }

    /// Finalize: publish the current level to the credential and mark the record sent.
    pub fn send_score(
        &self,
        caller: &Identity,
        organization: &StorageKey,
        applicant: &Identity,
    ) -> Result<ScoreRecord, ScoreError> {
        let _guard = self.write_guard();
        let org = self.authorized_organization(caller, organization)?;
        let mut record = self.existing_record(&org, applicant)?;

        if record.status == ScoreStatus::Sent {
            return Err(ScoreError::AlreadySent);
        }

        let scored = record.scored_categories();
        if scored == 0 {
            return Err(ScoreError::EmptyScore);
        }
        if scored < org.min_scored_categories {
            return Err(ScoreError::InsufficientScores {
                scored,
                required: org.min_scored_categories,
            });
        }
        if record.status != ScoreStatus::Scoring {
            return Err(ScoreError::InvalidState {
                operation: "send_score",
                status: record.status,
            });
        }
        if !record.verified {
            return Err(ScoreError::NotVerified {
                applicant: record.applicant,
            });
        }

        let previous_uri = match &record.published {
            Some(published) => published.uri.clone(),
            None => {
                let unscored = vec![CategoryScore::Unset; org.category_count];
                org.metadata_uri(&self.aggregator.evaluate(&org, &unscored).set_levels)
            }
        };
        let uri = org.metadata_uri(&record.set_levels);
        self.credentials.set_metadata(&record.credential, &uri)?;

        record.published = Some(PublishedScore {
            aggregate: record.aggregate,
            level: record.level,
            uri,
            published_at: self.clock.now(),
        });
        record.sends += 1;
        record.status = ScoreStatus::Sent;

        if let Err(err) = self.repository.update_record(record.clone()) {
            warn!(
                organization = %org.key,
                applicant = %record.applicant,
                error = %err,
                "score write failed; restoring credential metadata"
            );
            if let Err(restore) = self
                .credentials
                .set_metadata(&record.credential, &previous_uri)
            {
                warn!(
                    credential = %record.credential,
                    uri = %previous_uri,
                    error = %restore,
                    "credential metadata not restored"
                );
            }
            return Err(err.into());
        }
        info!(
            organization = %org.key,
            applicant = %record.applicant,
            level = record.level,
            sends = record.sends,
            "score sent"
        );
        Ok(record)
    }

    pub fn organization(&self, key: &StorageKey) -> Result<OrganizationConfig, ScoreError> {
        self.repository
            .organization(key)?
            .ok_or_else(|| ScoreError::OrganizationNotFound { key: key.clone() })
    }

    pub fn record(
        &self,
        organization: &StorageKey,
        applicant: &Identity,
    ) -> Result<ScoreRecord, ScoreError> {
        let org = self.organization(organization)?;
        self.existing_record(&org, applicant)
    }

    pub fn records(&self, organization: &StorageKey) -> Result<Vec<ScoreRecord>, ScoreError> {
        let org = self.organization(organization)?;
        Ok(self.repository.records_for(&org.key)?)
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        // the guarded unit carries no data, so a poisoned lock is still usable
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn authorized_organization(
        &self,
        caller: &Identity,
        organization: &StorageKey,
    ) -> Result<OrganizationConfig, ScoreError> {
        let org = self.organization(organization)?;
        AuthorityGate::check(&org, caller)?;
        Ok(org)
    }

    fn existing_record(
        &self,
        org: &OrganizationConfig,
        applicant: &Identity,
    ) -> Result<ScoreRecord, ScoreError> {
        let key = self.record_key(&org.key, applicant);
        self.repository
            .record(&key)?
            .ok_or_else(|| ScoreError::RecordNotFound {
                applicant: applicant.clone(),
            })
    }

    /// Resolve a caller timestamp; an authoritative one may not run ahead of the clock.
    fn submission_time(&self, supplied: Option<i64>) -> Result<i64, ScoreError> {
        let now = self.clock.now();
        let resolved = self.policy.timestamps.resolve(supplied, now);
        if resolved > now {
            warn!(timestamp = resolved, now, "rejected forward-dated timestamp");
            return Err(ScoreError::FutureTimestamp {
                timestamp: resolved,
                now,
            });
        }
        Ok(resolved)
    }

    fn enforce_cooldown(
        &self,
        org: &OrganizationConfig,
        record: &ScoreRecord,
        now: i64,
    ) -> Result<(), ScoreError> {
        match cooldown_remaining(record.last_update, now, org.cooldown_seconds) {
            None => Ok(()),
            Some(remaining_seconds) => {
                warn!(
                    organization = %org.key,
                    applicant = %record.applicant,
                    last_update = record.last_update,
                    now,
                    remaining_seconds,
                    "score update rejected during cooldown"
                );
                Err(ScoreError::CooldownActive { remaining_seconds })
            }
        }
    }
}

fn check_shape(org: &OrganizationConfig, scores: &[CategoryScore]) -> Result<(), ScoreError> {
    if scores.len() != org.category_count {
        return Err(ScoreError::ScoreShape {
            expected: org.category_count,
            found: scores.len(),
        });
    }
    Ok(())
}

/// Error raised by the scoring engine. Any error leaves stored state untouched.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("invalid organization config: {0}")]
    InvalidConfig(#[from] ConfigViolation),
    #[error("{caller} is not the organization authority")]
    Unauthorized { caller: Identity },
    #[error("organization {key} already exists")]
    OrganizationExists { key: StorageKey },
    #[error("organization {key} not found")]
    OrganizationNotFound { key: StorageKey },
    #[error("applicant {applicant} is already registered")]
    AlreadyRegistered { applicant: Identity },
    #[error("no score record for applicant {applicant}")]
    RecordNotFound { applicant: Identity },
    #[error("{operation} is not allowed while the record is {status}")]
    InvalidState {
        operation: &'static str,
        status: ScoreStatus,
    },
    #[error("expected {expected} category values, found {found}")]
    ScoreShape { expected: usize, found: usize },
    #[error("timestamp {timestamp} is ahead of the engine clock ({now})")]
    FutureTimestamp { timestamp: i64, now: i64 },
    #[error("cooldown active: {remaining_seconds}s remaining")]
    CooldownActive { remaining_seconds: i64 },
    #[error("no category has been scored")]
    EmptyScore,
    #[error("{scored} categories scored, at least {required} required before sending")]
    InsufficientScores { scored: usize, required: usize },
    #[error("credential of {applicant} is not verified in the organization collection")]
    NotVerified { applicant: Identity },
    #[error("score already sent; submit new scores before sending again")]
    AlreadySent,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl From<Unauthorized> for ScoreError {
    fn from(value: Unauthorized) -> Self {
        Self::Unauthorized {
            caller: value.caller,
        }
    }
}
