use growth_score::scoring::{
    CredentialError, CredentialService, Identity, OrganizationConfig, RepositoryError,
    ScoreRecord, ScoreRepository, StorageKey, TokenId, TokenMetadata,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryScoreRepository {
    organizations: Arc<Mutex<HashMap<StorageKey, OrganizationConfig>>>,
    records: Arc<Mutex<HashMap<StorageKey, ScoreRecord>>>,
}

impl ScoreRepository for InMemoryScoreRepository {
    fn insert_organization(
        &self,
        organization: OrganizationConfig,
    ) -> Result<OrganizationConfig, RepositoryError> {
        let mut guard = lock(&self.organizations)?;
        if guard.contains_key(&organization.key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(organization.key.clone(), organization.clone());
        Ok(organization)
    }

    fn organization(
        &self,
        key: &StorageKey,
    ) -> Result<Option<OrganizationConfig>, RepositoryError> {
        Ok(lock(&self.organizations)?.get(key).cloned())
    }

    fn insert_record(&self, record: ScoreRecord) -> Result<ScoreRecord, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&record.key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.key.clone(), record.clone());
        Ok(record)
    }

    fn update_record(&self, record: ScoreRecord) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&record.key) {
            guard.insert(record.key.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn record(&self, key: &StorageKey) -> Result<Option<ScoreRecord>, RepositoryError> {
        Ok(lock(&self.records)?.get(key).cloned())
    }

    fn records_for(&self, organization: &StorageKey) -> Result<Vec<ScoreRecord>, RepositoryError> {
        let guard = lock(&self.records)?;
        let mut records = guard
            .values()
            .filter(|record| &record.organization == organization)
            .cloned()
            .collect::<Vec<_>>();
        records.sort_by(|left, right| left.applicant.cmp(&right.applicant));
        Ok(records)
    }
}

/// Token ledger held in process; each token keeps its latest metadata.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCredentialService {
    tokens: Arc<Mutex<HashMap<TokenId, IssuedToken>>>,
    next: Arc<AtomicU64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IssuedToken {
    pub(crate) owner: Identity,
    pub(crate) metadata: TokenMetadata,
    pub(crate) collection_verified: bool,
}

impl InMemoryCredentialService {
    pub(crate) fn token(&self, token: &TokenId) -> Option<IssuedToken> {
        self.tokens.lock().ok()?.get(token).cloned()
    }

    fn with_token<T>(
        &self,
        token: &TokenId,
        apply: impl FnOnce(&mut IssuedToken) -> T,
    ) -> Result<T, CredentialError> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|_| CredentialError::Unavailable("token ledger mutex poisoned".to_string()))?;
        guard
            .get_mut(token)
            .map(apply)
            .ok_or_else(|| CredentialError::UnknownToken(token.clone()))
    }
}

impl CredentialService for InMemoryCredentialService {
    fn mint(&self, owner: &Identity, metadata: TokenMetadata) -> Result<TokenId, CredentialError> {
        let token = TokenId(format!(
            "cred-{:06}",
            self.next.fetch_add(1, Ordering::Relaxed)
        ));
        info!(%owner, %token, symbol = %metadata.symbol, uri = %metadata.uri, "credential minted");
        let mut guard = self
            .tokens
            .lock()
            .map_err(|_| CredentialError::Unavailable("token ledger mutex poisoned".to_string()))?;
        guard.insert(
            token.clone(),
            IssuedToken {
                owner: owner.clone(),
                metadata,
                collection_verified: false,
            },
        );
        Ok(token)
    }

    fn set_metadata(&self, token: &TokenId, uri: &str) -> Result<(), CredentialError> {
        self.with_token(token, |issued| issued.metadata.uri = uri.to_string())?;
        info!(%token, uri, "credential metadata updated");
        Ok(())
    }

    fn add_to_collection(
        &self,
        token: &TokenId,
        collection: &TokenId,
    ) -> Result<(), CredentialError> {
        let member = self.with_token(token, |issued| {
            if issued.metadata.collection.as_ref() == Some(collection) {
                issued.collection_verified = true;
            }
            issued.collection_verified
        })?;
        if !member {
            return Err(CredentialError::Unavailable(format!(
                "{token} does not claim collection {collection}"
            )));
        }
        info!(%token, %collection, "credential collection verified");
        Ok(())
    }
}
