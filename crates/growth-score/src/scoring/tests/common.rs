use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::ScoringSettings;
use crate::scoring::clock::Clock;
use crate::scoring::domain::{
    CategoryScore, Identity, OrganizationConfig, OrganizationDraft, Registration, ScoreRecord,
    StorageKey, TokenId,
};
use crate::scoring::repository::{
    CredentialError, CredentialService, RepositoryError, ScoreRepository, TokenMetadata,
};
use crate::scoring::{scoring_router, ScoreEngine, ScoringPolicy};

pub(super) const START: i64 = 1_700_000_000;
pub(super) const COOLDOWN: u64 = 5;

pub(super) fn authority() -> Identity {
    Identity::new("designity-authority")
}

pub(super) fn applicant() -> Identity {
    Identity::new("applicant-7")
}

pub(super) fn draft() -> OrganizationDraft {
    OrganizationDraft {
        name: "Designity".to_string(),
        mint: Identity::new("designity-mint"),
        category_count: 10,
        category_weights: vec![4, 1, 1, 1, 1, 2, 1, 1, 1, 1],
        breakpoint_sets: vec![vec![25, 50, 75], vec![25, 75]],
        level_groups: vec![vec![0, 1, 2, 3], vec![0, 1, 2]],
        category_groups: Vec::new(),
        public_uri: "https://public.designity.software".to_string(),
        cooldown_seconds: COOLDOWN,
        min_scored_categories: 1,
    }
}

pub(super) fn registration() -> Registration {
    Registration {
        applicant: applicant(),
        name: "Ada".to_string(),
        flags: vec![1, 0],
        timestamp: START,
    }
}

pub(super) fn uniform(value: i64) -> Vec<CategoryScore> {
    vec![CategoryScore::Set(value); 10]
}

pub(super) fn vector(values: [Option<i64>; 10]) -> Vec<CategoryScore> {
    values.into_iter().map(CategoryScore::from).collect()
}

pub(super) fn mixed() -> Vec<CategoryScore> {
    [40, 50, 50, 55, 55, 59, 50, 50, 55, 50]
        .into_iter()
        .map(CategoryScore::Set)
        .collect()
}

pub(super) fn leading_hundreds() -> Vec<CategoryScore> {
    vector([
        Some(100),
        Some(100),
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
    ])
}

pub(super) type TestEngine = ScoreEngine<MemoryRepository, RecordingCredentials>;

pub(super) struct Harness {
    pub(super) engine: TestEngine,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) credentials: Arc<RecordingCredentials>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn harness() -> Harness {
    harness_with(ScoringPolicy::default())
}

pub(super) fn harness_with(policy: ScoringPolicy) -> Harness {
    let repository = Arc::new(MemoryRepository::default());
    let credentials = Arc::new(RecordingCredentials::default());
    let clock = Arc::new(ManualClock::at(START));
    let engine = ScoreEngine::with_clock(
        repository.clone(),
        credentials.clone(),
        ScoringSettings {
            namespace: "growth".to_string(),
            policy,
        },
        clock.clone(),
    );
    Harness {
        engine,
        repository,
        credentials,
        clock,
    }
}

impl Harness {
    pub(super) fn organization(&self) -> OrganizationConfig {
        self.engine
            .create_organization(&authority(), draft())
            .expect("organization is created")
    }

    /// Organization plus a registered applicant, with the clock moved past the cooldown.
    pub(super) fn registered(&self) -> OrganizationConfig {
        let org = self.organization();
        self.engine
            .register(&authority(), &org.key, registration())
            .expect("applicant registers");
        self.clock.advance(COOLDOWN as i64);
        org
    }

    /// [`Harness::registered`] with the credential already in the collection.
    pub(super) fn verified(&self) -> OrganizationConfig {
        let org = self.registered();
        self.engine
            .verify(&authority(), &org.key, &applicant())
            .expect("credential verifies");
        org
    }

    pub(super) fn record(&self, org: &OrganizationConfig) -> ScoreRecord {
        self.engine
            .record(&org.key, &applicant())
            .expect("record exists")
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    organizations: Mutex<BTreeMap<StorageKey, OrganizationConfig>>,
    records: Mutex<BTreeMap<StorageKey, ScoreRecord>>,
    rejecting_updates: AtomicBool,
}

impl MemoryRepository {
    pub(super) fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub(super) fn reject_updates(&self, rejecting: bool) {
        self.rejecting_updates.store(rejecting, Ordering::SeqCst);
    }
}

impl ScoreRepository for MemoryRepository {
    fn insert_organization(
        &self,
        organization: OrganizationConfig,
    ) -> Result<OrganizationConfig, RepositoryError> {
        let mut guard = self.organizations.lock().unwrap();
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
        Ok(self.organizations.lock().unwrap().get(key).cloned())
    }

    fn insert_record(&self, record: ScoreRecord) -> Result<ScoreRecord, RepositoryError> {
        let mut guard = self.records.lock().unwrap();
        if guard.contains_key(&record.key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.key.clone(), record.clone());
        Ok(record)
    }

    fn update_record(&self, record: ScoreRecord) -> Result<(), RepositoryError> {
        if self.rejecting_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write timeout".into()));
        }
        let mut guard = self.records.lock().unwrap();
        match guard.get_mut(&record.key) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn record(&self, key: &StorageKey) -> Result<Option<ScoreRecord>, RepositoryError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    fn records_for(&self, organization: &StorageKey) -> Result<Vec<ScoreRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|record| &record.organization == organization)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableRepository;

impl ScoreRepository for UnavailableRepository {
    fn insert_organization(
        &self,
        _organization: OrganizationConfig,
    ) -> Result<OrganizationConfig, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn organization(
        &self,
        _key: &StorageKey,
    ) -> Result<Option<OrganizationConfig>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn insert_record(&self, _record: ScoreRecord) -> Result<ScoreRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn update_record(&self, _record: ScoreRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn record(&self, _key: &StorageKey) -> Result<Option<ScoreRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn records_for(&self, _organization: &StorageKey) -> Result<Vec<ScoreRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CredentialEvent {
    Minted {
        owner: Identity,
        metadata: TokenMetadata,
        token: TokenId,
    },
    MetadataSet {
        token: TokenId,
        uri: String,
    },
    Collected {
        token: TokenId,
        collection: TokenId,
    },
}

#[derive(Default)]
pub(super) struct RecordingCredentials {
    events: Mutex<Vec<CredentialEvent>>,
    next: AtomicU64,
    failing: AtomicBool,
}

impl RecordingCredentials {
    pub(super) fn events(&self) -> Vec<CredentialEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(super) fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(super) fn metadata_updates(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                CredentialEvent::MetadataSet { uri, .. } => Some(uri),
                _ => None,
            })
            .collect()
    }

    fn check(&self) -> Result<(), CredentialError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CredentialError::Unavailable("ledger timeout".into()))
        } else {
            Ok(())
        }
    }
}

impl CredentialService for RecordingCredentials {
    fn mint(&self, owner: &Identity, metadata: TokenMetadata) -> Result<TokenId, CredentialError> {
        self.check()?;
        let token = TokenId(format!(
            "token-{}",
            self.next.fetch_add(1, Ordering::SeqCst)
        ));
        self.events.lock().unwrap().push(CredentialEvent::Minted {
            owner: owner.clone(),
            metadata,
            token: token.clone(),
        });
        Ok(token)
    }

    fn set_metadata(&self, token: &TokenId, uri: &str) -> Result<(), CredentialError> {
        self.check()?;
        self.events.lock().unwrap().push(CredentialEvent::MetadataSet {
            token: token.clone(),
            uri: uri.to_string(),
        });
        Ok(())
    }

    fn add_to_collection(
        &self,
        token: &TokenId,
        collection: &TokenId,
    ) -> Result<(), CredentialError> {
        self.check()?;
        self.events.lock().unwrap().push(CredentialEvent::Collected {
            token: token.clone(),
            collection: collection.clone(),
        });
        Ok(())
    }
}

pub(super) struct ManualClock(AtomicI64);

impl ManualClock {
    pub(super) fn at(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub(super) fn advance(&self, seconds: i64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub(super) fn router_for(engine: TestEngine) -> axum::Router {
    scoring_router(Arc::new(engine))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&body).expect("valid json")
}
