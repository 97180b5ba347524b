use serde::{Deserialize, Serialize};

use super::domain::{Identity, OrganizationConfig, ScoreRecord, StorageKey, TokenId};

/// Keyed persistence for organizations and score records.
pub trait ScoreRepository: Send + Sync {
    fn insert_organization(
        &self,
        organization: OrganizationConfig,
    ) -> Result<OrganizationConfig, RepositoryError>;
    fn organization(&self, key: &StorageKey)
        -> Result<Option<OrganizationConfig>, RepositoryError>;
    fn insert_record(&self, record: ScoreRecord) -> Result<ScoreRecord, RepositoryError>;
    fn update_record(&self, record: ScoreRecord) -> Result<(), RepositoryError>;
    fn record(&self, key: &StorageKey) -> Result<Option<ScoreRecord>, RepositoryError>;
    fn records_for(&self, organization: &StorageKey) -> Result<Vec<ScoreRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub const ORGANIZATION_SYMBOL: &str = "GRWTH";
pub const CREDENTIAL_SYMBOL: &str = "SCORE";

/// Display metadata attached to a minted credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    /// Collection the token claims membership of; unverified until `add_to_collection`.
    pub collection: Option<TokenId>,
}

/// Outbound credential hooks (token minting, metadata, and collection membership).
pub trait CredentialService: Send + Sync {
    fn mint(&self, owner: &Identity, metadata: TokenMetadata) -> Result<TokenId, CredentialError>;
    fn set_metadata(&self, token: &TokenId, uri: &str) -> Result<(), CredentialError>;
    fn add_to_collection(&self, token: &TokenId, collection: &TokenId)
        -> Result<(), CredentialError>;
}

/// Credential collaborator failure.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("unknown credential token {0}")]
    UnknownToken(TokenId),
    #[error("credential service unavailable: {0}")]
    Unavailable(String),
}
