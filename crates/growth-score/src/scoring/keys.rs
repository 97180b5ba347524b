//! Storage address derivation.
//!
//! Keys are a pure function of their seeds so clients can compute an organization or record
//! address without a round trip to the store.

use sha2::{Digest, Sha256};

use super::domain::{Identity, StorageKey};

pub const ORGANIZATION_SEED: &str = "org";
pub const SCORE_SEED: &str = "score";

/// Hash `namespace` and `seeds` into a hex storage key.
///
/// Every component is length-prefixed, so `("ab", "c")` and `("a", "bc")` never collide.
pub fn derive_key(namespace: &str, seeds: &[&[u8]]) -> StorageKey {
    let mut hasher = Sha256::new();
    absorb(&mut hasher, namespace.as_bytes());
    for seed in seeds {
        absorb(&mut hasher, seed);
    }
    StorageKey(hex::encode(hasher.finalize()))
}

fn absorb(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Address of an organization created by `authority` with the given mint identity.
pub fn organization_key(namespace: &str, mint: &Identity, authority: &Identity) -> StorageKey {
    derive_key(
        namespace,
        &[
            ORGANIZATION_SEED.as_bytes(),
            mint.as_str().as_bytes(),
            authority.as_str().as_bytes(),
        ],
    )
}

/// Address of the score record for `applicant` within `organization`.
pub fn record_key(namespace: &str, organization: &StorageKey, applicant: &Identity) -> StorageKey {
    derive_key(
        namespace,
        &[
            SCORE_SEED.as_bytes(),
            organization.as_str().as_bytes(),
            applicant.as_str().as_bytes(),
        ],
    )
}
