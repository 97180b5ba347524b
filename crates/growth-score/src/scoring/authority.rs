use super::domain::{Identity, OrganizationConfig};

/// True when `caller` is the organization's registered authority.
pub fn is_authorized(config: &OrganizationConfig, caller: &Identity) -> bool {
    config.authority == *caller
}

/// Capability check run at the top of every mutating operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorityGate;

impl AuthorityGate {
    pub fn check(config: &OrganizationConfig, caller: &Identity) -> Result<(), Unauthorized> {
        if is_authorized(config, caller) {
            Ok(())
        } else {
            tracing::warn!(
                organization = %config.key,
                %caller,
                "rejected signer that is not the organization authority"
            );
            Err(Unauthorized {
                caller: caller.clone(),
            })
        }
    }
}

/// Signer mismatch raised by [`AuthorityGate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unauthorized {
    pub caller: Identity,
}
