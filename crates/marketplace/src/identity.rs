//! Identity collaborator port.

use common::Identity;

use crate::error::{MarketplaceError, Result};

/// Supplies the signed-in user, if any.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;
}

/// Identity provider holding a fixed identity.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    identity: Option<Identity>,
}

impl StaticIdentityProvider {
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.clone()
    }
}

/// Returns the caller's identity, failing fast when nobody is signed in or the
/// bearer token is missing.
pub(crate) fn require_identity<I: IdentityProvider + ?Sized>(provider: &I) -> Result<Identity> {
    let identity = provider
        .current_identity()
        .ok_or_else(|| MarketplaceError::Unauthenticated("no signed-in user".to_string()))?;

    if !identity.has_token() {
        return Err(MarketplaceError::Unauthenticated(
            "missing bearer token".to_string(),
        ));
    }
    Ok(identity)
}
