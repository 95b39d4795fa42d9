//! Ownership checks before mutation
//!
//! Strict policy only: the resolved caller must equal the recorded owner
//! character for character. No format-only fallback exists.

use crate::identity::{IdentityResolver, Principal};
use crate::{Error, Result};

/// Enforces caller == owner
#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    resolver: IdentityResolver,
}

impl AuthorizationGuard {
    /// Create new guard around a resolver
    pub fn new(resolver: IdentityResolver) -> Self {
        Self { resolver }
    }

    /// Resolver used by this guard
    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Resolve the caller, failing with `MalformedIdentity` if unparseable
    pub fn caller(&self, caller_token: &str) -> Result<Principal> {
        self.resolver.resolve(caller_token)
    }

    /// Fail with `Unauthorized` unless the caller is `expected_owner`
    pub fn require_owner(&self, caller_token: &str, expected_owner: &str) -> Result<Principal> {
        let caller = self.caller(caller_token)?;

        if caller.as_str() != expected_owner {
            tracing::warn!(
                caller = %caller,
                required = expected_owner,
                "Authorization denied"
            );
            return Err(Error::Unauthorized {
                caller: caller.to_string(),
                required: expected_owner.to_string(),
            });
        }

        Ok(caller)
    }
}
