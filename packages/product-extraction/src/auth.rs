//! Admin gate.
//!
//! The surrounding store owns identity. This module only consumes it through
//! [`IdentityResolver`] and fails closed: anything short of a positive admin
//! confirmation refuses the request before a single network call is made.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// A caller as resolved by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}

/// A principal confirmed to hold the admin capability.
///
/// Only [`authorize`] constructs this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrincipal(Principal);

impl AdminPrincipal {
    pub fn subject(&self) -> &str {
        &self.0.subject
    }

    #[cfg(test)]
    pub(crate) fn for_tests(subject: &str) -> Self {
        Self(Principal::new(subject).with_role("admin"))
    }
}

/// Identity collaborator.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a raw credential into a principal, or `None` if it is invalid.
    async fn resolve_principal(&self, credential: &str) -> Option<Principal>;

    /// Whether the principal holds the admin capability.
    async fn has_admin_role(&self, principal: &Principal) -> bool;
}

/// Run both identity checks and return proof of admin status.
///
/// The credential may carry a `Bearer ` prefix.
pub async fn authorize(
    resolver: &dyn IdentityResolver,
    credential: Option<&str>,
) -> Result<AdminPrincipal> {
    let credential = credential
        .map(|c| c.trim())
        .map(|c| c.strip_prefix("Bearer ").unwrap_or(c).trim())
        .filter(|c| !c.is_empty())
        .ok_or(PipelineError::Unauthorized)?;

    let principal = resolver
        .resolve_principal(credential)
        .await
        .ok_or_else(|| {
            debug!("credential did not resolve to a principal");
            PipelineError::Unauthorized
        })?;

    if !resolver.has_admin_role(&principal).await {
        warn!(subject = %principal.subject, "non-admin caller refused");
        return Err(PipelineError::Forbidden);
    }

    Ok(AdminPrincipal(principal))
}
