use std::sync::Arc;

use async_trait::async_trait;
use product_extraction::{IdentityResolver, Principal};
use tracing::debug;

use super::JwtService;

const ADMIN_ROLE: &str = "admin";

/// Resolves bearer JWTs into principals.
///
/// A principal is an admin when its token carries `is_admin`, or when its
/// subject is listed in `ADMIN_IDENTIFIERS`.
#[derive(Clone)]
pub struct JwtIdentityResolver {
    jwt_service: Arc<JwtService>,
    admin_identifiers: Vec<String>,
}

impl JwtIdentityResolver {
    pub fn new(jwt_service: Arc<JwtService>, admin_identifiers: Vec<String>) -> Self {
        Self {
            jwt_service,
            admin_identifiers,
        }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve_principal(&self, credential: &str) -> Option<Principal> {
        let claims = match self.jwt_service.verify_token(credential) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Invalid token");
                return None;
            }
        };

        let principal = Principal::new(claims.sub);
        Some(if claims.is_admin {
            principal.with_role(ADMIN_ROLE)
        } else {
            principal
        })
    }

    async fn has_admin_role(&self, principal: &Principal) -> bool {
        principal.roles.iter().any(|r| r == ADMIN_ROLE)
            || is_admin_identifier(&principal.subject, &self.admin_identifiers)
    }
}

/// Check an identifier against the configured admin list.
///
/// Emails compare case-insensitively; anything else must match exactly.
pub fn is_admin_identifier(identifier: &str, admin_identifiers: &[String]) -> bool {
    admin_identifiers.iter().any(|admin_id| {
        if identifier.contains('@') && admin_id.contains('@') {
            admin_id.eq_ignore_ascii_case(identifier)
        } else {
            admin_id == identifier
        }
    })
}
