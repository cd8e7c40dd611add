//! Request authorization — a single seam replacing per-endpoint session
//! checks.
//!
//! Identity travels with the request as a typed [`Principal`], never read
//! from ambient state. Token issuance (login) is handled elsewhere; this
//! layer only resolves `Authorization: Bearer <token>` against
//! `users.api_token`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::api::ApiState;
use crate::db;
use crate::errors::PortalError;
use crate::models::Role;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

/// Extractor carrying the caller's identity, if any.
///
/// No `Authorization` header means a guest (`None`); a header that does not
/// resolve to a user is rejected rather than silently downgraded.
pub struct AuthContext(pub Option<Principal>);

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for AuthContext {
    type Rejection = PortalError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(AuthContext(None));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .ok_or(PortalError::Unauthenticated)?;

        let user = db::find_user_by_token(&state.pool, token)
            .await?
            .ok_or(PortalError::Unauthenticated)?;

        let role = Role::parse(&user.role).unwrap_or(Role::Donor);
        Ok(AuthContext(Some(Principal { id: user.id, role })))
    }
}
