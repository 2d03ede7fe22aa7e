use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;

use crate::domain::ports::TokenContext;

/// Extracts the already-validated initiator from request headers.
///
/// Full token validation is the identity service's job (§1: external
/// collaborator) — by the time a request reaches this crate, an
/// upstream auth layer is expected to have attached these headers.
/// This extractor only assembles the [`TokenContext`] the rest of the
/// pipeline consumes; it never calls out to the identity service
/// itself.
pub struct AuthenticatedUser(pub TokenContext);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let user_id = header("x-auth-user-id").ok_or((StatusCode::UNAUTHORIZED, "missing x-auth-user-id"))?;
        let domain_id = header("x-auth-domain-id").ok_or((StatusCode::UNAUTHORIZED, "missing x-auth-domain-id"))?;

        Ok(AuthenticatedUser(TokenContext {
            user_id,
            user_name: header("x-auth-user-name").unwrap_or_default(),
            domain_id,
            domain_name: header("x-auth-domain-name").unwrap_or_default(),
            project_id: header("x-auth-project-id"),
            is_privileged: header("x-auth-privileged").as_deref() == Some("true"),
        }))
    }
}
