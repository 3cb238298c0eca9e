use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::error::AuthError;
use super::repo_types::User;
use crate::state::AppState;

/// The user behind the request's bearer token, resolved once per request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rejects the request before it reaches the handler unless the bearer token
/// resolves to a live user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers()).ok_or_else(|| {
        warn!("missing or malformed Authorization header");
        AuthError::InvalidToken
    })?;

    let user = state.engine.authenticate(token).await.map_err(|e| {
        warn!(error = %e, "bearer token rejected");
        e
    })?;

    req.extensions_mut().insert(AuthUser(user));
    Ok(next.run(req).await)
}
