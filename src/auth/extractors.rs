use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use crate::auth::repo_types::User;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The user resolved by [`require_user`] for the current request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Accepts exactly `Bearer <token>`.
pub fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Header -> token -> claims -> persisted user. Every failure is `Unauthorized`.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> AppResult<User> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            debug!("missing Authorization header");
            AppError::Unauthorized
        })?;

    let token = bearer_token(header).ok_or_else(|| {
        debug!("invalid auth scheme");
        AppError::Unauthorized
    })?;

    let claims = state.jwt.validate(token).map_err(|e| {
        warn!(error = %e, "token rejected");
        AppError::Unauthorized
    })?;

    let user_id: i64 = claims.user_id.parse().map_err(|_| {
        warn!(user_id = %claims.user_id, "token carries a non-numeric user id");
        AppError::Unauthorized
    })?;

    // The token alone is not enough: the user may have been removed since issuance.
    match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            warn!(user_id, "token references unknown user");
            Err(AppError::Unauthorized)
        }
        Err(e) => {
            error!(error = %e, user_id, "user lookup failed");
            Err(AppError::Unauthorized)
        }
    }
}

pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}
