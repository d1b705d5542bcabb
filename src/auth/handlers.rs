use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::{
    dto::{BalanceResponse, CurrentUserResponse, LoginRequest, LoginResponse, RegisterRequest},
    extractors::AuthUser,
    repo_types::NewUser,
    services,
};
use crate::error::{AppResult, MessageResponse};
use crate::extract::JsonBody;
use crate::state::AppState;

/// Routes reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/login", post(login))
}

/// Routes that expect `require_user` in front of them.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/users/current", get(current))
        .route("/users/balance", get(balance))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<Json<MessageResponse>> {
    let new_user = NewUser::try_from(payload)?;
    services::register_user(&state, new_user).await?;
    Ok(MessageResponse::new("User successfully created."))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let req = payload.normalized()?;
    Ok(Json(services::login_user(&state, req).await?))
}

#[instrument(skip_all)]
pub async fn current(AuthUser(user): AuthUser) -> Json<CurrentUserResponse> {
    Json(services::current_user(&user))
}

#[instrument(skip_all)]
pub async fn balance(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<BalanceResponse>> {
    Ok(Json(services::balance_user(&state, &user).await?))
}
