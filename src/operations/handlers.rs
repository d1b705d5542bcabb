use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use time::OffsetDateTime;
use tracing::instrument;

use crate::auth::extractors::AuthUser;
use crate::error::{AppResult, MessageResponse};
use crate::extract::{JsonBody, ResourceId};
use crate::operations::{
    dto::{OperationDetails, OperationRequest, OperationSummary},
    services,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/operations", get(list_operations).post(create_operation))
        .route(
            "/operations/:id",
            get(show_operation)
                .put(update_operation)
                .delete(delete_operation),
        )
}

#[instrument(skip_all)]
pub async fn list_operations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<OperationSummary>>> {
    let operations = services::list_operations(&state, &user).await?;
    Ok(Json(operations.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, user))]
pub async fn show_operation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ResourceId(id): ResourceId,
) -> AppResult<Json<OperationDetails>> {
    let operation = services::show_operation(&state, &user, id).await?;
    Ok(Json(operation.into()))
}

#[instrument(skip_all)]
pub async fn create_operation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(payload): JsonBody<OperationRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let draft = payload.into_draft(OffsetDateTime::now_utc())?;
    services::create_operation(&state, &user, draft).await?;
    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Operation successfully created."),
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_operation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ResourceId(id): ResourceId,
    JsonBody(payload): JsonBody<OperationRequest>,
) -> AppResult<Json<MessageResponse>> {
    let draft = payload.into_draft(OffsetDateTime::now_utc())?;
    services::update_operation(&state, &user, id, draft).await?;
    Ok(MessageResponse::new("Operation successfully updated."))
}

#[instrument(skip(state, user))]
pub async fn delete_operation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ResourceId(id): ResourceId,
) -> AppResult<Json<MessageResponse>> {
    services::delete_operation(&state, &user, id).await?;
    Ok(MessageResponse::new("Operation successfully deleted."))
}
