use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::auth::extractors::AuthUser;
use crate::categories::{
    dto::{CategoryRequest, CategoryResponse},
    repo_types::CategoryFields,
    services,
};
use crate::error::{AppResult, MessageResponse};
use crate::extract::{JsonBody, ResourceId};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            put(update_category).delete(delete_category),
        )
}

#[instrument(skip_all)]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<CategoryResponse>>> {
    let categories = services::list_for_user(&state, &user).await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

#[instrument(skip_all)]
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(payload): JsonBody<CategoryRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let fields = CategoryFields::try_from(payload)?;
    services::create_category(&state, &user, fields).await?;
    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Category successfully created."),
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ResourceId(id): ResourceId,
    JsonBody(payload): JsonBody<CategoryRequest>,
) -> AppResult<Json<MessageResponse>> {
    let fields = CategoryFields::try_from(payload)?;
    services::update_category(&state, &user, id, fields).await?;
    Ok(MessageResponse::new("Category successfully updated."))
}

#[instrument(skip(state, user))]
pub async fn delete_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ResourceId(id): ResourceId,
) -> AppResult<Json<MessageResponse>> {
    services::delete_category(&state, &user, id).await?;
    Ok(MessageResponse::new("Category successfully deleted."))
}
