use tracing::{error, info, instrument, warn};

use crate::auth::repo_types::User;
use crate::error::{AppError, AppResult};
use crate::operations::{
    dto::OperationDraft,
    repo_types::{NewOperation, Operation, OperationWithCategory},
};
use crate::state::AppState;

const INVALID_CATEGORY: &str = "Invalid category.";
const CREATE_FAILED: &str = "An error occurred in the creation of the operation.";
const UPDATE_FAILED: &str = "An error occurred in the update of the operation.";
const DELETE_FAILED: &str = "An error occurred while deleting the operation.";

#[instrument(skip(st, user), fields(user_id = user.id))]
pub async fn list_operations(st: &AppState, user: &User) -> AppResult<Vec<OperationWithCategory>> {
    st.operations
        .list_by_owner(user.id)
        .await
        .map_err(AppError::internal)
}

#[instrument(skip(st, user), fields(user_id = user.id))]
pub async fn show_operation(
    st: &AppState,
    user: &User,
    operation_id: i64,
) -> AppResult<OperationWithCategory> {
    find_owned(st, user, operation_id).await
}

#[instrument(skip(st, user, draft), fields(user_id = user.id))]
pub async fn create_operation(
    st: &AppState,
    user: &User,
    draft: OperationDraft,
) -> AppResult<Operation> {
    let new_op = resolve_category(st, user, draft).await?;
    let operation = st.operations.save(user.id, &new_op).await.map_err(|e| {
        error!(error = %e, "operation insert failed");
        AppError::unprocessable(CREATE_FAILED)
    })?;
    info!(operation_id = operation.id, "operation created");
    Ok(operation)
}

#[instrument(skip(st, user, draft), fields(user_id = user.id))]
pub async fn update_operation(
    st: &AppState,
    user: &User,
    operation_id: i64,
    draft: OperationDraft,
) -> AppResult<Operation> {
    let existing = find_owned(st, user, operation_id).await?;
    let new_op = resolve_category(st, user, draft).await?;
    let operation = st
        .operations
        .update(existing.operation.id, &new_op)
        .await
        .map_err(|e| {
            error!(error = %e, "operation update failed");
            AppError::unprocessable(UPDATE_FAILED)
        })?;
    info!(operation_id, "operation updated");
    Ok(operation)
}

#[instrument(skip(st, user), fields(user_id = user.id))]
pub async fn delete_operation(st: &AppState, user: &User, operation_id: i64) -> AppResult<()> {
    let existing = find_owned(st, user, operation_id).await?;
    st.operations
        .delete(existing.operation.id)
        .await
        .map_err(|e| {
            error!(error = %e, "operation delete failed");
            AppError::unprocessable(DELETE_FAILED)
        })?;
    info!(operation_id, "operation deleted");
    Ok(())
}

async fn find_owned(
    st: &AppState,
    user: &User,
    operation_id: i64,
) -> AppResult<OperationWithCategory> {
    st.operations
        .find_by_owner_and_id(user.id, operation_id)
        .await
        .map_err(AppError::internal)?
        .ok_or(AppError::NotFound)
}

/// The category must be a default one or owned by `user`, whatever the
/// handler has already checked.
async fn resolve_category(
    st: &AppState,
    user: &User,
    draft: OperationDraft,
) -> AppResult<NewOperation> {
    let Ok(category_id) = draft.category_id.parse::<i64>() else {
        warn!(category_id = %draft.category_id, "non-numeric category id");
        return Err(AppError::unprocessable(INVALID_CATEGORY));
    };

    let category = st
        .categories
        .find_by_id(category_id)
        .await
        .map_err(AppError::internal)?;
    match category {
        Some(c) if c.is_visible_to(user.id) => Ok(NewOperation {
            category_id: c.id,
            kind: draft.kind,
            amount: draft.amount,
            date: draft.date,
            description: draft.description,
        }),
        _ => {
            warn!(category_id, "category not visible to user");
            Err(AppError::unprocessable(INVALID_CATEGORY))
        }
    }
}
