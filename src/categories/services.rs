use tracing::{error, info, instrument};

use crate::auth::repo_types::User;
use crate::categories::repo_types::{Category, CategoryFields};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const CREATE_FAILED: &str = "An error occurred in the creation of the category.";
const UPDATE_FAILED: &str = "An error occurred in the update of the category.";
const DELETE_FAILED: &str = "An error occurred while deleting the category.";

/// Default categories first, then the user's own; each group by id.
#[instrument(skip(st, user), fields(user_id = user.id))]
pub async fn list_for_user(st: &AppState, user: &User) -> AppResult<Vec<Category>> {
    let mut categories = st
        .categories
        .list_defaults()
        .await
        .map_err(AppError::internal)?;
    let own = st
        .categories
        .list_by_owner(user.id)
        .await
        .map_err(AppError::internal)?;
    categories.extend(own);
    Ok(categories)
}

#[instrument(skip(st, user, fields), fields(user_id = user.id))]
pub async fn create_category(
    st: &AppState,
    user: &User,
    fields: CategoryFields,
) -> AppResult<Category> {
    let category = st.categories.save(user.id, &fields).await.map_err(|e| {
        error!(error = %e, "category insert failed");
        AppError::unprocessable(CREATE_FAILED)
    })?;
    info!(category_id = category.id, "category created");
    Ok(category)
}

#[instrument(skip(st, user, fields), fields(user_id = user.id))]
pub async fn update_category(
    st: &AppState,
    user: &User,
    category_id: i64,
    fields: CategoryFields,
) -> AppResult<Category> {
    let existing = find_owned(st, user, category_id).await?;
    let category = st
        .categories
        .update(existing.id, &fields)
        .await
        .map_err(|e| {
            error!(error = %e, "category update failed");
            AppError::unprocessable(UPDATE_FAILED)
        })?;
    info!(category_id, "category updated");
    Ok(category)
}

#[instrument(skip(st, user), fields(user_id = user.id))]
pub async fn delete_category(st: &AppState, user: &User, category_id: i64) -> AppResult<()> {
    let existing = find_owned(st, user, category_id).await?;
    st.categories.delete(existing.id).await.map_err(|e| {
        error!(error = %e, "category delete failed");
        AppError::unprocessable(DELETE_FAILED)
    })?;
    info!(category_id, "category deleted");
    Ok(())
}

/// Absent and foreign categories are both `NotFound`.
async fn find_owned(st: &AppState, user: &User, category_id: i64) -> AppResult<Category> {
    st.categories
        .find_by_owner_and_id(user.id, category_id)
        .await
        .map_err(AppError::internal)?
        .ok_or(AppError::NotFound)
}
