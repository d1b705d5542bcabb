use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use crate::auth::{
    dto::{BalanceResponse, CurrentUserResponse, LoginRequest, LoginResponse},
    password::{hash_password, verify_password},
    repo_types::{NewUser, User},
};
use crate::db::RepoError;
use crate::error::{AppError, AppResult};
use crate::operations::repo_types::OperationType;
use crate::state::AppState;

#[instrument(skip(st, new_user), fields(username = %new_user.username))]
pub async fn register_user(st: &AppState, new_user: NewUser) -> AppResult<User> {
    let hash = hash_password(&new_user.password).map_err(AppError::Internal)?;

    match st.users.save(&new_user.username, &new_user.email, &hash).await {
        Ok(user) => {
            info!(user_id = user.id, "user registered");
            Ok(user)
        }
        Err(e @ RepoError::Conflict) => {
            warn!(email = %new_user.email, "email or username already registered");
            Err(AppError::BadRequest(e.to_string()))
        }
        Err(e) => Err(AppError::internal(e)),
    }
}

#[instrument(skip(st, req), fields(email = %req.email))]
pub async fn login_user(st: &AppState, req: LoginRequest) -> AppResult<LoginResponse> {
    let user = match st.users.find_by_email(&req.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("login unknown email");
            return Err(AppError::InvalidCredentials);
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(AppError::internal(e));
        }
    };

    if !verify_password(&req.password, &user.password_hash).map_err(AppError::Internal)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let (expires_in, token) = st
        .jwt
        .issue(&user.id.to_string())
        .map_err(AppError::Internal)?;

    info!(user_id = user.id, "user logged in");
    Ok(LoginResponse { token, expires_in })
}

pub fn current_user(user: &User) -> CurrentUserResponse {
    CurrentUserResponse {
        email: user.email.clone(),
        username: user.username.clone(),
    }
}

#[instrument(skip(st, user), fields(user_id = user.id))]
pub async fn balance_user(st: &AppState, user: &User) -> AppResult<BalanceResponse> {
    let operations = st
        .operations
        .list_by_owner(user.id)
        .await
        .map_err(AppError::internal)?;

    let total_balance = total_balance(
        operations
            .iter()
            .map(|o| (o.operation.kind, o.operation.amount)),
    );
    Ok(BalanceResponse { total_balance })
}

/// Income adds, expense subtracts; rendered with exactly two decimals.
pub fn total_balance(entries: impl IntoIterator<Item = (OperationType, Decimal)>) -> String {
    let mut total: Decimal = entries
        .into_iter()
        .map(|(kind, amount)| kind.signed(amount))
        .sum();
    total = total.round_dp(2);
    total.rescale(2);
    total.to_string()
}
