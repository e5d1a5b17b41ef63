use axum::extract::{Json, State};
use contracts::system::users::{CreateUserDto, User};

use crate::shared::app_state::AppState;
use crate::shared::extract::AppJson;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::CurrentUser;
use crate::system::users::service;

/// List all users (admin only)
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(_claims): CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    let users = service::list_all(&state.db).await?;
    Ok(Json(users))
}

/// Create user (admin only)
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    AppJson(dto): AppJson<CreateUserDto>,
) -> AppResult<Json<User>> {
    let user = service::create(&state.db, dto).await?;
    tracing::info!("User '{}' ({}) created by {}", user.username, user.role, claims.username);
    Ok(Json(user))
}
