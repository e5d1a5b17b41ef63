use axum::extract::{Json, State};
use contracts::system::auth::{LoginRequest, LoginResponse, UserInfo};
use contracts::system::users::User;

use crate::shared::app_state::AppState;
use crate::shared::extract::AppJson;
use crate::shared::error::{AppError, AppResult};
use crate::system::auth::extractor::CurrentUser;
use crate::system::{auth::jwt, users::service as user_service};

fn user_info(user: User) -> UserInfo {
    UserInfo {
        id: user.id,
        username: user.username,
        full_name: user.full_name,
        email: user.email,
        role: user.role,
    }
}

/// Login handler
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    // Verify credentials
    let user = user_service::verify_credentials(&state.db, &request.username, &request.password)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Failed login attempt for '{}'", request.username);
            AppError::Unauthorized
        })?;

    let access_token = jwt::generate_access_token(
        &state.jwt_secret,
        &user,
        state.config.auth.access_token_lifetime_hours,
    )?;
    tracing::info!("User '{}' logged in", user.username);

    Ok(Json(LoginResponse {
        access_token,
        user: user_info(user),
    }))
}

/// Get current user handler (protected by middleware)
pub async fn current_user(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> AppResult<Json<UserInfo>> {
    let user = user_service::get_by_id(&state.db, &claims.sub)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    Ok(Json(user_info(user)))
}
