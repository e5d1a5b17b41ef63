use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use contracts::system::auth::TokenClaims;

use crate::shared::app_state::AppState;
use crate::shared::error::AppError;

fn claims_from_request(state: &AppState, req: &Request<Body>) -> Result<TokenClaims, AppError> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    // Check Bearer prefix
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    super::jwt::validate_token(&state.jwt_secret, token).map_err(|e| {
        tracing::debug!("Rejected token: {:#}", e);
        AppError::Unauthorized
    })
}

/// Middleware that requires valid JWT authentication
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_request(&state, &req)?;

    // Add claims to request extensions for use in handlers
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Middleware that requires admin privileges
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_request(&state, &req)?;

    if !claims.is_admin() {
        return Err(AppError::Forbidden);
    }

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
