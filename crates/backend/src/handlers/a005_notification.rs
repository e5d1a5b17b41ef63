use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use contracts::domain::a005_notification::aggregate::Notification;

use super::parse_id;
use crate::domain::a005_notification::service;
use crate::shared::app_state::AppState;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::CurrentUser;

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(service::list(&state.db, &claims).await?))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "notification")?;
    service::mark_read(&state.db, &claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
