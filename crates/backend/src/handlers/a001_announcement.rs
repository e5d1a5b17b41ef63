use axum::extract::{Json, Path, State};
use chrono::Utc;
use contracts::domain::a001_announcement::aggregate::{
    Announcement, AnnouncementDto, AssignDelivererDto,
};
use contracts::domain::a002_delivery::aggregate::Delivery;

use super::parse_id;
use crate::domain::{a001_announcement, a002_delivery};
use crate::shared::app_state::AppState;
use crate::shared::extract::AppJson;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::CurrentUser;

/// GET /api/announcements
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> AppResult<Json<Vec<Announcement>>> {
    let items = a001_announcement::service::list(&state.db, &claims).await?;
    Ok(Json(items))
}

/// POST /api/announcements
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    AppJson(dto): AppJson<AnnouncementDto>,
) -> AppResult<Json<Announcement>> {
    let created = a001_announcement::service::create(&state.db, &claims, dto, Utc::now()).await?;
    Ok(Json(created))
}

/// GET /api/announcements/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Announcement>> {
    let id = parse_id(&id, "announcement")?;
    let item = a001_announcement::service::get(&state.db, &claims, id).await?;
    Ok(Json(item))
}

/// POST /api/announcements/:id/cancel
pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Announcement>> {
    let id = parse_id(&id, "announcement")?;
    let item = a001_announcement::service::cancel(&state.db, &claims, id, Utc::now()).await?;
    Ok(Json(item))
}

/// POST /api/announcements/:id/accept
pub async fn accept(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Delivery>> {
    let id = parse_id(&id, "announcement")?;
    let delivery =
        a002_delivery::service::accept_announcement(&state.db, &claims, id, Utc::now()).await?;
    Ok(Json(delivery))
}

/// POST /api/announcements/:id/assign
pub async fn assign(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    AppJson(dto): AppJson<AssignDelivererDto>,
) -> AppResult<Json<Delivery>> {
    let id = parse_id(&id, "announcement")?;
    let delivery =
        a002_delivery::service::assign_deliverer(&state.db, &claims, id, dto, Utc::now()).await?;
    Ok(Json(delivery))
}
