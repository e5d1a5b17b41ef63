use axum::extract::{Json, Path, State};
use chrono::Utc;
use contracts::domain::a002_delivery::aggregate::{
    CancelDeliveryDto, Delivery, DeliveryLogEntry, StartDeliveryDto,
};

use super::parse_id;
use crate::domain::a002_delivery::service;
use crate::shared::app_state::AppState;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::CurrentUser;

/// GET /api/deliveries
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> AppResult<Json<Vec<Delivery>>> {
    Ok(Json(service::list(&state.db, &claims).await?))
}

/// GET /api/deliveries/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Delivery>> {
    let id = parse_id(&id, "delivery")?;
    Ok(Json(service::get(&state.db, &claims, id).await?))
}

/// GET /api/deliveries/:id/history
pub async fn history(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<DeliveryLogEntry>>> {
    let id = parse_id(&id, "delivery")?;
    Ok(Json(service::history(&state.db, &claims, id).await?))
}

/// POST /api/deliveries/:id/accept
pub async fn accept(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Delivery>> {
    let id = parse_id(&id, "delivery")?;
    Ok(Json(
        service::accept_delivery(&state.db, &claims, id, Utc::now()).await?,
    ))
}

/// POST /api/deliveries/:id/start
///
/// Тело необязательно: `{ "estimated_delivery": "..." }`
pub async fn start(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    dto: Option<Json<StartDeliveryDto>>,
) -> AppResult<Json<Delivery>> {
    let id = parse_id(&id, "delivery")?;
    let dto = dto.map(|Json(d)| d).unwrap_or_default();
    Ok(Json(
        service::start_delivery(&state.db, &claims, id, dto, Utc::now()).await?,
    ))
}

/// POST /api/deliveries/:id/cancel
pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    dto: Option<Json<CancelDeliveryDto>>,
) -> AppResult<Json<Delivery>> {
    let id = parse_id(&id, "delivery")?;
    let dto = dto.map(|Json(d)| d).unwrap_or_default();
    Ok(Json(
        service::cancel_delivery(&state.db, &claims, id, dto, Utc::now()).await?,
    ))
}
