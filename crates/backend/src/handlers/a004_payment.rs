use axum::extract::{Json, State};
use contracts::domain::a004_payment::aggregate::Payment;

use crate::domain::a004_payment::service;
use crate::shared::app_state::AppState;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::CurrentUser;

/// GET /api/payments
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> AppResult<Json<Vec<Payment>>> {
    Ok(Json(service::list(&state.db, &claims).await?))
}
