use axum::extract::{Json, State};
use chrono::Utc;
use contracts::domain::a003_validation_code::aggregate::PurgeExpiredCodesResponse;

use crate::domain::a003_validation_code::cleanup;
use crate::shared::app_state::AppState;
use crate::shared::error::AppResult;

/// POST /api/system/maintenance/purge-expired-codes (admin only)
pub async fn purge_expired_codes(
    State(state): State<AppState>,
) -> AppResult<Json<PurgeExpiredCodesResponse>> {
    let result = cleanup::purge_expired_codes(&state.db, Utc::now()).await?;
    Ok(Json(result))
}
