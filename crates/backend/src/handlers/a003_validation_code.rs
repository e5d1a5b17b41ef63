use axum::extract::{Json, Path, State};
use chrono::Utc;
use contracts::domain::a003_validation_code::aggregate::{
    ConfirmDeliveryDto, DeliveryConfirmation, IssuedValidationCode,
};

use super::parse_id;
use crate::domain::a003_validation_code::{confirmer, issuer};
use crate::shared::app_state::AppState;
use crate::shared::extract::AppJson;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::CurrentUser;

/// POST /api/deliveries/:id/validation-code
///
/// Код в открытом виде возвращается только здесь, один раз.
pub async fn issue(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<IssuedValidationCode>> {
    let id = parse_id(&id, "delivery")?;
    let issued = issuer::issue_code(&state.db, &claims, id, state.code_ttl(), Utc::now()).await?;
    Ok(Json(issued))
}

/// POST /api/deliveries/:id/confirm
pub async fn confirm(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    AppJson(dto): AppJson<ConfirmDeliveryDto>,
) -> AppResult<Json<DeliveryConfirmation>> {
    let id = parse_id(&id, "delivery")?;
    let confirmation =
        confirmer::confirm_delivery(&state.db, &claims, id, &dto.code, Utc::now()).await?;
    Ok(Json(confirmation))
}
