use contracts::domain::a004_payment::aggregate::Payment;
use contracts::system::auth::TokenClaims;
use sea_orm::DatabaseConnection;

use super::repository;
use crate::shared::error::AppResult;

/// Платежи текущего пользователя; администратор видит все
pub async fn list(db: &DatabaseConnection, user: &TokenClaims) -> AppResult<Vec<Payment>> {
    let items = if user.is_admin() {
        repository::list_all(db).await?
    } else {
        repository::list_for_recipient(db, &user.sub).await?
    };
    Ok(items)
}
