use chrono::{DateTime, Utc};
use contracts::domain::a003_validation_code::aggregate::PurgeExpiredCodesResponse;
use sea_orm::DatabaseConnection;

use super::repository;

/// Удаление просроченных неиспользованных кодов.
/// Корректность подтверждения от этого не зависит: истёкший код и так не погасить.
pub async fn purge_expired_codes(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> anyhow::Result<PurgeExpiredCodesResponse> {
    let deleted = repository::purge_expired(db, now).await?;
    if deleted > 0 {
        tracing::info!("Purged {} expired validation code(s)", deleted);
    }
    Ok(PurgeExpiredCodesResponse { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a003_validation_code::issuer::issue_code;
    use crate::shared::data::db::connect_in_memory;
    use crate::shared::testing::{in_transit_delivery, seed_actors};
    use chrono::Duration;

    #[tokio::test]
    async fn purges_only_after_expiry() {
        let db = connect_in_memory().await.unwrap();
        let actors = seed_actors(&db).await;
        let now = Utc::now();
        let delivery = in_transit_delivery(&db, &actors, now).await;
        issue_code(&db, &actors.deliverer, delivery.id, Duration::hours(2), now)
            .await
            .unwrap();

        assert_eq!(purge_expired_codes(&db, now + Duration::hours(1)).await.unwrap().deleted, 0);
        assert_eq!(purge_expired_codes(&db, now + Duration::hours(3)).await.unwrap().deleted, 1);
        assert!(repository::list_for_delivery(&db, delivery.id).await.unwrap().is_empty());
    }
}
