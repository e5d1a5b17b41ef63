use contracts::domain::a005_notification::aggregate::{Notification, NotificationId};
use contracts::system::auth::TokenClaims;
use sea_orm::DatabaseConnection;

use super::repository;
use crate::shared::error::{AppError, AppResult};

/// Отправка уведомления вне основной транзакции.
/// Ошибка только логируется: уведомления информационные и не влияют на результат операции.
pub async fn notify(db: &DatabaseConnection, notification: Notification) {
    if let Err(e) = repository::insert(db, &notification).await {
        tracing::error!(
            "Failed to store {} notification for user {}: {:#}",
            notification.kind.as_str(),
            notification.user_id,
            e
        );
    }
}

pub async fn list(db: &DatabaseConnection, user: &TokenClaims) -> AppResult<Vec<Notification>> {
    Ok(repository::list_for_user(db, &user.sub).await?)
}

pub async fn mark_read(
    db: &DatabaseConnection,
    user: &TokenClaims,
    id: NotificationId,
) -> AppResult<()> {
    if !repository::mark_read(db, id, &user.sub).await? {
        return Err(AppError::NotFound("notification"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;
    use crate::shared::testing::claims;
    use chrono::{Duration, Utc};
    use contracts::domain::a002_delivery::aggregate::DeliveryId;
    use contracts::domain::a005_notification::aggregate::NotificationKind;
    use contracts::system::users::UserRole;

    #[tokio::test]
    async fn list_newest_first_and_mark_read_by_owner_only() {
        let db = connect_in_memory().await.unwrap();
        let owner = claims("u-1", UserRole::Client);
        let stranger = claims("u-2", UserRole::Client);
        let delivery = DeliveryId::new_v4();
        let t0 = Utc::now();

        let older = Notification::for_delivery(
            "u-1",
            NotificationKind::DeliveryStarted,
            delivery,
            "on its way".into(),
            t0,
        );
        let newer = Notification::for_delivery(
            "u-1",
            NotificationKind::ValidationCodeGenerated,
            delivery,
            "code ready".into(),
            t0 + Duration::seconds(5),
        );
        notify(&db, older.clone()).await;
        notify(&db, newer.clone()).await;

        let items = list(&db, &owner).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, newer.id);
        assert_eq!(items[0].delivery_id, Some(delivery));

        assert!(matches!(
            mark_read(&db, &stranger, older.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        mark_read(&db, &owner, older.id).await.unwrap();
        let items = list(&db, &owner).await.unwrap();
        assert!(items.iter().find(|n| n.id == older.id).unwrap().is_read);
        assert!(list(&db, &stranger).await.unwrap().is_empty());
    }
}
