use chrono::{DateTime, Duration, Utc};
use contracts::domain::a002_delivery::aggregate::{DeliveryId, DeliveryLogEvent};
use contracts::domain::a002_delivery::status::DeliveryStatus;
use contracts::domain::a003_validation_code::aggregate::IssuedValidationCode;
use contracts::domain::a005_notification::aggregate::{Notification, NotificationKind};
use contracts::system::auth::TokenClaims;
use sea_orm::{DatabaseConnection, TransactionTrait};

use super::{generator, repository};
use crate::domain::a002_delivery::{
    log_repository, repository as delivery_repository, service as delivery_service,
};
use crate::domain::a005_notification::service as notification_service;
use crate::shared::error::{AppError, AppResult};

/// Выпуск кода подтверждения курьером.
///
/// Новый код заменяет предыдущий неиспользованный: удаление старого и вставка
/// нового идут в одной транзакции, первой записью в которой блокируется строка
/// доставки, поэтому активным всегда остаётся не больше одного кода.
pub async fn issue_code(
    db: &DatabaseConnection,
    user: &TokenClaims,
    delivery_id: DeliveryId,
    ttl: Duration,
    now: DateTime<Utc>,
) -> AppResult<IssuedValidationCode> {
    let delivery = delivery_repository::get_by_id(db, delivery_id)
        .await?
        .ok_or(AppError::NotFound("delivery"))?;
    if !delivery.is_deliverer(&user.sub) {
        tracing::warn!(
            "User {} tried to issue a code for delivery {} they do not deliver",
            user.sub,
            delivery_id
        );
        return Err(AppError::Forbidden);
    }
    if !delivery.status.accepts_validation_code() {
        return Err(AppError::invalid_state("delivery", delivery.status));
    }

    let code = generator::generate_code();
    let code_hash = generator::hash_code(delivery_id, &code);
    let expires_at = now + ttl;

    let txn = db.begin().await?;
    if !delivery_repository::lock_in_status(&txn, delivery_id, DeliveryStatus::InTransit, now).await? {
        txn.rollback().await?;
        return Err(delivery_service::state_error(db, delivery_id).await);
    }
    let replaced = repository::delete_unused_for_delivery(&txn, delivery_id).await?;
    repository::insert(&txn, delivery_id, code_hash, expires_at, now).await?;
    log_repository::append(
        &txn,
        delivery_id,
        DeliveryLogEvent::CodeGenerated,
        DeliveryStatus::InTransit,
        format!("Validation code generated, valid until {}", expires_at.to_rfc3339()),
        Some(&user.sub),
        now,
    )
    .await?;
    txn.commit().await?;

    tracing::info!(
        "Validation code issued for delivery {} (expires {}, replaced {})",
        delivery_id,
        expires_at,
        replaced
    );

    notification_service::notify(
        db,
        Notification::for_delivery(
            &delivery.client_id,
            NotificationKind::ValidationCodeGenerated,
            delivery_id,
            "Your deliverer has generated a validation code. Ask them for it on arrival.".to_string(),
            now,
        ),
    )
    .await;

    Ok(IssuedValidationCode {
        delivery_id,
        code,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a002_delivery::service as deliveries;
    use crate::domain::a005_notification::repository as notifications;
    use crate::shared::data::db::connect_in_memory;
    use crate::domain::a003_validation_code::confirmer::confirm_delivery;
    use crate::shared::testing::{
        accepted_delivery, announcement, file_database, in_transit_delivery, seed_actors,
    };
    use contracts::domain::a001_announcement::aggregate::AssignDelivererDto;
    use contracts::domain::a002_delivery::aggregate::CancelDeliveryDto;
    use contracts::domain::a003_validation_code::aggregate::VALIDATION_CODE_LENGTH;

    #[tokio::test]
    async fn issues_six_digit_code_valid_for_ttl() {
        let db = connect_in_memory().await.unwrap();
        let actors = seed_actors(&db).await;
        let now = Utc::now();
        let delivery = in_transit_delivery(&db, &actors, now).await;

        let issued = issue_code(&db, &actors.deliverer, delivery.id, Duration::hours(2), now)
            .await
            .unwrap();
        assert_eq!(issued.code.len(), VALIDATION_CODE_LENGTH);
        assert!(issued.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(issued.expires_at, now + Duration::hours(2));

        let stored = repository::list_for_delivery(&db, delivery.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_ne!(stored[0].code_hash, issued.code);

        let history = log_repository::list_for_delivery(&db, delivery.id).await.unwrap();
        assert_eq!(history.last().unwrap().event, DeliveryLogEvent::CodeGenerated);

        let client_inbox = notifications::list_for_user(&db, &actors.client.sub).await.unwrap();
        assert!(client_inbox
            .iter()
            .any(|n| n.kind == NotificationKind::ValidationCodeGenerated));
    }

    #[tokio::test]
    async fn new_code_replaces_previous_one() {
        let db = connect_in_memory().await.unwrap();
        let actors = seed_actors(&db).await;
        let now = Utc::now();
        let delivery = in_transit_delivery(&db, &actors, now).await;

        issue_code(&db, &actors.deliverer, delivery.id, Duration::hours(2), now)
            .await
            .unwrap();
        issue_code(&db, &actors.deliverer, delivery.id, Duration::hours(2), now)
            .await
            .unwrap();

        let stored = repository::list_for_delivery(&db, delivery.id).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_issues_leave_one_live_code() {
        let (_dir, db) = file_database().await;
        let actors = seed_actors(&db).await;
        let now = Utc::now();
        let delivery = in_transit_delivery(&db, &actors, now).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                let deliverer = actors.deliverer.clone();
                let id = delivery.id;
                tokio::spawn(async move { issue_code(&db, &deliverer, id, Duration::hours(2), now).await })
            })
            .collect();

        let mut codes = Vec::new();
        for handle in handles {
            codes.push(handle.await.unwrap().unwrap().code);
        }
        assert_eq!(repository::list_for_delivery(&db, delivery.id).await.unwrap().len(), 1);

        // подходит только последний выпущенный код
        let mut confirmed = 0;
        for code in &codes {
            if confirm_delivery(&db, &actors.client, delivery.id, code, now).await.is_ok() {
                confirmed += 1;
            }
        }
        assert_eq!(confirmed, 1);
    }

    #[tokio::test]
    async fn only_assigned_deliverer_may_issue() {
        let db = connect_in_memory().await.unwrap();
        let actors = seed_actors(&db).await;
        let now = Utc::now();
        let delivery = in_transit_delivery(&db, &actors, now).await;

        for user in [&actors.client, &actors.admin] {
            let err = issue_code(&db, user, delivery.id, Duration::hours(2), now)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden));
        }
        let err = issue_code(&db, &actors.deliverer, DeliveryId::new_v4(), Duration::hours(2), now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejected_for_every_status_but_in_transit() {
        let db = connect_in_memory().await.unwrap();
        let actors = seed_actors(&db).await;
        let now = Utc::now();

        // ACCEPTED
        let accepted = accepted_delivery(&db, &actors, now).await;
        let err = issue_code(&db, &actors.deliverer, accepted.id, Duration::hours(2), now)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "delivery is ACCEPTED, operation not allowed");

        // PENDING (назначена администратором)
        let a = announcement(&db, &actors.client, now).await;
        let pending = deliveries::assign_deliverer(
            &db,
            &actors.admin,
            a.id,
            AssignDelivererDto {
                deliverer_id: actors.deliverer.sub.clone(),
            },
            now,
        )
        .await
        .unwrap();
        let err = issue_code(&db, &actors.deliverer, pending.id, Duration::hours(2), now)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "delivery is PENDING, operation not allowed");

        // CANCELLED
        let cancelled = in_transit_delivery(&db, &actors, now).await;
        deliveries::cancel_delivery(&db, &actors.client, cancelled.id, CancelDeliveryDto::default(), now)
            .await
            .unwrap();
        let err = issue_code(&db, &actors.deliverer, cancelled.id, Duration::hours(2), now)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "delivery is CANCELLED, operation not allowed");

        // DELIVERED
        let delivered = in_transit_delivery(&db, &actors, now).await;
        let issued = issue_code(&db, &actors.deliverer, delivered.id, Duration::hours(2), now)
            .await
            .unwrap();
        confirm_delivery(&db, &actors.client, delivered.id, &issued.code, now)
            .await
            .unwrap();
        let err = issue_code(&db, &actors.deliverer, delivered.id, Duration::hours(2), now)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "delivery is DELIVERED, operation not allowed");
    }
}
