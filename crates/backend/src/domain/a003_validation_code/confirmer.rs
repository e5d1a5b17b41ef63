use chrono::{DateTime, Utc};
use contracts::domain::a001_announcement::aggregate::AnnouncementStatus;
use contracts::domain::a002_delivery::aggregate::{DeliveryId, DeliveryLogEvent};
use contracts::domain::a002_delivery::status::DeliveryEvent;
use contracts::domain::a003_validation_code::aggregate::{check_code_format, DeliveryConfirmation};
use contracts::domain::a004_payment::aggregate::Payment;
use contracts::domain::a005_notification::aggregate::{Notification, NotificationKind};
use contracts::system::auth::TokenClaims;
use sea_orm::{DatabaseConnection, TransactionTrait};

use super::{generator, repository};
use crate::domain::a001_announcement::repository as announcement_repository;
use crate::domain::a002_delivery::{
    log_repository, repository as delivery_repository, service as delivery_service,
};
use crate::domain::a004_payment::repository as payment_repository;
use crate::domain::a005_notification::repository as notification_repository;
use crate::shared::error::{AppError, AppResult};

/// Подтверждение доставки клиентом по коду.
///
/// Порядок проверок: владелец (иначе NotFound), статус IN_TRANSIT
/// (иначе InvalidState), длина кода (иначе Validation), сам код (иначе
/// InvalidCode). Изменения доставки, кода, объявления, платежа, уведомления
/// и истории фиксируются одной транзакцией или не фиксируются вовсе.
pub async fn confirm_delivery(
    db: &DatabaseConnection,
    user: &TokenClaims,
    delivery_id: DeliveryId,
    code: &str,
    now: DateTime<Utc>,
) -> AppResult<DeliveryConfirmation> {
    let delivery = delivery_repository::get_by_id(db, delivery_id)
        .await?
        .filter(|d| d.is_client(&user.sub))
        .ok_or(AppError::NotFound("delivery"))?;
    let delivered = delivery.status.apply(DeliveryEvent::Confirm)?;
    check_code_format(code).map_err(AppError::Validation)?;

    let code_hash = generator::hash_code(delivery_id, code);

    let txn = db.begin().await?;

    // 1. строка доставки первой: конкурирующие подтверждения упираются сюда
    if !delivery_repository::mark_delivered(&txn, delivery_id, now).await? {
        txn.rollback().await?;
        return Err(delivery_service::state_error(db, delivery_id).await);
    }

    // 2. код: совпадает, не использован, не истёк
    if !repository::consume(&txn, delivery_id, &code_hash, now).await? {
        txn.rollback().await?;
        tracing::warn!("Rejected validation code for delivery {}", delivery_id);
        return Err(AppError::InvalidCode);
    }

    // 3. объявление закрывается вместе с доставкой
    if !announcement_repository::transition(
        &txn,
        delivery.announcement_id,
        AnnouncementStatus::Accepted,
        AnnouncementStatus::Completed,
        now,
    )
    .await?
    {
        txn.rollback().await?;
        let current = announcement_repository::get_status(db, delivery.announcement_id)
            .await?
            .ok_or(AppError::NotFound("announcement"))?;
        tracing::error!(
            "Announcement {} of delivery {} is {}, expected ACCEPTED",
            delivery.announcement_id,
            delivery_id,
            current
        );
        return Err(AppError::invalid_state("announcement", current));
    }

    // 4. выплата курьеру, не больше одной на доставку
    let payment = Payment::pending_delivery_payment(
        delivery_id,
        delivery.deliverer_id.clone(),
        delivery.price_cents,
        now,
    );
    if !payment_repository::create_if_absent(&txn, &payment).await? {
        tracing::warn!("Payment for delivery {} already exists", delivery_id);
    }

    // 5. уведомление курьеру
    notification_repository::insert(
        &txn,
        &Notification::for_delivery(
            &delivery.deliverer_id,
            NotificationKind::DeliveryConfirmed,
            delivery_id,
            "The client confirmed the delivery. Your payment is pending.".to_string(),
            now,
        ),
    )
    .await?;

    // 6. история
    log_repository::append(
        &txn,
        delivery_id,
        DeliveryLogEvent::Delivered,
        delivered,
        "Delivery confirmed by client with validation code",
        Some(&user.sub),
        now,
    )
    .await?;

    txn.commit().await?;

    tracing::info!(
        "Delivery {} confirmed, payment of {} cents pending for deliverer {}",
        delivery_id,
        delivery.price_cents,
        delivery.deliverer_id
    );

    Ok(DeliveryConfirmation {
        delivery_id,
        status: delivered,
        confirmed_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a003_validation_code::issuer::issue_code;
    use crate::shared::data::db::{bootstrap_schema, connect_in_memory};
    use crate::shared::testing::{file_database, in_transit_delivery, seed_actors, Actors};
    use chrono::Duration;
    use contracts::domain::a002_delivery::aggregate::Delivery;
    use contracts::domain::a002_delivery::status::DeliveryStatus;
    use contracts::domain::a003_validation_code::aggregate::IssuedValidationCode;
    use contracts::domain::a004_payment::aggregate::{PaymentStatus, PaymentType};
    use sea_orm::ConnectionTrait;

    async fn setup(now: DateTime<Utc>) -> (DatabaseConnection, Actors, Delivery, IssuedValidationCode) {
        let db = connect_in_memory().await.unwrap();
        let actors = seed_actors(&db).await;
        let delivery = in_transit_delivery(&db, &actors, now).await;
        let issued = issue_code(&db, &actors.deliverer, delivery.id, Duration::hours(2), now)
            .await
            .unwrap();
        (db, actors, delivery, issued)
    }

    /// Код, гарантированно отличный от выданного
    fn other_code(code: &str) -> String {
        if code == "000000" {
            "000001".to_string()
        } else {
            "000000".to_string()
        }
    }

    #[tokio::test]
    async fn happy_path_completes_everything() {
        let now = Utc::now();
        let (db, actors, delivery, issued) = setup(now).await;
        let at = now + Duration::minutes(30);

        let confirmation = confirm_delivery(&db, &actors.client, delivery.id, &issued.code, at)
            .await
            .unwrap();
        assert_eq!(confirmation.status, DeliveryStatus::Delivered);
        assert_eq!(confirmation.confirmed_at, at);

        let stored = delivery_repository::get_by_id(&db, delivery.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::Delivered);
        assert_eq!(stored.actual_delivery, Some(at));

        assert_eq!(
            announcement_repository::get_status(&db, delivery.announcement_id)
                .await
                .unwrap(),
            Some(AnnouncementStatus::Completed)
        );

        let payments = payment_repository::list_for_delivery(&db, delivery.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].recipient_id, actors.deliverer.sub);
        assert_eq!(payments[0].amount_cents, delivery.price_cents);
        assert_eq!(payments[0].payment_type, PaymentType::DeliveryPayment);
        assert_eq!(payments[0].status, PaymentStatus::Pending);

        let codes = repository::list_for_delivery(&db, delivery.id).await.unwrap();
        assert!(codes[0].is_used);
        assert_eq!(codes[0].used_at, Some(at));

        let inbox = notification_repository::list_for_user(&db, &actors.deliverer.sub)
            .await
            .unwrap();
        assert!(inbox.iter().any(|n| n.kind == NotificationKind::DeliveryConfirmed));

        let history = log_repository::list_for_delivery(&db, delivery.id).await.unwrap();
        assert_eq!(history.last().unwrap().event, DeliveryLogEvent::Delivered);
    }

    #[tokio::test]
    async fn wrong_code_changes_nothing() {
        let now = Utc::now();
        let (db, actors, delivery, issued) = setup(now).await;

        let err = confirm_delivery(&db, &actors.client, delivery.id, &other_code(&issued.code), now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCode));
        assert_eq!(err.to_string(), "invalid or expired code");

        assert_eq!(
            delivery_repository::get_status(&db, delivery.id).await.unwrap(),
            Some(DeliveryStatus::InTransit)
        );
        assert!(payment_repository::list_for_delivery(&db, delivery.id)
            .await
            .unwrap()
            .is_empty());

        // правильный код после ошибки всё ещё работает
        confirm_delivery(&db, &actors.client, delivery.id, &issued.code, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let now = Utc::now();
        let (db, actors, delivery, issued) = setup(now).await;

        let late = now + Duration::hours(2) + Duration::minutes(1);
        let err = confirm_delivery(&db, &actors.client, delivery.id, &issued.code, late)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCode));
        assert_eq!(
            delivery_repository::get_status(&db, delivery.id).await.unwrap(),
            Some(DeliveryStatus::InTransit)
        );
    }

    #[tokio::test]
    async fn second_code_supersedes_first() {
        let now = Utc::now();
        let (db, actors, delivery, first) = setup(now).await;
        let second = issue_code(&db, &actors.deliverer, delivery.id, Duration::hours(2), now)
            .await
            .unwrap();

        if first.code != second.code {
            let err = confirm_delivery(&db, &actors.client, delivery.id, &first.code, now)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidCode));
        }
        confirm_delivery(&db, &actors.client, delivery.id, &second.code, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn confirmation_is_one_shot() {
        let now = Utc::now();
        let (db, actors, delivery, issued) = setup(now).await;

        confirm_delivery(&db, &actors.client, delivery.id, &issued.code, now)
            .await
            .unwrap();
        let err = confirm_delivery(&db, &actors.client, delivery.id, &issued.code, now)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "delivery is DELIVERED, operation not allowed");
        assert_eq!(
            payment_repository::list_for_delivery(&db, delivery.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_confirmations_succeed_exactly_once() {
        let (_dir, db) = file_database().await;
        let actors = seed_actors(&db).await;

        for _ in 0..3 {
            let now = Utc::now();
            let delivery = in_transit_delivery(&db, &actors, now).await;
            let issued = issue_code(&db, &actors.deliverer, delivery.id, Duration::hours(2), now)
                .await
                .unwrap();

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let db = db.clone();
                    let client = actors.client.clone();
                    let code = issued.code.clone();
                    let id = delivery.id;
                    tokio::spawn(async move { confirm_delivery(&db, &client, id, &code, now).await })
                })
                .collect();

            let mut confirmed = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(_) => confirmed += 1,
                    Err(AppError::InvalidState { .. } | AppError::InvalidCode) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            assert_eq!(confirmed, 1);
            assert_eq!(
                payment_repository::list_for_delivery(&db, delivery.id).await.unwrap().len(),
                1
            );
            assert_eq!(
                delivery_repository::get_status(&db, delivery.id).await.unwrap(),
                Some(DeliveryStatus::Delivered)
            );
        }
    }

    #[tokio::test]
    async fn failure_mid_transaction_rolls_back_all_steps() {
        let now = Utc::now();
        let (db, actors, delivery, issued) = setup(now).await;

        // вставка платежа упадёт на четвёртом шаге
        db.execute_unprepared("DROP TABLE a004_payment").await.unwrap();
        let err = confirm_delivery(&db, &actors.client, delivery.id, &issued.code, now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        assert_eq!(
            delivery_repository::get_status(&db, delivery.id).await.unwrap(),
            Some(DeliveryStatus::InTransit)
        );
        assert_eq!(
            announcement_repository::get_status(&db, delivery.announcement_id)
                .await
                .unwrap(),
            Some(AnnouncementStatus::Accepted)
        );
        let codes = repository::list_for_delivery(&db, delivery.id).await.unwrap();
        assert!(!codes[0].is_used);

        // после восстановления таблицы тот же код подтверждает доставку
        bootstrap_schema(&db).await.unwrap();
        confirm_delivery(&db, &actors.client, delivery.id, &issued.code, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn precheck_order() {
        let now = Utc::now();
        let (db, actors, delivery, _issued) = setup(now).await;

        // чужой пользователь не узнаёт о существовании доставки
        for user in [&actors.deliverer, &actors.admin] {
            let err = confirm_delivery(&db, user, delivery.id, "12", now).await.unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }
        let err = confirm_delivery(&db, &actors.client, DeliveryId::new_v4(), "123456", now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // длина проверяется после статуса
        let err = confirm_delivery(&db, &actors.client, delivery.id, "12345", now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = confirm_delivery(&db, &actors.client, delivery.id, "1234567", now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // шесть символов, но не цифры: просто неверный код
        let err = confirm_delivery(&db, &actors.client, delivery.id, "abcdef", now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCode));
    }

    #[tokio::test]
    async fn confirm_without_issued_code_is_invalid_code() {
        let now = Utc::now();
        let db = connect_in_memory().await.unwrap();
        let actors = seed_actors(&db).await;
        let delivery = in_transit_delivery(&db, &actors, now).await;

        let err = confirm_delivery(&db, &actors.client, delivery.id, "123456", now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCode));
    }
}
