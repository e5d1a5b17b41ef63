use chrono::{DateTime, Utc};
use contracts::domain::a001_announcement::aggregate::{
    AnnouncementEvent, AnnouncementId, AnnouncementStatus, AssignDelivererDto,
};
use contracts::domain::a002_delivery::aggregate::{
    CancelDeliveryDto, Delivery, DeliveryId, DeliveryLogEntry, DeliveryLogEvent, StartDeliveryDto,
};
use contracts::domain::a002_delivery::status::{DeliveryEvent, DeliveryStatus};
use contracts::domain::a005_notification::aggregate::{Notification, NotificationKind};
use contracts::system::auth::TokenClaims;
use contracts::system::users::UserRole;
use sea_orm::{DatabaseConnection, TransactionTrait};

use super::{log_repository, repository};
use crate::domain::a001_announcement::repository as announcement_repository;
use crate::domain::a003_validation_code::repository as code_repository;
use crate::domain::a005_notification::service as notification_service;
use crate::shared::error::{AppError, AppResult};
use crate::system::users::repository as user_repository;

// ============================================================================
// Helpers
// ============================================================================

/// Ошибка после проигранной гонки: перечитываем фактический статус
pub(crate) async fn state_error(db: &DatabaseConnection, id: DeliveryId) -> AppError {
    match repository::get_status(db, id).await {
        Ok(Some(current)) => AppError::invalid_state("delivery", current),
        Ok(None) => AppError::NotFound("delivery"),
        Err(e) => AppError::Internal(e),
    }
}

async fn announcement_state_error(db: &DatabaseConnection, id: AnnouncementId) -> AppError {
    match announcement_repository::get_status(db, id).await {
        Ok(Some(current)) => AppError::invalid_state("announcement", current),
        Ok(None) => AppError::NotFound("announcement"),
        Err(e) => AppError::Internal(e),
    }
}

/// Доставка, видимая пользователю: участник или администратор.
/// Для всех остальных доставки "не существует".
async fn load_visible(
    db: &DatabaseConnection,
    user: &TokenClaims,
    id: DeliveryId,
) -> AppResult<Delivery> {
    repository::get_by_id(db, id)
        .await?
        .filter(|d| user.is_admin() || d.is_participant(&user.sub))
        .ok_or(AppError::NotFound("delivery"))
}

/// Доставка, которой управляет назначенный курьер
async fn load_for_deliverer(
    db: &DatabaseConnection,
    user: &TokenClaims,
    id: DeliveryId,
) -> AppResult<Delivery> {
    let delivery = load_visible(db, user, id).await?;
    if !delivery.is_deliverer(&user.sub) {
        return Err(AppError::Forbidden);
    }
    Ok(delivery)
}

// ============================================================================
// Creation from an announcement
// ============================================================================

/// Курьер принимает открытое объявление: создаётся доставка в статусе ACCEPTED
pub async fn accept_announcement(
    db: &DatabaseConnection,
    user: &TokenClaims,
    announcement_id: AnnouncementId,
    now: DateTime<Utc>,
) -> AppResult<Delivery> {
    if user.role != UserRole::Deliverer {
        return Err(AppError::Forbidden);
    }
    create_for_announcement(
        db,
        announcement_id,
        user.sub.clone(),
        DeliveryStatus::Accepted,
        DeliveryLogEvent::Created,
        user,
        now,
    )
    .await
}

/// Администратор назначает курьера: доставка ждёт подтверждения курьера (PENDING)
pub async fn assign_deliverer(
    db: &DatabaseConnection,
    user: &TokenClaims,
    announcement_id: AnnouncementId,
    dto: AssignDelivererDto,
    now: DateTime<Utc>,
) -> AppResult<Delivery> {
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    let deliverer = user_repository::get_by_id(db, &dto.deliverer_id)
        .await?
        .filter(|u| u.role == UserRole::Deliverer && u.is_active)
        .ok_or_else(|| {
            AppError::Validation(format!("User {} is not an active deliverer", dto.deliverer_id))
        })?;

    create_for_announcement(
        db,
        announcement_id,
        deliverer.id,
        DeliveryStatus::Pending,
        DeliveryLogEvent::Assigned,
        user,
        now,
    )
    .await
}

async fn create_for_announcement(
    db: &DatabaseConnection,
    announcement_id: AnnouncementId,
    deliverer_id: String,
    status: DeliveryStatus,
    log_event: DeliveryLogEvent,
    actor: &TokenClaims,
    now: DateTime<Utc>,
) -> AppResult<Delivery> {
    let announcement = announcement_repository::get_by_id(db, announcement_id)
        .await?
        .ok_or(AppError::NotFound("announcement"))?;
    let accepted = announcement
        .status
        .apply(AnnouncementEvent::Accept)
        .map_err(|current| AppError::invalid_state("announcement", current))?;

    let delivery = Delivery::new_for_announcement(&announcement, deliverer_id, status, now);

    let txn = db.begin().await?;
    if !announcement_repository::transition(
        &txn,
        announcement_id,
        AnnouncementStatus::Pending,
        accepted,
        now,
    )
    .await?
    {
        txn.rollback().await?;
        return Err(announcement_state_error(db, announcement_id).await);
    }
    repository::insert(&txn, &delivery).await?;
    log_repository::append(
        &txn,
        delivery.id,
        log_event,
        status,
        format!("Delivery created for announcement \"{}\"", announcement.title),
        Some(&actor.sub),
        now,
    )
    .await?;
    txn.commit().await?;

    tracing::info!(
        "Delivery {} created for announcement {} (deliverer {}, status {})",
        delivery.id,
        announcement_id,
        delivery.deliverer_id,
        status
    );

    let notification = match status {
        DeliveryStatus::Pending => Notification::for_delivery(
            &delivery.deliverer_id,
            NotificationKind::DeliveryAssigned,
            delivery.id,
            format!("You have been assigned to \"{}\"", announcement.title),
            now,
        ),
        _ => Notification::for_delivery(
            &delivery.client_id,
            NotificationKind::DeliveryAccepted,
            delivery.id,
            format!("A deliverer accepted \"{}\"", announcement.title),
            now,
        ),
    };
    notification_service::notify(db, notification).await;

    Ok(delivery)
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Назначенный курьер подтверждает назначение: PENDING -> ACCEPTED
pub async fn accept_delivery(
    db: &DatabaseConnection,
    user: &TokenClaims,
    id: DeliveryId,
    now: DateTime<Utc>,
) -> AppResult<Delivery> {
    let mut delivery = load_for_deliverer(db, user, id).await?;
    let target = delivery.status.apply(DeliveryEvent::Accept)?;

    let txn = db.begin().await?;
    if !repository::transition(&txn, id, delivery.status, target, now).await? {
        txn.rollback().await?;
        return Err(state_error(db, id).await);
    }
    log_repository::append(
        &txn,
        id,
        DeliveryLogEvent::Accepted,
        target,
        "Assignment accepted by deliverer",
        Some(&user.sub),
        now,
    )
    .await?;
    txn.commit().await?;

    delivery.status = target;
    delivery.metadata.touch(now);
    tracing::info!("Delivery {} accepted by deliverer {}", id, user.sub);

    notification_service::notify(
        db,
        Notification::for_delivery(
            &delivery.client_id,
            NotificationKind::DeliveryAccepted,
            id,
            "Your delivery has been accepted".to_string(),
            now,
        ),
    )
    .await;
    Ok(delivery)
}

/// Курьер забрал посылку: ACCEPTED -> IN_TRANSIT
pub async fn start_delivery(
    db: &DatabaseConnection,
    user: &TokenClaims,
    id: DeliveryId,
    dto: StartDeliveryDto,
    now: DateTime<Utc>,
) -> AppResult<Delivery> {
    let mut delivery = load_for_deliverer(db, user, id).await?;
    let target = delivery.status.apply(DeliveryEvent::Start)?;
    if let Some(eta) = dto.estimated_delivery {
        if eta <= now {
            return Err(AppError::Validation(
                "Estimated delivery must be in the future".into(),
            ));
        }
    }

    let txn = db.begin().await?;
    if !repository::mark_started(&txn, id, dto.estimated_delivery, now).await? {
        txn.rollback().await?;
        return Err(state_error(db, id).await);
    }
    log_repository::append(
        &txn,
        id,
        DeliveryLogEvent::Started,
        target,
        "Parcel picked up, delivery in transit",
        Some(&user.sub),
        now,
    )
    .await?;
    txn.commit().await?;

    delivery.status = target;
    delivery.started_at = Some(now);
    delivery.estimated_delivery = dto.estimated_delivery;
    delivery.metadata.touch(now);
    tracing::info!("Delivery {} is in transit", id);

    notification_service::notify(
        db,
        Notification::for_delivery(
            &delivery.client_id,
            NotificationKind::DeliveryStarted,
            id,
            "Your parcel is on its way".to_string(),
            now,
        ),
    )
    .await;
    Ok(delivery)
}

/// Отмена доставки участником или администратором.
///
/// Курьер, отказавшийся от доставки, возвращает объявление в PENDING;
/// отмена клиентом или администратором закрывает объявление.
/// Неиспользованные коды подтверждения удаляются в той же транзакции.
pub async fn cancel_delivery(
    db: &DatabaseConnection,
    user: &TokenClaims,
    id: DeliveryId,
    dto: CancelDeliveryDto,
    now: DateTime<Utc>,
) -> AppResult<Delivery> {
    let mut delivery = load_visible(db, user, id).await?;
    let target = delivery.status.apply(DeliveryEvent::Cancel)?;

    let by_deliverer = delivery.is_deliverer(&user.sub);
    let announcement_event = if by_deliverer {
        AnnouncementEvent::Reopen
    } else {
        AnnouncementEvent::Cancel
    };
    let announcement_target = AnnouncementStatus::Accepted
        .apply(announcement_event)
        .map_err(|current| AppError::invalid_state("announcement", current))?;
    let reason = dto
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let txn = db.begin().await?;
    if !repository::mark_cancelled(&txn, id, delivery.status, reason.clone(), now).await? {
        txn.rollback().await?;
        return Err(state_error(db, id).await);
    }
    let removed = code_repository::delete_unused_for_delivery(&txn, id).await?;
    if !announcement_repository::transition(
        &txn,
        delivery.announcement_id,
        AnnouncementStatus::Accepted,
        announcement_target,
        now,
    )
    .await?
    {
        txn.rollback().await?;
        return Err(announcement_state_error(db, delivery.announcement_id).await);
    }
    log_repository::append(
        &txn,
        id,
        DeliveryLogEvent::Cancelled,
        target,
        match &reason {
            Some(r) => format!("Delivery cancelled: {}", r),
            None => "Delivery cancelled".to_string(),
        },
        Some(&user.sub),
        now,
    )
    .await?;
    txn.commit().await?;

    tracing::info!(
        "Delivery {} cancelled by {} ({} unused code(s) removed, announcement now {})",
        id,
        user.sub,
        removed,
        announcement_target
    );

    let mut recipients = Vec::new();
    if !delivery.is_client(&user.sub) {
        recipients.push(delivery.client_id.clone());
    }
    if !by_deliverer {
        recipients.push(delivery.deliverer_id.clone());
    }
    for recipient in recipients {
        notification_service::notify(
            db,
            Notification::for_delivery(
                &recipient,
                NotificationKind::DeliveryCancelled,
                id,
                reason
                    .clone()
                    .unwrap_or_else(|| "The delivery has been cancelled".to_string()),
                now,
            ),
        )
        .await;
    }

    delivery.status = target;
    delivery.cancel_reason = reason;
    delivery.metadata.touch(now);
    Ok(delivery)
}

// ============================================================================
// Read side
// ============================================================================

pub async fn get(db: &DatabaseConnection, user: &TokenClaims, id: DeliveryId) -> AppResult<Delivery> {
    load_visible(db, user, id).await
}

/// Доставки пользователя: курьер видит свои, клиент свои, администратор все
pub async fn list(db: &DatabaseConnection, user: &TokenClaims) -> AppResult<Vec<Delivery>> {
    let items = match user.role {
        UserRole::Admin => repository::list_all(db).await?,
        UserRole::Deliverer => repository::list_for_deliverer(db, &user.sub).await?,
        _ => repository::list_for_client(db, &user.sub).await?,
    };
    Ok(items)
}

pub async fn history(
    db: &DatabaseConnection,
    user: &TokenClaims,
    id: DeliveryId,
) -> AppResult<Vec<DeliveryLogEntry>> {
    load_visible(db, user, id).await?;
    Ok(log_repository::list_for_delivery(db, id).await?)
}
