use chrono::{DateTime, Utc};
use contracts::domain::a001_announcement::aggregate::{
    Announcement, AnnouncementDto, AnnouncementEvent, AnnouncementId, AnnouncementStatus,
};
use contracts::system::auth::TokenClaims;
use contracts::system::users::UserRole;
use sea_orm::DatabaseConnection;

use super::repository;
use crate::shared::error::{AppError, AppResult};

/// Кто видит объявление: автор, администратор, курьеры (пока оно открыто)
fn is_visible_to(announcement: &Announcement, user: &TokenClaims) -> bool {
    user.is_admin()
        || announcement.client_id == user.sub
        || (user.role == UserRole::Deliverer
            && announcement.status == AnnouncementStatus::Pending)
}

/// Создание объявления клиентом
pub async fn create(
    db: &DatabaseConnection,
    user: &TokenClaims,
    dto: AnnouncementDto,
    now: DateTime<Utc>,
) -> AppResult<Announcement> {
    if user.role != UserRole::Client {
        return Err(AppError::Forbidden);
    }

    let aggregate = Announcement::new_for_insert(user.sub.clone(), dto, now);
    aggregate.validate().map_err(AppError::Validation)?;

    repository::insert(db, &aggregate).await?;
    tracing::info!(
        "Announcement {} created by client {}",
        aggregate.id,
        aggregate.client_id
    );
    Ok(aggregate)
}

pub async fn list(db: &DatabaseConnection, user: &TokenClaims) -> AppResult<Vec<Announcement>> {
    let items = match user.role {
        UserRole::Admin => repository::list_all(db).await?,
        UserRole::Deliverer => repository::list_by_status(db, AnnouncementStatus::Pending).await?,
        _ => repository::list_by_client(db, &user.sub).await?,
    };
    Ok(items)
}

pub async fn get(
    db: &DatabaseConnection,
    user: &TokenClaims,
    id: AnnouncementId,
) -> AppResult<Announcement> {
    repository::get_by_id(db, id)
        .await?
        .filter(|a| is_visible_to(a, user))
        .ok_or(AppError::NotFound("announcement"))
}

/// Отмена объявления автором, пока курьер его не принял
pub async fn cancel(
    db: &DatabaseConnection,
    user: &TokenClaims,
    id: AnnouncementId,
    now: DateTime<Utc>,
) -> AppResult<Announcement> {
    let mut announcement = repository::get_by_id(db, id)
        .await?
        .filter(|a| a.client_id == user.sub)
        .ok_or(AppError::NotFound("announcement"))?;

    // отменить можно только открытое объявление; принятое отменяется через доставку
    if announcement.status != AnnouncementStatus::Pending {
        return Err(AppError::invalid_state("announcement", announcement.status));
    }
    let target = announcement
        .status
        .apply(AnnouncementEvent::Cancel)
        .map_err(|current| AppError::invalid_state("announcement", current))?;

    if !repository::transition(db, id, AnnouncementStatus::Pending, target, now).await? {
        let current = repository::get_status(db, id)
            .await?
            .ok_or(AppError::NotFound("announcement"))?;
        tracing::warn!("Announcement {} cancel lost a race, now {}", id, current);
        return Err(AppError::invalid_state("announcement", current));
    }

    announcement.status = target;
    announcement.metadata.touch(now);
    tracing::info!("Announcement {} cancelled by client", id);
    Ok(announcement)
}
