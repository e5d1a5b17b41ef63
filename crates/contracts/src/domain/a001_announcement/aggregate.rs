use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::common::EntityMetadata;

// ============================================================================
// ID Type
// ============================================================================

crate::uuid_aggregate_id!(
    /// Уникальный идентификатор объявления
    AnnouncementId
);

// ============================================================================
// Status
// ============================================================================

/// Статус объявления. Двигается синхронно с доставкой.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnouncementStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

/// События, меняющие статус объявления
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementEvent {
    /// Курьер найден (принял сам или назначен администратором)
    Accept,
    /// Доставка подтверждена клиентом
    Complete,
    /// Курьер отказался, объявление снова открыто
    Reopen,
    Cancel,
}

impl AnnouncementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnouncementStatus::Pending => "PENDING",
            AnnouncementStatus::Accepted => "ACCEPTED",
            AnnouncementStatus::Completed => "COMPLETED",
            AnnouncementStatus::Cancelled => "CANCELLED",
        }
    }

    /// Единственное место, где описаны допустимые переходы
    pub fn apply(self, event: AnnouncementEvent) -> Result<AnnouncementStatus, AnnouncementStatus> {
        use AnnouncementEvent as E;
        use AnnouncementStatus as S;
        match (self, event) {
            (S::Pending, E::Accept) => Ok(S::Accepted),
            (S::Accepted, E::Complete) => Ok(S::Completed),
            (S::Accepted, E::Reopen) => Ok(S::Pending),
            (S::Pending | S::Accepted, E::Cancel) => Ok(S::Cancelled),
            (current, _) => Err(current),
        }
    }
}

impl FromStr for AnnouncementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AnnouncementStatus::Pending),
            "ACCEPTED" => Ok(AnnouncementStatus::Accepted),
            "COMPLETED" => Ok(AnnouncementStatus::Completed),
            "CANCELLED" => Ok(AnnouncementStatus::Cancelled),
            other => Err(format!("Unknown announcement status: {}", other)),
        }
    }
}

impl std::fmt::Display for AnnouncementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Объявление клиента: заказ на доставку, который принимает курьер
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub client_id: String,
    pub title: String,
    pub description: Option<String>,
    pub pickup_address: String,
    pub delivery_address: String,
    /// Цена в центах (EUR)
    pub price_cents: i64,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub status: AnnouncementStatus,
    #[serde(flatten)]
    pub metadata: EntityMetadata,
}

impl Announcement {
    /// Создать новое объявление для вставки в БД
    pub fn new_for_insert(client_id: String, dto: AnnouncementDto, now: DateTime<Utc>) -> Self {
        Self {
            id: AnnouncementId::new_v4(),
            client_id,
            title: dto.title.trim().to_string(),
            description: dto.description,
            pickup_address: dto.pickup_address.trim().to_string(),
            delivery_address: dto.delivery_address.trim().to_string(),
            price_cents: dto.price_cents,
            scheduled_date: dto.scheduled_date,
            status: AnnouncementStatus::Pending,
            metadata: EntityMetadata::new_at(now),
        }
    }

    /// Валидация данных
    pub fn validate(&self) -> Result<(), String> {
        if self.title.is_empty() {
            return Err("Title must not be empty".into());
        }
        if self.pickup_address.is_empty() {
            return Err("Pickup address must not be empty".into());
        }
        if self.delivery_address.is_empty() {
            return Err("Delivery address must not be empty".into());
        }
        if self.price_cents <= 0 {
            return Err("Price must be positive".into());
        }
        Ok(())
    }
}

// ============================================================================
// Forms / DTOs
// ============================================================================

/// DTO для создания объявления
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnnouncementDto {
    pub title: String,
    pub description: Option<String>,
    pub pickup_address: String,
    pub delivery_address: String,
    pub price_cents: i64,
    pub scheduled_date: Option<DateTime<Utc>>,
}

/// Назначение курьера администратором
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignDelivererDto {
    pub deliverer_id: String,
}
