use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::status::DeliveryStatus;
use crate::domain::a001_announcement::aggregate::{Announcement, AnnouncementId};
use crate::domain::common::EntityMetadata;

// ============================================================================
// ID Type
// ============================================================================

crate::uuid_aggregate_id!(
    /// Уникальный идентификатор доставки
    DeliveryId
);

// ============================================================================
// Aggregate Root
// ============================================================================

/// Доставка: создаётся, когда курьер принимает объявление
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub announcement_id: AnnouncementId,
    pub client_id: String,
    pub deliverer_id: String,
    pub status: DeliveryStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub price_cents: i64,
    pub cancel_reason: Option<String>,
    #[serde(flatten)]
    pub metadata: EntityMetadata,
}

impl Delivery {
    /// Новая доставка по объявлению.
    /// `status`: `ACCEPTED`, если курьер принял сам, `PENDING` при назначении.
    pub fn new_for_announcement(
        announcement: &Announcement,
        deliverer_id: String,
        status: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DeliveryId::new_v4(),
            announcement_id: announcement.id,
            client_id: announcement.client_id.clone(),
            deliverer_id,
            status,
            scheduled_date: announcement.scheduled_date,
            estimated_delivery: None,
            started_at: None,
            actual_delivery: None,
            price_cents: announcement.price_cents,
            cancel_reason: None,
            metadata: EntityMetadata::new_at(now),
        }
    }

    pub fn is_client(&self, user_id: &str) -> bool {
        self.client_id == user_id
    }

    pub fn is_deliverer(&self, user_id: &str) -> bool {
        self.deliverer_id == user_id
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.is_client(user_id) || self.is_deliverer(user_id)
    }
}

// ============================================================================
// Tracking log
// ============================================================================

/// Тип записи в истории доставки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryLogEvent {
    Created,
    Assigned,
    Accepted,
    Started,
    CodeGenerated,
    Delivered,
    Cancelled,
}

impl DeliveryLogEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryLogEvent::Created => "CREATED",
            DeliveryLogEvent::Assigned => "ASSIGNED",
            DeliveryLogEvent::Accepted => "ACCEPTED",
            DeliveryLogEvent::Started => "STARTED",
            DeliveryLogEvent::CodeGenerated => "CODE_GENERATED",
            DeliveryLogEvent::Delivered => "DELIVERED",
            DeliveryLogEvent::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for DeliveryLogEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(DeliveryLogEvent::Created),
            "ASSIGNED" => Ok(DeliveryLogEvent::Assigned),
            "ACCEPTED" => Ok(DeliveryLogEvent::Accepted),
            "STARTED" => Ok(DeliveryLogEvent::Started),
            "CODE_GENERATED" => Ok(DeliveryLogEvent::CodeGenerated),
            "DELIVERED" => Ok(DeliveryLogEvent::Delivered),
            "CANCELLED" => Ok(DeliveryLogEvent::Cancelled),
            other => Err(format!("Unknown delivery log event: {}", other)),
        }
    }
}

/// Запись истории (tracking) доставки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogEntry {
    pub id: String,
    pub delivery_id: DeliveryId,
    pub event: DeliveryLogEvent,
    /// Статус доставки после события
    pub status: DeliveryStatus,
    pub message: String,
    pub actor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Forms / DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StartDeliveryDto {
    pub estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CancelDeliveryDto {
    pub reason: Option<String>,
}
