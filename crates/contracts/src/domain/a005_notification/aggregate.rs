use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::a002_delivery::aggregate::DeliveryId;

crate::uuid_aggregate_id!(
    /// Уникальный идентификатор уведомления
    NotificationId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    DeliveryCreated,
    DeliveryAssigned,
    DeliveryAccepted,
    DeliveryStarted,
    ValidationCodeGenerated,
    DeliveryConfirmed,
    DeliveryCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::DeliveryCreated => "DELIVERY_CREATED",
            NotificationKind::DeliveryAssigned => "DELIVERY_ASSIGNED",
            NotificationKind::DeliveryAccepted => "DELIVERY_ACCEPTED",
            NotificationKind::DeliveryStarted => "DELIVERY_STARTED",
            NotificationKind::ValidationCodeGenerated => "VALIDATION_CODE_GENERATED",
            NotificationKind::DeliveryConfirmed => "DELIVERY_CONFIRMED",
            NotificationKind::DeliveryCancelled => "DELIVERY_CANCELLED",
        }
    }

    /// Заголовок уведомления по умолчанию
    pub fn title(&self) -> &'static str {
        match self {
            NotificationKind::DeliveryCreated => "Delivery created",
            NotificationKind::DeliveryAssigned => "New delivery assigned",
            NotificationKind::DeliveryAccepted => "Delivery accepted",
            NotificationKind::DeliveryStarted => "Delivery on its way",
            NotificationKind::ValidationCodeGenerated => "Validation code generated",
            NotificationKind::DeliveryConfirmed => "Delivery confirmed",
            NotificationKind::DeliveryCancelled => "Delivery cancelled",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DELIVERY_CREATED" => Ok(NotificationKind::DeliveryCreated),
            "DELIVERY_ASSIGNED" => Ok(NotificationKind::DeliveryAssigned),
            "DELIVERY_ACCEPTED" => Ok(NotificationKind::DeliveryAccepted),
            "DELIVERY_STARTED" => Ok(NotificationKind::DeliveryStarted),
            "VALIDATION_CODE_GENERATED" => Ok(NotificationKind::ValidationCodeGenerated),
            "DELIVERY_CONFIRMED" => Ok(NotificationKind::DeliveryConfirmed),
            "DELIVERY_CANCELLED" => Ok(NotificationKind::DeliveryCancelled),
            other => Err(format!("Unknown notification kind: {}", other)),
        }
    }
}

/// Информационное уведомление пользователю
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub delivery_id: Option<DeliveryId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn for_delivery(
        user_id: &str,
        kind: NotificationKind,
        delivery_id: DeliveryId,
        message: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new_v4(),
            user_id: user_id.to_string(),
            kind,
            title: kind.title().to_string(),
            message,
            delivery_id: Some(delivery_id),
            is_read: false,
            created_at: now,
        }
    }
}
