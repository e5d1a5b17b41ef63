use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Статус доставки.
///
/// `PENDING → ACCEPTED → IN_TRANSIT → DELIVERED`, любой нетерминальный
/// статус может перейти в `CANCELLED`. В БД и в JSON хранится только
/// каноническое представление в верхнем регистре (`"IN_TRANSIT"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Accepted,
    InTransit,
    Delivered,
    Cancelled,
}

/// События жизненного цикла доставки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryEvent {
    Accept,
    Start,
    Confirm,
    Cancel,
}

/// Попытка недопустимого перехода; хранит текущий статус для сообщения об ошибке
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: DeliveryStatus,
    pub event: DeliveryEvent,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot {} a delivery in status {}",
            self.event.as_str(),
            self.from
        )
    }
}

impl std::error::Error for InvalidTransition {}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Accepted => "ACCEPTED",
            DeliveryStatus::InTransit => "IN_TRANSIT",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Cancelled => "CANCELLED",
        }
    }

    /// Все переходы описаны только здесь
    pub fn apply(self, event: DeliveryEvent) -> Result<DeliveryStatus, InvalidTransition> {
        use DeliveryEvent as E;
        use DeliveryStatus as S;
        match (self, event) {
            (S::Pending, E::Accept) => Ok(S::Accepted),
            (S::Accepted, E::Start) => Ok(S::InTransit),
            (S::InTransit, E::Confirm) => Ok(S::Delivered),
            (S::Pending | S::Accepted | S::InTransit, E::Cancel) => Ok(S::Cancelled),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    /// Код подтверждения можно выпустить или погасить только в пути
    pub fn accepts_validation_code(&self) -> bool {
        *self == DeliveryStatus::InTransit
    }

    pub fn all() -> [DeliveryStatus; 5] {
        [
            DeliveryStatus::Pending,
            DeliveryStatus::Accepted,
            DeliveryStatus::InTransit,
            DeliveryStatus::Delivered,
            DeliveryStatus::Cancelled,
        ]
    }
}

impl DeliveryEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryEvent::Accept => "accept",
            DeliveryEvent::Start => "start",
            DeliveryEvent::Confirm => "confirm",
            DeliveryEvent::Cancel => "cancel",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(DeliveryStatus::Pending),
            "ACCEPTED" => Ok(DeliveryStatus::Accepted),
            "IN_TRANSIT" => Ok(DeliveryStatus::InTransit),
            "DELIVERED" => Ok(DeliveryStatus::Delivered),
            "CANCELLED" => Ok(DeliveryStatus::Cancelled),
            other => Err(format!("Unknown delivery status: {}", other)),
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
