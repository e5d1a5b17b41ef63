use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::a002_delivery::aggregate::DeliveryId;

crate::uuid_aggregate_id!(
    /// Уникальный идентификатор платежа
    PaymentId
);

/// Currency used for every delivery payment
pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    /// Выплата курьеру за подтверждённую доставку
    DeliveryPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::DeliveryPayment => "DELIVERY_PAYMENT",
        }
    }
}

impl FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DELIVERY_PAYMENT" => Ok(PaymentType::DeliveryPayment),
            other => Err(format!("Unknown payment type: {}", other)),
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(format!("Unknown payment status: {}", other)),
        }
    }
}

/// Платёжная запись. Уникальна по (delivery_id, recipient_id, payment_type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub delivery_id: DeliveryId,
    pub recipient_id: String,
    pub payment_type: PaymentType,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Ожидающая выплата курьеру за доставку
    pub fn pending_delivery_payment(
        delivery_id: DeliveryId,
        recipient_id: String,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new_v4(),
            delivery_id,
            recipient_id,
            payment_type: PaymentType::DeliveryPayment,
            amount_cents,
            currency: DEFAULT_CURRENCY.to_string(),
            status: PaymentStatus::Pending,
            created_at: now,
        }
    }
}
