use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::a002_delivery::aggregate::DeliveryId;
use crate::domain::a002_delivery::status::DeliveryStatus;

/// Длина кода подтверждения (цифры, ведущие нули допустимы)
pub const VALIDATION_CODE_LENGTH: usize = 6;

/// Время жизни кода по умолчанию: 2 часа
pub const DEFAULT_CODE_TTL_MINUTES: i64 = 120;

/// Проверка формата присланного клиентом кода (только длина).
/// Неверные символы при правильной длине отсекаются сравнением с кодом.
pub fn check_code_format(code: &str) -> Result<(), String> {
    let len = code.chars().count();
    if len != VALIDATION_CODE_LENGTH {
        return Err(format!(
            "Validation code must be {} characters long, got {}",
            VALIDATION_CODE_LENGTH, len
        ));
    }
    Ok(())
}

/// Ответ курьеру: новый код и срок его действия
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedValidationCode {
    pub delivery_id: DeliveryId,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Запрос клиента на подтверждение доставки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmDeliveryDto {
    pub code: String,
}

/// Подтверждение успешной доставки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfirmation {
    pub delivery_id: DeliveryId,
    pub status: DeliveryStatus,
    pub confirmed_at: DateTime<Utc>,
}

/// Результат очистки просроченных кодов
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeExpiredCodesResponse {
    pub deleted: u64,
}
