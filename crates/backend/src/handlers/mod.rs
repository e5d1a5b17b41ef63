pub mod a001_announcement;
pub mod a002_delivery;
pub mod a003_validation_code;
pub mod a004_payment;
pub mod a005_notification;

use contracts::domain::common::AggregateId;

use crate::shared::error::{AppError, AppResult};

/// Идентификатор из пути. Некорректный uuid ничем не отличается от отсутствующей записи.
pub(crate) fn parse_id<T: AggregateId>(raw: &str, entity: &'static str) -> AppResult<T> {
    T::from_string(raw).map_err(|_| AppError::NotFound(entity))
}
