use serde::{Deserialize, Serialize};

/// Тело ответа об ошибке API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Машиночитаемый вид ошибки: `NOT_FOUND`, `INVALID_STATE`, `INVALID_CODE`, ...
    pub error: String,
    pub message: String,
}
