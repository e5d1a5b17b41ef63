use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contracts::domain::a002_delivery::status::InvalidTransition;
use contracts::shared::error::ErrorResponse;
use thiserror::Error;

/// Ошибки прикладного уровня, которые видит клиент API
#[derive(Debug, Error)]
pub enum AppError {
    /// Сущность отсутствует или не видна вызывающему (эти случаи не различаются)
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("access denied")]
    Forbidden,

    #[error("authentication required")]
    Unauthorized,

    /// Сущность есть, но её статус не допускает операцию
    #[error("{entity} is {current}, operation not allowed")]
    InvalidState {
        entity: &'static str,
        current: String,
    },

    #[error("{0}")]
    Validation(String),

    /// Намеренно без подробностей: не подсказываем, существует ли код
    #[error("invalid or expired code")]
    InvalidCode,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid_state(entity: &'static str, current: impl ToString) -> Self {
        AppError::InvalidState {
            entity,
            current: current.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::InvalidState { .. } => "INVALID_STATE",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidCode => "INVALID_CODE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidState { .. } | AppError::Validation(_) | AppError::InvalidCode => {
                StatusCode::BAD_REQUEST
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Internal(err.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<InvalidTransition> for AppError {
    fn from(err: InvalidTransition) -> Self {
        AppError::invalid_state("delivery", err.from)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorResponse {
            error: self.kind().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
