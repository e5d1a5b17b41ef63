use axum::extract::FromRequest;

use super::error::AppError;

/// JSON-тело запроса. Ошибка разбора отдаётся как `VALIDATION_ERROR`
/// в общем формате ответа, а не текстом от axum.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
