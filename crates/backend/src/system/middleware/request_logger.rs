use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::shared::format::format_number;

/// Middleware для логирования HTTP запросов
///
/// Одна строка на запрос: метод, путь, статус, длительность (ms)
/// и размер ответа. Коды 4xx/5xx пишутся с уровнем warn.
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let (parts, body) = response.into_parts();

    // Читаем тело ответа, чтобы узнать реальный размер
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(
                "{} {} -> {} | {}ms | body error: {}",
                method,
                path,
                parts.status.as_u16(),
                start.elapsed().as_millis(),
                e
            );
            return Response::from_parts(parts, Body::default());
        }
    };

    let status = parts.status;
    let duration = start.elapsed().as_millis();
    let size = format_number(bytes.len());
    if status.is_client_error() || status.is_server_error() {
        tracing::warn!("{} {} -> {} | {}ms | {} B", method, path, status.as_u16(), duration, size);
    } else {
        tracing::info!("{} {} -> {} | {}ms | {} B", method, path, status.as_u16(), duration, size);
    }

    // Создаем новый ответ с прочитанным телом
    Response::from_parts(parts, Body::from(bytes))
}
