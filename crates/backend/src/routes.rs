use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::shared::app_state::AppState;
use crate::system::auth::middleware::{require_admin, require_auth};
use crate::{handlers, system};

/// Конфигурация всех роутов приложения
pub fn configure_routes(state: AppState) -> Router {
    // ========================================
    // PUBLIC
    // ========================================
    let public = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/system/auth/login", post(system::handlers::auth::login));

    // ========================================
    // AUTHENTICATED (роль проверяется в сервисах)
    // ========================================
    let protected = Router::new()
        .route("/api/system/auth/me", get(system::handlers::auth::current_user))
        // A001 Announcements
        .route(
            "/api/announcements",
            get(handlers::a001_announcement::list).post(handlers::a001_announcement::create),
        )
        .route(
            "/api/announcements/:id",
            get(handlers::a001_announcement::get_by_id),
        )
        .route(
            "/api/announcements/:id/accept",
            post(handlers::a001_announcement::accept),
        )
        .route(
            "/api/announcements/:id/assign",
            post(handlers::a001_announcement::assign),
        )
        .route(
            "/api/announcements/:id/cancel",
            post(handlers::a001_announcement::cancel),
        )
        // A002 Deliveries
        .route("/api/deliveries", get(handlers::a002_delivery::list))
        .route("/api/deliveries/:id", get(handlers::a002_delivery::get_by_id))
        .route(
            "/api/deliveries/:id/history",
            get(handlers::a002_delivery::history),
        )
        .route(
            "/api/deliveries/:id/accept",
            post(handlers::a002_delivery::accept),
        )
        .route("/api/deliveries/:id/start", post(handlers::a002_delivery::start))
        .route(
            "/api/deliveries/:id/cancel",
            post(handlers::a002_delivery::cancel),
        )
        // A003 Validation codes
        .route(
            "/api/deliveries/:id/validation-code",
            post(handlers::a003_validation_code::issue),
        )
        .route(
            "/api/deliveries/:id/confirm",
            post(handlers::a003_validation_code::confirm),
        )
        // A004 Payments
        .route("/api/payments", get(handlers::a004_payment::list))
        // A005 Notifications
        .route("/api/notifications", get(handlers::a005_notification::list))
        .route(
            "/api/notifications/:id/read",
            post(handlers::a005_notification::mark_read),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // ========================================
    // ADMIN ONLY
    // ========================================
    let admin = Router::new()
        .route(
            "/api/system/users",
            get(system::handlers::users::list).post(system::handlers::users::create),
        )
        .route(
            "/api/system/maintenance/purge-expired-codes",
            post(system::handlers::maintenance::purge_expired_codes),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    public.merge(protected).merge(admin).with_state(state)
}
