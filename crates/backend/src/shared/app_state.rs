use sea_orm::DatabaseConnection;
use std::sync::Arc;

use super::config::Config;

/// Общее состояние обработчиков: пул БД, конфигурация и секрет JWT.
/// Клонируется на каждый запрос.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub jwt_secret: Arc<String>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, jwt_secret: String) -> Self {
        Self {
            db,
            config: Arc::new(config),
            jwt_secret: Arc::new(jwt_secret),
        }
    }

    pub fn code_ttl(&self) -> chrono::Duration {
        self.config.validation.code_ttl()
    }
}
