use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Utc;
use cron::Schedule;
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::domain::a003_validation_code::cleanup;

/// Фоновый воркер очистки просроченных кодов подтверждения.
/// Расписание задаётся cron-выражением с секундами: "0 */15 * * * *".
pub struct CleanupWorker {
    db: DatabaseConnection,
    schedule: Schedule,
}

impl CleanupWorker {
    pub fn new(db: DatabaseConnection, expression: &str) -> Result<Self> {
        let schedule = Schedule::from_str(expression)
            .with_context(|| format!("Invalid cleanup schedule '{}'", expression))?;
        Ok(Self { db, schedule })
    }

    /// Запускает цикл очистки. Ошибки логируются, цикл продолжается.
    pub async fn run_loop(&self) {
        info!("Validation code cleanup worker started");
        loop {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                warn!("Cleanup schedule has no upcoming runs, worker stopped");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            if let Err(e) = cleanup::purge_expired_codes(&self.db, Utc::now()).await {
                error!("Expired code cleanup failed: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;

    #[tokio::test]
    async fn accepts_default_schedule() {
        let db = connect_in_memory().await.unwrap();
        let worker = CleanupWorker::new(db, "0 */15 * * * *").unwrap();
        let first = worker.schedule.upcoming(Utc).next().unwrap();
        assert!(first > Utc::now());
        assert!(first <= Utc::now() + chrono::Duration::minutes(15));
    }

    #[tokio::test]
    async fn rejects_garbage_schedule() {
        let db = connect_in_memory().await.unwrap();
        assert!(CleanupWorker::new(db, "every quarter hour").is_err());
    }
}
