use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use std::path::Path;

/// Схема БД. Каждая инструкция идемпотентна, поэтому bootstrap можно
/// выполнять при каждом старте.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS sys_users (
        id TEXT PRIMARY KEY NOT NULL,
        username TEXT NOT NULL UNIQUE,
        email TEXT,
        full_name TEXT,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sys_settings (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL,
        description TEXT,
        created_at TEXT,
        updated_at TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS a001_announcement (
        id TEXT PRIMARY KEY NOT NULL,
        client_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        pickup_address TEXT NOT NULL,
        delivery_address TEXT NOT NULL,
        price_cents INTEGER NOT NULL,
        scheduled_date TEXT,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_a001_announcement_client ON a001_announcement (client_id);",
    "CREATE INDEX IF NOT EXISTS idx_a001_announcement_status ON a001_announcement (status);",
    r#"
    CREATE TABLE IF NOT EXISTS a002_delivery (
        id TEXT PRIMARY KEY NOT NULL,
        announcement_id TEXT NOT NULL,
        client_id TEXT NOT NULL,
        deliverer_id TEXT NOT NULL,
        status TEXT NOT NULL,
        scheduled_date TEXT,
        estimated_delivery TEXT,
        started_at TEXT,
        actual_delivery TEXT,
        price_cents INTEGER NOT NULL,
        cancel_reason TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_a002_delivery_client ON a002_delivery (client_id);",
    "CREATE INDEX IF NOT EXISTS idx_a002_delivery_deliverer ON a002_delivery (deliverer_id);",
    // одна живая доставка на объявление
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS ux_a002_delivery_live_announcement
        ON a002_delivery (announcement_id) WHERE status <> 'CANCELLED';
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS a002_delivery_log (
        id TEXT PRIMARY KEY NOT NULL,
        delivery_id TEXT NOT NULL,
        event TEXT NOT NULL,
        status TEXT NOT NULL,
        message TEXT NOT NULL,
        actor_id TEXT,
        created_at TEXT NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_a002_delivery_log_delivery ON a002_delivery_log (delivery_id);",
    r#"
    CREATE TABLE IF NOT EXISTS a003_validation_code (
        id TEXT PRIMARY KEY NOT NULL,
        delivery_id TEXT NOT NULL,
        code_hash TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        is_used INTEGER NOT NULL DEFAULT 0,
        used_at TEXT,
        created_at TEXT NOT NULL
    );
    "#,
    // не больше одного неиспользованного кода на доставку
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS ux_a003_validation_code_unused
        ON a003_validation_code (delivery_id) WHERE is_used = 0;
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS a004_payment (
        id TEXT PRIMARY KEY NOT NULL,
        delivery_id TEXT NOT NULL,
        recipient_id TEXT NOT NULL,
        payment_type TEXT NOT NULL,
        amount_cents INTEGER NOT NULL,
        currency TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS ux_a004_payment_natural_key
        ON a004_payment (delivery_id, recipient_id, payment_type);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS a005_notification (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        delivery_id TEXT,
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_a005_notification_user ON a005_notification (user_id);",
];

/// Открывает SQLite базу по пути из конфигурации и применяет схему
pub async fn initialize_database(db_file: &Path) -> anyhow::Result<DatabaseConnection> {
    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_file.is_absolute() {
        db_file.to_path_buf()
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);

    tracing::info!("Opening database at {}", normalized);
    let conn = Database::connect(&db_url).await?;
    bootstrap_schema(&conn).await?;
    Ok(conn)
}

/// Ensure required tables and indexes exist
pub async fn bootstrap_schema<C: ConnectionTrait>(conn: &C) -> anyhow::Result<()> {
    for sql in SCHEMA {
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            sql.trim().to_string(),
        ))
        .await?;
    }
    tracing::info!("Database schema is up to date ({} statements)", SCHEMA.len());
    Ok(())
}

/// In-memory база для тестов: одно соединение, иначе у каждого своя пустая БД
#[cfg(test)]
pub async fn connect_in_memory() -> anyhow::Result<DatabaseConnection> {
    let mut options = sea_orm::ConnectOptions::new("sqlite::memory:".to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;
    bootstrap_schema(&conn).await?;
    Ok(conn)
}
