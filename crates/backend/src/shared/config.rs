use serde::Deserialize;
use std::path::{Path, PathBuf};

use contracts::domain::a003_validation_code::aggregate::DEFAULT_CODE_TTL_MINUTES;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ValidationConfig {
    /// Время жизни кода подтверждения в минутах
    #[serde(default = "default_code_ttl_minutes")]
    pub code_ttl_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CleanupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron-выражение с секундами (формат крейта `cron`)
    #[serde(default = "default_cleanup_schedule")]
    pub schedule: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_token_lifetime_hours")]
    pub access_token_lifetime_hours: i64,
    /// Пароль администратора, создаваемого при первом запуске
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_code_ttl_minutes() -> i64 {
    DEFAULT_CODE_TTL_MINUTES
}

fn default_true() -> bool {
    true
}

fn default_cleanup_schedule() -> String {
    "0 */15 * * * *".to_string()
}

fn default_token_lifetime_hours() -> i64 {
    24
}

fn default_admin_password() -> String {
    "admin".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            code_ttl_minutes: default_code_ttl_minutes(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: default_cleanup_schedule(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime_hours: default_token_lifetime_hours(),
            admin_password: default_admin_password(),
        }
    }
}

impl ValidationConfig {
    pub fn code_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.code_ttl_minutes)
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/ecodeli.db"

[server]
host = "0.0.0.0"
port = 3000

[validation]
code_ttl_minutes = 120

[cleanup]
enabled = true
schedule = "0 */15 * * * *"

[auth]
access_token_lifetime_hours = 24
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Current working directory (for development)
/// 3. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    let mut candidates = Vec::new();
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.push(exe_dir.join("config.toml"));
        }
    }
    candidates.push(PathBuf::from("config.toml"));

    for config_path in candidates {
        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            return load_config_from(&config_path);
        }
        tracing::warn!("config.toml not found at: {}", config_path.display());
    }

    tracing::info!("Using default embedded configuration");
    parse_config(DEFAULT_CONFIG)
}

pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub(crate) fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(contents)?;
    if config.validation.code_ttl_minutes <= 0 {
        anyhow::bail!("validation.code_ttl_minutes must be positive");
    }
    Ok(config)
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> PathBuf {
    let db_path = Path::new(&config.database.path);

    if db_path.is_absolute() {
        return db_path.to_path_buf();
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return exe_dir.join(db_path);
        }
    }

    PathBuf::from(&config.database.path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.database.path, "target/db/ecodeli.db");
        assert_eq!(config.validation.code_ttl_minutes, 120);
        assert_eq!(config.server.port, 3000);
        assert!(config.cleanup.enabled);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = parse_config("[database]\npath = \"x.db\"\n").unwrap();
        assert_eq!(config.validation.code_ttl(), chrono::Duration::hours(2));
        assert_eq!(config.cleanup.schedule, "0 */15 * * * *");
        assert_eq!(config.auth.access_token_lifetime_hours, 24);
    }

    #[test]
    fn test_non_positive_ttl_is_rejected() {
        let raw = "[database]\npath = \"x.db\"\n[validation]\ncode_ttl_minutes = 0\n";
        assert!(parse_config(raw).is_err());
    }
}
