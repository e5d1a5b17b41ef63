use anyhow::{Context, Result};
use contracts::system::users::{CreateUserDto, UserRole};
use sea_orm::ConnectionTrait;

use crate::shared::config::AuthConfig;
use crate::system::users::{repository, service};

/// Ensure admin user exists (create if table is empty)
pub async fn ensure_admin_user_exists<C: ConnectionTrait>(conn: &C, auth: &AuthConfig) -> Result<()> {
    let count = repository::count_users(conn).await?;
    if count > 0 {
        return Ok(());
    }

    tracing::info!("No users found. Creating default admin user...");

    let admin_dto = CreateUserDto {
        username: "admin".to_string(),
        password: auth.admin_password.clone(),
        email: None,
        full_name: Some("Administrator".to_string()),
        role: UserRole::Admin,
    };

    let admin = service::create(conn, admin_dto)
        .await
        .context("Failed to create default admin user")?;

    tracing::warn!("Default admin user created (username: admin, id: {})", admin.id);
    if auth.admin_password == "admin" {
        tracing::warn!("The default admin password is in use, set [auth] admin_password in config.toml");
    }

    Ok(())
}
