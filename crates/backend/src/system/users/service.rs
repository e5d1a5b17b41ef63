use anyhow::Result;
use chrono::Utc;
use contracts::system::users::{CreateUserDto, User};
use sea_orm::ConnectionTrait;

use super::repository;
use crate::shared::error::{AppError, AppResult};
use crate::system::auth::password;

/// Create a new user
pub async fn create<C: ConnectionTrait>(conn: &C, dto: CreateUserDto) -> AppResult<User> {
    let username = dto.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::Validation("Username cannot be empty".into()));
    }

    if repository::get_by_username(conn, &username).await?.is_some() {
        return Err(AppError::Validation("Username already exists".into()));
    }

    // Basic email validation
    if let Some(ref email) = dto.email {
        if !email.trim().is_empty() && !email.contains('@') {
            return Err(AppError::Validation("Invalid email format".into()));
        }
    }

    password::validate_password_strength(&dto.password)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let password_hash = password::hash_password(&dto.password)?;

    let now = Utc::now().to_rfc3339();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username,
        email: dto.email,
        full_name: dto.full_name,
        role: dto.role,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };

    repository::create_with_password(conn, &user, &password_hash).await?;
    tracing::info!("User {} created with role {}", user.username, user.role);

    Ok(user)
}

/// Get user by ID
pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: &str) -> Result<Option<User>> {
    repository::get_by_id(conn, id).await
}

/// List all users
pub async fn list_all<C: ConnectionTrait>(conn: &C) -> Result<Vec<User>> {
    repository::list_all(conn).await
}

/// Verify user credentials (for login).
/// Неактивный пользователь и неверный пароль неразличимы для вызывающего.
pub async fn verify_credentials<C: ConnectionTrait>(
    conn: &C,
    username: &str,
    password: &str,
) -> Result<Option<User>> {
    let user = match repository::get_by_username(conn, username).await? {
        Some(u) if u.is_active => u,
        _ => return Ok(None),
    };

    let password_hash = repository::get_password_hash(conn, &user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Password hash not found"))?;

    if !password::verify_password(password, &password_hash)? {
        return Ok(None);
    }

    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;
    use contracts::system::users::UserRole;

    fn dto(username: &str) -> CreateUserDto {
        CreateUserDto {
            username: username.into(),
            password: "livraison".into(),
            email: Some("marie@example.fr".into()),
            full_name: Some("Marie Curie".into()),
            role: UserRole::Deliverer,
        }
    }

    #[tokio::test]
    async fn create_and_verify_credentials() {
        let db = connect_in_memory().await.unwrap();
        let user = create(&db, dto("marie")).await.unwrap();
        assert_eq!(user.role, UserRole::Deliverer);

        let ok = verify_credentials(&db, "marie", "livraison").await.unwrap();
        assert_eq!(ok.map(|u| u.id), Some(user.id));
        assert!(verify_credentials(&db, "marie", "nope").await.unwrap().is_none());
        assert!(verify_credentials(&db, "ghost", "livraison").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let db = connect_in_memory().await.unwrap();
        create(&db, dto("marie")).await.unwrap();
        let err = create(&db, dto("marie")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
