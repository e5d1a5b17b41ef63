use anyhow::{Context, Result};
use chrono::Utc;
use contracts::system::auth::TokenClaims;
use contracts::system::users::User;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

const JWT_SECRET_KEY: &str = "jwt_secret";

/// Generate JWT access token (HS256) carrying user id, username and role
pub fn generate_access_token(secret: &str, user: &User, lifetime_hours: i64) -> Result<String> {
    let now = Utc::now();
    let exp = (now + chrono::Duration::hours(lifetime_hours)).timestamp() as usize;
    let iat = now.timestamp() as usize;

    let claims = TokenClaims {
        sub: user.id.clone(),
        username: user.username.clone(),
        role: user.role,
        exp,
        iat,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to encode JWT token")?;

    Ok(token)
}

/// Validate JWT token and extract claims
pub fn validate_token(secret: &str, token: &str) -> Result<TokenClaims> {
    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("Failed to decode JWT token")?;

    Ok(token_data.claims)
}

/// Get or create JWT secret in sys_settings.
/// Вызывается один раз при старте, дальше секрет живёт в `AppState`.
pub async fn get_or_create_jwt_secret<C: ConnectionTrait>(conn: &C) -> Result<String> {
    if let Some(secret) = get_jwt_secret_from_db(conn).await? {
        return Ok(secret);
    }

    let secret = generate_jwt_secret();
    save_jwt_secret_to_db(conn, &secret).await?;
    tracing::info!("Generated new JWT secret");
    Ok(secret)
}

/// Generate a cryptographically secure JWT secret (256 bits)
fn generate_jwt_secret() -> String {
    use base64::{engine::general_purpose, Engine as _};
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen::<u8>()).collect();
    general_purpose::STANDARD.encode(&random_bytes)
}

async fn get_jwt_secret_from_db<C: ConnectionTrait>(conn: &C) -> Result<Option<String>> {
    let result = conn
        .query_one(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT value FROM sys_settings WHERE key = ?",
            [JWT_SECRET_KEY.into()],
        ))
        .await?;

    match result {
        Some(row) => Ok(Some(row.try_get("", "value")?)),
        None => Ok(None),
    }
}

async fn save_jwt_secret_to_db<C: ConnectionTrait>(conn: &C, secret: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    conn.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT OR REPLACE INTO sys_settings (key, value, description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
        [
            JWT_SECRET_KEY.into(),
            secret.to_string().into(),
            "Auto-generated JWT secret for authentication".into(),
            now.clone().into(),
            now.into(),
        ],
    ))
    .await
    .context("Failed to store JWT secret")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;
    use contracts::system::users::UserRole;

    fn user() -> User {
        User {
            id: "u-1".into(),
            username: "paul".into(),
            email: None,
            full_name: None,
            role: UserRole::Client,
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn token_round_trip_keeps_role() {
        let token = generate_access_token("secret", &user(), 1).unwrap();
        let claims = validate_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.role, UserRole::Client);
        assert!(validate_token("other-secret", &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // exp в прошлом с запасом больше стандартного leeway (60 c)
        let token = generate_access_token("secret", &user(), -1).unwrap();
        assert!(validate_token("secret", &token).is_err());
    }

    #[tokio::test]
    async fn secret_is_generated_once() {
        let db = connect_in_memory().await.unwrap();
        let first = get_or_create_jwt_secret(&db).await.unwrap();
        let second = get_or_create_jwt_secret(&db).await.unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
