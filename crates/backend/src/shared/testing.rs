//! Заготовки для тестов: in-memory БД с боевой схемой, пользователи,
//! доставки в нужном статусе.

use chrono::{DateTime, Utc};
use contracts::domain::a001_announcement::aggregate::{Announcement, AnnouncementDto};
use contracts::domain::a002_delivery::aggregate::{Delivery, StartDeliveryDto};
use contracts::system::auth::TokenClaims;
use contracts::system::users::{User, UserRole};
use sea_orm::DatabaseConnection;

use crate::domain::{a001_announcement, a002_delivery};
use crate::shared::app_state::AppState;
use crate::shared::config::parse_config;
use crate::shared::data::db::{connect_in_memory, initialize_database};
use crate::system::users::repository as user_repository;

pub const TEST_JWT_SECRET: &str = "test-secret";

pub fn claims(user_id: &str, role: UserRole) -> TokenClaims {
    let now = Utc::now();
    TokenClaims {
        sub: user_id.to_string(),
        username: user_id.to_string(),
        role,
        exp: (now + chrono::Duration::hours(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
    }
}

pub async fn test_state() -> AppState {
    let db = connect_in_memory().await.unwrap();
    let config = parse_config("[database]\npath = \":memory:\"\n").unwrap();
    AppState::new(db, config, TEST_JWT_SECRET.to_string())
}

/// Файловая БД с обычным пулом соединений: транзакции действительно идут параллельно.
/// Каталог удаляется вместе с `TempDir`.
pub async fn file_database() -> (tempfile::TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().unwrap();
    let db = initialize_database(&dir.path().join("ecodeli.db")).await.unwrap();
    (dir, db)
}

/// Пользователь в sys_users без настоящего хеша (argon2 в тестах медленный)
pub async fn insert_user(db: &DatabaseConnection, username: &str, role: UserRole) -> User {
    let now = Utc::now().to_rfc3339();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: None,
        full_name: None,
        role,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };
    user_repository::create_with_password(db, &user, "not-a-hash")
        .await
        .unwrap();
    user
}

pub fn claims_for(user: &User) -> TokenClaims {
    TokenClaims {
        username: user.username.clone(),
        ..claims(&user.id, user.role)
    }
}

/// Клиент, курьер и администратор
#[derive(Clone)]
pub struct Actors {
    pub client: TokenClaims,
    pub deliverer: TokenClaims,
    pub admin: TokenClaims,
}

pub async fn seed_actors(db: &DatabaseConnection) -> Actors {
    let client = insert_user(db, "client", UserRole::Client).await;
    let deliverer = insert_user(db, "deliverer", UserRole::Deliverer).await;
    let admin = insert_user(db, "admin", UserRole::Admin).await;
    Actors {
        client: claims_for(&client),
        deliverer: claims_for(&deliverer),
        admin: claims_for(&admin),
    }
}

pub async fn announcement(
    db: &DatabaseConnection,
    client: &TokenClaims,
    now: DateTime<Utc>,
) -> Announcement {
    let dto = AnnouncementDto {
        title: "Colis 5 kg".into(),
        description: Some("Fragile".into()),
        pickup_address: "10 rue de la Paix, Paris".into(),
        delivery_address: "1 quai Saint-Antoine, Lyon".into(),
        price_cents: 3200,
        scheduled_date: None,
    };
    a001_announcement::service::create(db, client, dto, now)
        .await
        .unwrap()
}

/// Доставка, принятая курьером (ACCEPTED)
pub async fn accepted_delivery(
    db: &DatabaseConnection,
    actors: &Actors,
    now: DateTime<Utc>,
) -> Delivery {
    let a = announcement(db, &actors.client, now).await;
    a002_delivery::service::accept_announcement(db, &actors.deliverer, a.id, now)
        .await
        .unwrap()
}

/// Доставка в пути (IN_TRANSIT)
pub async fn in_transit_delivery(
    db: &DatabaseConnection,
    actors: &Actors,
    now: DateTime<Utc>,
) -> Delivery {
    let d = accepted_delivery(db, actors, now).await;
    a002_delivery::service::start_delivery(db, &actors.deliverer, d.id, StartDeliveryDto::default(), now)
        .await
        .unwrap()
}
