use anyhow::Context;
use chrono::{DateTime, Utc};
use contracts::domain::a002_delivery::aggregate::DeliveryId;
use contracts::domain::common::AggregateId;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

/// Запись кода подтверждения. Сам код не хранится, только его хеш.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a003_validation_code")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub delivery_id: String,
    pub code_hash: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub is_used: bool,
    pub used_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    delivery_id: DeliveryId,
    code_hash: String,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        delivery_id: Set(delivery_id.as_string()),
        code_hash: Set(code_hash),
        expires_at: Set(expires_at),
        is_used: Set(false),
        used_at: Set(None),
        created_at: Set(now),
    };
    Entity::insert(active)
        .exec_without_returning(conn)
        .await
        .context("Failed to insert validation code")?;
    Ok(())
}

/// Удалить все неиспользованные коды доставки (истёкшие тоже)
pub async fn delete_unused_for_delivery<C: ConnectionTrait>(
    conn: &C,
    delivery_id: DeliveryId,
) -> anyhow::Result<u64> {
    let result = Entity::delete_many()
        .filter(Column::DeliveryId.eq(delivery_id.as_string()))
        .filter(Column::IsUsed.eq(false))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Погасить код одним условным UPDATE.
/// `true` только если код совпал, не использован и не истёк к моменту `now`.
pub async fn consume<C: ConnectionTrait>(
    conn: &C,
    delivery_id: DeliveryId,
    code_hash: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let result = Entity::update_many()
        .col_expr(Column::IsUsed, Expr::value(true))
        .col_expr(Column::UsedAt, Expr::value(Some(now)))
        .filter(Column::DeliveryId.eq(delivery_id.as_string()))
        .filter(Column::CodeHash.eq(code_hash))
        .filter(Column::IsUsed.eq(false))
        .filter(Column::ExpiresAt.gt(now))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Удалить просроченные неиспользованные коды
pub async fn purge_expired<C: ConnectionTrait>(conn: &C, now: DateTime<Utc>) -> anyhow::Result<u64> {
    let result = Entity::delete_many()
        .filter(Column::IsUsed.eq(false))
        .filter(Column::ExpiresAt.lt(now))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn list_for_delivery<C: ConnectionTrait>(
    conn: &C,
    delivery_id: DeliveryId,
) -> anyhow::Result<Vec<Model>> {
    Ok(Entity::find()
        .filter(Column::DeliveryId.eq(delivery_id.as_string()))
        .all(conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::shared::data::db::connect_in_memory;

    #[tokio::test]
    async fn consume_checks_hash_expiry_and_reuse() {
        let db = connect_in_memory().await.unwrap();
        let id = DeliveryId::new_v4();
        let now = Utc::now();
        insert(&db, id, "h1".into(), now + Duration::hours(2), now).await.unwrap();

        assert!(!consume(&db, id, "other", now).await.unwrap());
        assert!(!consume(&db, id, "h1", now + Duration::hours(2)).await.unwrap());
        assert!(consume(&db, id, "h1", now + Duration::minutes(5)).await.unwrap());
        assert!(!consume(&db, id, "h1", now + Duration::minutes(6)).await.unwrap());
    }

    #[tokio::test]
    async fn only_one_unused_code_per_delivery() {
        let db = connect_in_memory().await.unwrap();
        let id = DeliveryId::new_v4();
        let now = Utc::now();
        insert(&db, id, "h1".into(), now + Duration::hours(2), now).await.unwrap();

        // уникальный частичный индекс не даёт вставить второй
        assert!(insert(&db, id, "h2".into(), now + Duration::hours(2), now).await.is_err());

        assert_eq!(delete_unused_for_delivery(&db, id).await.unwrap(), 1);
        insert(&db, id, "h2".into(), now + Duration::hours(2), now).await.unwrap();
        assert_eq!(list_for_delivery(&db, id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn purge_keeps_live_and_used_codes() {
        let db = connect_in_memory().await.unwrap();
        let now = Utc::now();
        let expired = DeliveryId::new_v4();
        let live = DeliveryId::new_v4();
        let used = DeliveryId::new_v4();
        insert(&db, expired, "a".into(), now - Duration::minutes(1), now - Duration::hours(2)).await.unwrap();
        insert(&db, live, "b".into(), now + Duration::hours(1), now).await.unwrap();
        insert(&db, used, "c".into(), now + Duration::minutes(1), now - Duration::hours(1)).await.unwrap();
        assert!(consume(&db, used, "c", now).await.unwrap());

        assert_eq!(purge_expired(&db, now + Duration::minutes(30)).await.unwrap(), 1);
        assert!(list_for_delivery(&db, expired).await.unwrap().is_empty());
        assert_eq!(list_for_delivery(&db, live).await.unwrap().len(), 1);
        assert_eq!(list_for_delivery(&db, used).await.unwrap().len(), 1);
    }
}
