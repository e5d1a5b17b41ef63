use anyhow::Context;
use chrono::{DateTime, Utc};
use contracts::domain::a001_announcement::aggregate::{
    Announcement, AnnouncementId, AnnouncementStatus,
};
use contracts::domain::common::{AggregateId, EntityMetadata};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a001_announcement")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub description: Option<String>,
    pub pickup_address: String,
    pub delivery_address: String,
    pub price_cents: i64,
    pub scheduled_date: Option<chrono::DateTime<chrono::Utc>>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Announcement {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(Announcement {
            id: AnnouncementId::from_string(&m.id).map_err(anyhow::Error::msg)?,
            client_id: m.client_id,
            title: m.title,
            description: m.description,
            pickup_address: m.pickup_address,
            delivery_address: m.delivery_address,
            price_cents: m.price_cents,
            scheduled_date: m.scheduled_date,
            status: m.status.parse().map_err(anyhow::Error::msg)?,
            metadata: EntityMetadata {
                created_at: m.created_at,
                updated_at: m.updated_at,
            },
        })
    }
}

fn into_aggregates(models: Vec<Model>) -> anyhow::Result<Vec<Announcement>> {
    models.into_iter().map(Announcement::try_from).collect()
}

pub async fn insert<C: ConnectionTrait>(conn: &C, aggregate: &Announcement) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(aggregate.id.as_string()),
        client_id: Set(aggregate.client_id.clone()),
        title: Set(aggregate.title.clone()),
        description: Set(aggregate.description.clone()),
        pickup_address: Set(aggregate.pickup_address.clone()),
        delivery_address: Set(aggregate.delivery_address.clone()),
        price_cents: Set(aggregate.price_cents),
        scheduled_date: Set(aggregate.scheduled_date),
        status: Set(aggregate.status.as_str().to_string()),
        created_at: Set(aggregate.metadata.created_at),
        updated_at: Set(aggregate.metadata.updated_at),
    };
    Entity::insert(active)
        .exec_without_returning(conn)
        .await
        .context("Failed to insert announcement")?;
    Ok(())
}

pub async fn get_by_id<C: ConnectionTrait>(
    conn: &C,
    id: AnnouncementId,
) -> anyhow::Result<Option<Announcement>> {
    Entity::find_by_id(id.as_string())
        .one(conn)
        .await?
        .map(Announcement::try_from)
        .transpose()
}

pub async fn list_by_client<C: ConnectionTrait>(
    conn: &C,
    client_id: &str,
) -> anyhow::Result<Vec<Announcement>> {
    let models = Entity::find()
        .filter(Column::ClientId.eq(client_id))
        .order_by_desc(Column::CreatedAt)
        .all(conn)
        .await?;
    into_aggregates(models)
}

pub async fn list_by_status<C: ConnectionTrait>(
    conn: &C,
    status: AnnouncementStatus,
) -> anyhow::Result<Vec<Announcement>> {
    let models = Entity::find()
        .filter(Column::Status.eq(status.as_str()))
        .order_by_desc(Column::CreatedAt)
        .all(conn)
        .await?;
    into_aggregates(models)
}

pub async fn list_all<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<Announcement>> {
    let models = Entity::find()
        .order_by_desc(Column::CreatedAt)
        .all(conn)
        .await?;
    into_aggregates(models)
}

pub async fn get_status<C: ConnectionTrait>(
    conn: &C,
    id: AnnouncementId,
) -> anyhow::Result<Option<AnnouncementStatus>> {
    Ok(get_by_id(conn, id).await?.map(|a| a.status))
}

/// Условный переход статуса: `UPDATE ... WHERE id = ? AND status = from`.
/// Возвращает `false`, если статус уже сменил кто-то другой.
pub async fn transition<C: ConnectionTrait>(
    conn: &C,
    id: AnnouncementId,
    from: AnnouncementStatus,
    to: AnnouncementStatus,
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let result = Entity::update_many()
        .col_expr(Column::Status, Expr::value(to.as_str()))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(id.as_string()))
        .filter(Column::Status.eq(from.as_str()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;
    use contracts::domain::a001_announcement::aggregate::AnnouncementDto;

    fn sample(client_id: &str) -> Announcement {
        let dto = AnnouncementDto {
            title: "Carton de livres".into(),
            pickup_address: "12 rue de Rivoli, Paris".into(),
            delivery_address: "3 place Bellecour, Lyon".into(),
            price_cents: 2500,
            ..Default::default()
        };
        Announcement::new_for_insert(client_id.into(), dto, Utc::now())
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let db = connect_in_memory().await.unwrap();
        let a = sample("client-1");
        insert(&db, &a).await.unwrap();

        let loaded = get_by_id(&db, a.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, a.title);
        assert_eq!(loaded.status, AnnouncementStatus::Pending);
        assert_eq!(list_by_client(&db, "client-1").await.unwrap().len(), 1);
        assert!(list_by_client(&db, "client-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transition_is_conditional() {
        let db = connect_in_memory().await.unwrap();
        let a = sample("client-1");
        insert(&db, &a).await.unwrap();
        let now = Utc::now();

        assert!(transition(&db, a.id, AnnouncementStatus::Pending, AnnouncementStatus::Accepted, now)
            .await
            .unwrap());
        // второй раз из PENDING уже нельзя
        assert!(!transition(&db, a.id, AnnouncementStatus::Pending, AnnouncementStatus::Accepted, now)
            .await
            .unwrap());
        assert_eq!(
            get_status(&db, a.id).await.unwrap(),
            Some(AnnouncementStatus::Accepted)
        );
    }
}
