use anyhow::Context;
use chrono::{DateTime, Utc};
use contracts::domain::a002_delivery::aggregate::{DeliveryId, DeliveryLogEntry, DeliveryLogEvent};
use contracts::domain::a002_delivery::status::DeliveryStatus;
use contracts::domain::common::AggregateId;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, Order};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

/// История доставки (tracking)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a002_delivery_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub delivery_id: String,
    pub event: String,
    pub status: String,
    pub message: String,
    pub actor_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for DeliveryLogEntry {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(DeliveryLogEntry {
            id: m.id,
            delivery_id: DeliveryId::from_string(&m.delivery_id).map_err(anyhow::Error::msg)?,
            event: m.event.parse().map_err(anyhow::Error::msg)?,
            status: m.status.parse().map_err(anyhow::Error::msg)?,
            message: m.message,
            actor_id: m.actor_id,
            created_at: m.created_at,
        })
    }
}

/// Добавить запись в историю доставки
pub async fn append<C: ConnectionTrait>(
    conn: &C,
    delivery_id: DeliveryId,
    event: DeliveryLogEvent,
    status: DeliveryStatus,
    message: impl Into<String>,
    actor_id: Option<&str>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        delivery_id: Set(delivery_id.as_string()),
        event: Set(event.as_str().to_string()),
        status: Set(status.as_str().to_string()),
        message: Set(message.into()),
        actor_id: Set(actor_id.map(str::to_string)),
        created_at: Set(now),
    };
    Entity::insert(active)
        .exec_without_returning(conn)
        .await
        .context("Failed to append delivery log entry")?;
    Ok(())
}

/// История в порядке добавления
pub async fn list_for_delivery<C: ConnectionTrait>(
    conn: &C,
    delivery_id: DeliveryId,
) -> anyhow::Result<Vec<DeliveryLogEntry>> {
    Entity::find()
        .filter(Column::DeliveryId.eq(delivery_id.as_string()))
        .order_by_asc(Column::CreatedAt)
        .order_by(Expr::cust("rowid"), Order::Asc)
        .all(conn)
        .await?
        .into_iter()
        .map(DeliveryLogEntry::try_from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;

    #[tokio::test]
    async fn entries_come_back_in_insertion_order() {
        let db = connect_in_memory().await.unwrap();
        let id = DeliveryId::new_v4();
        let now = Utc::now();

        append(&db, id, DeliveryLogEvent::Accepted, DeliveryStatus::Accepted, "accepted", Some("d-1"), now)
            .await
            .unwrap();
        append(&db, id, DeliveryLogEvent::Started, DeliveryStatus::InTransit, "started", Some("d-1"), now)
            .await
            .unwrap();
        append(&db, DeliveryId::new_v4(), DeliveryLogEvent::Accepted, DeliveryStatus::Accepted, "other", None, now)
            .await
            .unwrap();

        let entries = list_for_delivery(&db, id).await.unwrap();
        let events: Vec<_> = entries.iter().map(|e| e.event).collect();
        assert_eq!(events, vec![DeliveryLogEvent::Accepted, DeliveryLogEvent::Started]);
        assert_eq!(entries[1].status, DeliveryStatus::InTransit);
    }
}
