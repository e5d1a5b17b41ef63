use anyhow::Context;
use chrono::{DateTime, Utc};
use contracts::domain::a001_announcement::aggregate::AnnouncementId;
use contracts::domain::a002_delivery::aggregate::{Delivery, DeliveryId};
use contracts::domain::a002_delivery::status::DeliveryStatus;
use contracts::domain::common::{AggregateId, EntityMetadata};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set, UpdateMany};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a002_delivery")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub announcement_id: String,
    pub client_id: String,
    pub deliverer_id: String,
    pub status: String,
    pub scheduled_date: Option<chrono::DateTime<chrono::Utc>>,
    pub estimated_delivery: Option<chrono::DateTime<chrono::Utc>>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub actual_delivery: Option<chrono::DateTime<chrono::Utc>>,
    pub price_cents: i64,
    pub cancel_reason: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Delivery {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(Delivery {
            id: DeliveryId::from_string(&m.id).map_err(anyhow::Error::msg)?,
            announcement_id: AnnouncementId::from_string(&m.announcement_id)
                .map_err(anyhow::Error::msg)?,
            client_id: m.client_id,
            deliverer_id: m.deliverer_id,
            status: m.status.parse().map_err(anyhow::Error::msg)?,
            scheduled_date: m.scheduled_date,
            estimated_delivery: m.estimated_delivery,
            started_at: m.started_at,
            actual_delivery: m.actual_delivery,
            price_cents: m.price_cents,
            cancel_reason: m.cancel_reason,
            metadata: EntityMetadata {
                created_at: m.created_at,
                updated_at: m.updated_at,
            },
        })
    }
}

fn into_aggregates(models: Vec<Model>) -> anyhow::Result<Vec<Delivery>> {
    models.into_iter().map(Delivery::try_from).collect()
}

pub async fn insert<C: ConnectionTrait>(conn: &C, aggregate: &Delivery) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(aggregate.id.as_string()),
        announcement_id: Set(aggregate.announcement_id.as_string()),
        client_id: Set(aggregate.client_id.clone()),
        deliverer_id: Set(aggregate.deliverer_id.clone()),
        status: Set(aggregate.status.as_str().to_string()),
        scheduled_date: Set(aggregate.scheduled_date),
        estimated_delivery: Set(aggregate.estimated_delivery),
        started_at: Set(aggregate.started_at),
        actual_delivery: Set(aggregate.actual_delivery),
        price_cents: Set(aggregate.price_cents),
        cancel_reason: Set(aggregate.cancel_reason.clone()),
        created_at: Set(aggregate.metadata.created_at),
        updated_at: Set(aggregate.metadata.updated_at),
    };
    Entity::insert(active)
        .exec_without_returning(conn)
        .await
        .context("Failed to insert delivery")?;
    Ok(())
}

pub async fn get_by_id<C: ConnectionTrait>(
    conn: &C,
    id: DeliveryId,
) -> anyhow::Result<Option<Delivery>> {
    Entity::find_by_id(id.as_string())
        .one(conn)
        .await?
        .map(Delivery::try_from)
        .transpose()
}

pub async fn get_status<C: ConnectionTrait>(
    conn: &C,
    id: DeliveryId,
) -> anyhow::Result<Option<DeliveryStatus>> {
    Ok(get_by_id(conn, id).await?.map(|d| d.status))
}

pub async fn list_for_client<C: ConnectionTrait>(
    conn: &C,
    client_id: &str,
) -> anyhow::Result<Vec<Delivery>> {
    let models = Entity::find()
        .filter(Column::ClientId.eq(client_id))
        .order_by_desc(Column::CreatedAt)
        .all(conn)
        .await?;
    into_aggregates(models)
}

pub async fn list_for_deliverer<C: ConnectionTrait>(
    conn: &C,
    deliverer_id: &str,
) -> anyhow::Result<Vec<Delivery>> {
    let models = Entity::find()
        .filter(Column::DelivererId.eq(deliverer_id))
        .order_by_desc(Column::CreatedAt)
        .all(conn)
        .await?;
    into_aggregates(models)
}

pub async fn list_all<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<Delivery>> {
    let models = Entity::find()
        .order_by_desc(Column::CreatedAt)
        .all(conn)
        .await?;
    into_aggregates(models)
}

// ============================================================================
// Guarded updates
// ============================================================================
//
// Каждое изменение доставки выполняется одним UPDATE с условием на текущий
// статус. Результат `false` значит, что строка уже в другом статусе.

async fn exec_guarded<C: ConnectionTrait>(
    conn: &C,
    update: UpdateMany<Entity>,
    id: DeliveryId,
    expected: DeliveryStatus,
) -> anyhow::Result<bool> {
    let result = update
        .filter(Column::Id.eq(id.as_string()))
        .filter(Column::Status.eq(expected.as_str()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Простая смена статуса `expected -> to`
pub async fn transition<C: ConnectionTrait>(
    conn: &C,
    id: DeliveryId,
    expected: DeliveryStatus,
    to: DeliveryStatus,
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let update = Entity::update_many()
        .col_expr(Column::Status, Expr::value(to.as_str()))
        .col_expr(Column::UpdatedAt, Expr::value(now));
    exec_guarded(conn, update, id, expected).await
}

/// Блокировка строки доставки без смены статуса.
/// Первая запись в транзакции выпуска кода: фиксирует, что доставка всё ещё в `expected`.
pub async fn lock_in_status<C: ConnectionTrait>(
    conn: &C,
    id: DeliveryId,
    expected: DeliveryStatus,
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let update = Entity::update_many().col_expr(Column::UpdatedAt, Expr::value(now));
    exec_guarded(conn, update, id, expected).await
}

/// `ACCEPTED -> IN_TRANSIT`
pub async fn mark_started<C: ConnectionTrait>(
    conn: &C,
    id: DeliveryId,
    estimated_delivery: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let update = Entity::update_many()
        .col_expr(Column::Status, Expr::value(DeliveryStatus::InTransit.as_str()))
        .col_expr(Column::StartedAt, Expr::value(Some(now)))
        .col_expr(Column::EstimatedDelivery, Expr::value(estimated_delivery))
        .col_expr(Column::UpdatedAt, Expr::value(now));
    exec_guarded(conn, update, id, DeliveryStatus::Accepted).await
}

/// `IN_TRANSIT -> DELIVERED`, фиксирует фактическое время доставки
pub async fn mark_delivered<C: ConnectionTrait>(
    conn: &C,
    id: DeliveryId,
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let update = Entity::update_many()
        .col_expr(Column::Status, Expr::value(DeliveryStatus::Delivered.as_str()))
        .col_expr(Column::ActualDelivery, Expr::value(Some(now)))
        .col_expr(Column::UpdatedAt, Expr::value(now));
    exec_guarded(conn, update, id, DeliveryStatus::InTransit).await
}

pub async fn mark_cancelled<C: ConnectionTrait>(
    conn: &C,
    id: DeliveryId,
    expected: DeliveryStatus,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let update = Entity::update_many()
        .col_expr(Column::Status, Expr::value(DeliveryStatus::Cancelled.as_str()))
        .col_expr(Column::CancelReason, Expr::value(reason))
        .col_expr(Column::UpdatedAt, Expr::value(now));
    exec_guarded(conn, update, id, expected).await
}
