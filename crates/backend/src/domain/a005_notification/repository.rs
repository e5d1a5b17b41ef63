use anyhow::Context;
use contracts::domain::a002_delivery::aggregate::DeliveryId;
use contracts::domain::a005_notification::aggregate::{Notification, NotificationId};
use contracts::domain::common::AggregateId;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a005_notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub delivery_id: Option<String>,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Notification {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let delivery_id = m
            .delivery_id
            .as_deref()
            .map(DeliveryId::from_string)
            .transpose()
            .map_err(anyhow::Error::msg)?;
        Ok(Notification {
            id: NotificationId::from_string(&m.id).map_err(anyhow::Error::msg)?,
            user_id: m.user_id,
            kind: m.kind.parse().map_err(anyhow::Error::msg)?,
            title: m.title,
            message: m.message,
            delivery_id,
            is_read: m.is_read,
            created_at: m.created_at,
        })
    }
}

pub async fn insert<C: ConnectionTrait>(conn: &C, notification: &Notification) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(notification.id.as_string()),
        user_id: Set(notification.user_id.clone()),
        kind: Set(notification.kind.as_str().to_string()),
        title: Set(notification.title.clone()),
        message: Set(notification.message.clone()),
        delivery_id: Set(notification.delivery_id.map(|id| id.as_string())),
        is_read: Set(notification.is_read),
        created_at: Set(notification.created_at),
    };
    Entity::insert(active)
        .exec_without_returning(conn)
        .await
        .context("Failed to insert notification")?;
    Ok(())
}

/// Уведомления пользователя, новые сверху
pub async fn list_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
) -> anyhow::Result<Vec<Notification>> {
    Entity::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_desc(Column::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(Notification::try_from)
        .collect()
}

/// Отметить прочитанным. `false`, если уведомление чужое или не существует.
pub async fn mark_read<C: ConnectionTrait>(
    conn: &C,
    id: NotificationId,
    user_id: &str,
) -> anyhow::Result<bool> {
    let result = Entity::update_many()
        .col_expr(Column::IsRead, Expr::value(true))
        .filter(Column::Id.eq(id.as_string()))
        .filter(Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}
