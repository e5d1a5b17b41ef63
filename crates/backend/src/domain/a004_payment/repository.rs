use contracts::domain::a002_delivery::aggregate::DeliveryId;
use contracts::domain::a004_payment::aggregate::{Payment, PaymentId};
use contracts::domain::common::AggregateId;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a004_payment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub delivery_id: String,
    pub recipient_id: String,
    pub payment_type: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Payment {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from_string(&m.id).map_err(anyhow::Error::msg)?,
            delivery_id: DeliveryId::from_string(&m.delivery_id).map_err(anyhow::Error::msg)?,
            recipient_id: m.recipient_id,
            payment_type: m.payment_type.parse().map_err(anyhow::Error::msg)?,
            amount_cents: m.amount_cents,
            currency: m.currency,
            status: m.status.parse().map_err(anyhow::Error::msg)?,
            created_at: m.created_at,
        })
    }
}

/// Вставка платежа, если записи с тем же (delivery, recipient, type) ещё нет.
/// Возвращает `false`, когда платёж уже существовал.
pub async fn create_if_absent<C: ConnectionTrait>(conn: &C, payment: &Payment) -> anyhow::Result<bool> {
    let active = ActiveModel {
        id: Set(payment.id.as_string()),
        delivery_id: Set(payment.delivery_id.as_string()),
        recipient_id: Set(payment.recipient_id.clone()),
        payment_type: Set(payment.payment_type.as_str().to_string()),
        amount_cents: Set(payment.amount_cents),
        currency: Set(payment.currency.clone()),
        status: Set(payment.status.as_str().to_string()),
        created_at: Set(payment.created_at),
    };
    let inserted = Entity::insert(active)
        .on_conflict(
            OnConflict::columns([Column::DeliveryId, Column::RecipientId, Column::PaymentType])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(inserted == 1)
}

pub async fn list_for_recipient<C: ConnectionTrait>(
    conn: &C,
    recipient_id: &str,
) -> anyhow::Result<Vec<Payment>> {
    Entity::find()
        .filter(Column::RecipientId.eq(recipient_id))
        .order_by_desc(Column::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(Payment::try_from)
        .collect()
}

pub async fn list_for_delivery<C: ConnectionTrait>(
    conn: &C,
    delivery_id: DeliveryId,
) -> anyhow::Result<Vec<Payment>> {
    Entity::find()
        .filter(Column::DeliveryId.eq(delivery_id.as_string()))
        .all(conn)
        .await?
        .into_iter()
        .map(Payment::try_from)
        .collect()
}

pub async fn list_all<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<Payment>> {
    Entity::find()
        .order_by_desc(Column::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(Payment::try_from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;
    use chrono::Utc;
    use contracts::domain::a004_payment::aggregate::PaymentStatus;

    #[tokio::test]
    async fn second_insert_for_same_key_is_ignored() {
        let db = connect_in_memory().await.unwrap();
        let delivery = DeliveryId::new_v4();
        let first = Payment::pending_delivery_payment(delivery, "d-1".into(), 1200, Utc::now());
        let second = Payment::pending_delivery_payment(delivery, "d-1".into(), 9999, Utc::now());

        assert!(create_if_absent(&db, &first).await.unwrap());
        assert!(!create_if_absent(&db, &second).await.unwrap());

        let payments = list_for_delivery(&db, delivery).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount_cents, 1200);
        assert_eq!(payments[0].status, PaymentStatus::Pending);
        assert_eq!(payments[0].currency, "EUR");
        assert_eq!(list_for_recipient(&db, "d-1").await.unwrap().len(), 1);
    }
}
