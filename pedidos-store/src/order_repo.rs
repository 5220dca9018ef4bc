use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use pedidos_core::order::{Order, OrderStatus, OrderValidationError, ServiceKind};
use pedidos_core::repository::{OrderQuery, OrderRepository};

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: &str = "id, user_id, company_id, excursion, service_kind, status, \
     start_date, end_date, delivery_place, pickup_place, notes, voucher, guide, \
     issuers, pax, events, created_at, updated_at";

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    company_id: Uuid,
    excursion: String,
    service_kind: String,
    status: String,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    delivery_place: String,
    pickup_place: String,
    notes: String,
    voucher: String,
    guide: String,
    issuers: Option<i32>,
    pax: i32,
    events: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, Box<dyn std::error::Error + Send + Sync>> {
        let status = OrderStatus::parse(&self.status)
            .ok_or_else(|| OrderValidationError::UnknownStatus(self.status.clone()))?;
        let service_kind = ServiceKind::parse(&self.service_kind)
            .ok_or_else(|| OrderValidationError::UnknownServiceKind(self.service_kind.clone()))?;
        let events = serde_json::from_value(self.events)?;

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            company_id: self.company_id,
            excursion: self.excursion,
            service_kind,
            status,
            start_date: self.start_date,
            end_date: self.end_date,
            delivery_place: self.delivery_place,
            pickup_place: self.pickup_place,
            notes: self.notes,
            voucher: self.voucher,
            guide: self.guide,
            issuers: self.issuers,
            pax: self.pax,
            events,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub(crate) async fn insert_order<'e, E>(
    executor: E,
    order: &Order,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO orders (id, user_id, company_id, excursion, service_kind, status,
            start_date, end_date, delivery_place, pickup_place, notes, voucher, guide,
            issuers, pax, events, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        "#,
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.company_id)
    .bind(&order.excursion)
    .bind(order.service_kind.as_str())
    .bind(order.status.as_str())
    .bind(order.start_date)
    .bind(order.end_date)
    .bind(&order.delivery_place)
    .bind(&order.pickup_place)
    .bind(&order.notes)
    .bind(&order.voucher)
    .bind(&order.guide)
    .bind(order.issuers)
    .bind(order.pax)
    .bind(serde_json::to_value(&order.events).unwrap_or_default())
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        insert_order(&self.pool, order).await?;
        Ok(order.id)
    }

    async fn create_orders(
        &self,
        orders: &[Order],
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;
        for order in orders {
            insert_order(&mut *tx, order).await?;
        }
        tx.commit().await?;
        Ok(orders.len())
    }

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrderRow::into_order).transpose()
    }

    async fn update_order(
        &self,
        order: &Order,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            UPDATE orders
            SET company_id = $2, excursion = $3, service_kind = $4, status = $5,
                start_date = $6, end_date = $7, delivery_place = $8, pickup_place = $9,
                notes = $10, voucher = $11, guide = $12, issuers = $13, pax = $14,
                events = $15, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order.id)
        .bind(order.company_id)
        .bind(&order.excursion)
        .bind(order.service_kind.as_str())
        .bind(order.status.as_str())
        .bind(order.start_date)
        .bind(order.end_date)
        .bind(&order.delivery_place)
        .bind(&order.pickup_place)
        .bind(&order.notes)
        .bind(&order.voucher)
        .bind(&order.guide)
        .bind(order.issuers)
        .bind(order.pax)
        .bind(serde_json::to_value(&order.events)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_orders(
        &self,
        query: &OrderQuery,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1"));

        if let Some(user_id) = query.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if !query.statuses.is_empty() {
            let statuses: Vec<String> = query
                .statuses
                .iter()
                .map(|s| s.as_str().to_string())
                .collect();
            qb.push(" AND status = ANY(").push_bind(statuses).push(")");
        }
        if !query.service_kinds.is_empty() {
            let kinds: Vec<String> = query
                .service_kinds
                .iter()
                .map(|k| k.as_str().to_string())
                .collect();
            qb.push(" AND service_kind = ANY(").push_bind(kinds).push(")");
        }
        if let Some(from) = query.date_from {
            qb.push(" AND start_date >= ").push_bind(from);
        }
        if let Some(to) = query.date_to {
            qb.push(" AND start_date <= ").push_bind(to);
        }

        qb.push(" ORDER BY start_date DESC, created_at DESC, id DESC");

        let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(OrderRow::into_order).collect()
    }
}
