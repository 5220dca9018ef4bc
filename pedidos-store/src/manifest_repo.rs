use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use pedidos_core::manifest::{
    cruise_order, plan_batch, BatchPlan, BatchReport, GroupKey, ManifestRow, ManifestStatus,
    NewRow,
};
use pedidos_core::repository::{CompanionOrders, ManifestRepository};

use crate::order_repo::insert_order;

pub struct StoreManifestRepository {
    pool: PgPool,
}

impl StoreManifestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ROW_COLUMNS: &str = "id, printed_at, supplier, emergency_contact, service_date, ship, \
     sign, excursion, language, pax, arrival_time, status, terminal, uploaded_at, updated_at";

// Columns the GET ordering parameter may name. Anything else falls back
// to the default ordering.
const ORDERABLE: [&str; 12] = [
    "printed_at",
    "supplier",
    "service_date",
    "ship",
    "sign",
    "excursion",
    "language",
    "pax",
    "arrival_time",
    "status",
    "terminal",
    "uploaded_at",
];

const DEFAULT_ORDER: &str = "updated_at DESC, uploaded_at DESC";

fn order_clause(ordering: &[String]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    let mut parts: Vec<String> = Vec::new();
    for field in ordering {
        let (name, dir) = match field.strip_prefix('-') {
            Some(rest) => (rest, "DESC"),
            None => (field.as_str(), "ASC"),
        };
        let name = name.trim();
        if !ORDERABLE.contains(&name) && name != "updated_at" {
            tracing::warn!("invalid ordering field '{}', using default", name);
            return DEFAULT_ORDER.to_string();
        }
        if seen.contains(&name) {
            continue;
        }
        seen.push(name);
        parts.push(format!("{name} {dir}"));
    }
    if parts.is_empty() {
        DEFAULT_ORDER.to_string()
    } else {
        parts.join(", ")
    }
}

#[derive(sqlx::FromRow)]
struct ManifestRowRow {
    id: Uuid,
    printed_at: DateTime<Utc>,
    supplier: String,
    emergency_contact: String,
    service_date: NaiveDate,
    ship: String,
    sign: String,
    excursion: String,
    language: String,
    pax: i32,
    arrival_time: Option<NaiveTime>,
    status: String,
    terminal: String,
    uploaded_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ManifestRowRow {
    fn into_row(self) -> Result<ManifestRow, Box<dyn std::error::Error + Send + Sync>> {
        let status = ManifestStatus::parse(&self.status)
            .ok_or_else(|| format!("stored manifest row {} has status '{}'", self.id, self.status))?;
        Ok(ManifestRow {
            id: self.id,
            printed_at: self.printed_at,
            supplier: self.supplier,
            emergency_contact: self.emergency_contact,
            service_date: self.service_date,
            ship: self.ship,
            sign: self.sign,
            excursion: self.excursion,
            language: self.language,
            pax: self.pax,
            arrival_time: self.arrival_time,
            status,
            terminal: self.terminal,
            uploaded_at: self.uploaded_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl ManifestRepository for StoreManifestRepository {
    async fn list_rows(
        &self,
        ordering: &[String],
    ) -> Result<Vec<ManifestRow>, Box<dyn std::error::Error + Send + Sync>> {
        let sql = format!(
            "SELECT {ROW_COLUMNS} FROM manifest_rows ORDER BY {}",
            order_clause(ordering)
        );
        let rows: Vec<ManifestRowRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(ManifestRowRow::into_row).collect()
    }

    async fn bulk_upsert(
        &self,
        groups: Vec<(GroupKey, Vec<NewRow>)>,
        printed_at: DateTime<Utc>,
        companion: Option<CompanionOrders>,
    ) -> Result<BatchReport, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        // Settle every group decision before touching any rows
        let mut final_keys: HashSet<GroupKey> = HashSet::new();
        for (key, _) in &groups {
            let final_exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM manifest_rows \
                 WHERE service_date = $1 AND ship = $2 AND lower(status) = 'final')",
            )
            .bind(key.service_date)
            .bind(&key.ship)
            .fetch_one(&mut *tx)
            .await?;
            if final_exists {
                final_keys.insert(key.clone());
            }
        }

        let BatchPlan {
            replacements,
            mut report,
        } = plan_batch(groups, |key| final_keys.contains(key));

        for (key, rows) in replacements {
            let deleted = sqlx::query(
                "DELETE FROM manifest_rows WHERE service_date = $1 AND ship = $2",
            )
            .bind(key.service_date)
            .bind(&key.ship)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            report.overwritten += deleted as usize;

            for new_row in &rows {
                let row = new_row.clone().into_manifest_row(printed_at);
                sqlx::query(
                    r#"
                    INSERT INTO manifest_rows (id, printed_at, supplier, emergency_contact,
                        service_date, ship, sign, excursion, language, pax, arrival_time,
                        status, terminal, uploaded_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                    "#,
                )
                .bind(row.id)
                .bind(row.printed_at)
                .bind(&row.supplier)
                .bind(&row.emergency_contact)
                .bind(row.service_date)
                .bind(&row.ship)
                .bind(&row.sign)
                .bind(&row.excursion)
                .bind(&row.language)
                .bind(row.pax)
                .bind(row.arrival_time)
                .bind(row.status.as_str())
                .bind(&row.terminal)
                .bind(row.uploaded_at)
                .bind(row.updated_at)
                .execute(&mut *tx)
                .await?;
            }

            if let Some(companion) = &companion {
                for new_row in &rows {
                    let order = cruise_order(
                        new_row,
                        companion.user_id,
                        companion.company_id,
                        companion.status,
                        printed_at,
                    );
                    insert_order(&mut *tx, &order).await?;
                    report.created_orders += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(report)
    }
}
