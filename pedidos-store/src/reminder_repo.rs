use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use pedidos_core::reminder::ReminderFilter;
use pedidos_core::repository::ReminderRepository;
use pedidos_core::Reminder;

pub struct StoreReminderRepository {
    pool: PgPool,
}

impl StoreReminderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReminderRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    note: String,
    due_at: DateTime<Utc>,
    done: bool,
    created_at: DateTime<Utc>,
}

impl From<ReminderRow> for Reminder {
    fn from(row: ReminderRow) -> Self {
        Reminder {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            note: row.note,
            due_at: row.due_at,
            done: row.done,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ReminderRepository for StoreReminderRepository {
    async fn create_reminder(
        &self,
        reminder: &Reminder,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "INSERT INTO reminders (id, user_id, title, note, due_at, done, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(reminder.id)
        .bind(reminder.user_id)
        .bind(&reminder.title)
        .bind(&reminder.note)
        .bind(reminder.due_at)
        .bind(reminder.done)
        .bind(reminder.created_at)
        .execute(&self.pool)
        .await?;
        Ok(reminder.id)
    }

    async fn get_reminder(
        &self,
        id: Uuid,
    ) -> Result<Option<Reminder>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, ReminderRow>(
            "SELECT id, user_id, title, note, due_at, done, created_at \
             FROM reminders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Reminder::from))
    }

    async fn update_reminder(
        &self,
        reminder: &Reminder,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "UPDATE reminders SET title = $2, note = $3, due_at = $4, done = $5 WHERE id = $1",
        )
        .bind(reminder.id)
        .bind(&reminder.title)
        .bind(&reminder.note)
        .bind(reminder.due_at)
        .bind(reminder.done)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_reminder(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query("DELETE FROM reminders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_reminders(
        &self,
        user_id: Uuid,
        filter: &ReminderFilter,
    ) -> Result<Vec<Reminder>, Box<dyn std::error::Error + Send + Sync>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, user_id, title, note, due_at, done, created_at \
             FROM reminders WHERE user_id = ",
        );
        qb.push_bind(user_id);

        if let Some(done) = filter.done {
            qb.push(" AND done = ").push_bind(done);
        }
        if filter.overdue {
            qb.push(" AND done = FALSE AND due_at < NOW()");
        }
        if let Some(q) = &filter.query {
            let pattern = format!("%{}%", q);
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR note ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(from) = filter.due_from {
            qb.push(" AND due_at >= ").push_bind(from);
        }
        if let Some(to) = filter.due_to {
            qb.push(" AND due_at <= ").push_bind(to);
        }

        // Open reminders first, then by due date, id as a stable tiebreak
        qb.push(" ORDER BY done ASC, due_at ASC, id ASC");

        let rows: Vec<ReminderRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Reminder::from).collect())
    }
}
