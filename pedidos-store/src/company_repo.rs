use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use pedidos_core::repository::CompanyRepository;
use pedidos_core::Company;

pub struct StoreCompanyRepository {
    pool: PgPool,
}

impl StoreCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Company {
            id: row.id,
            name: row.name,
        }
    }
}

#[async_trait]
impl CompanyRepository for StoreCompanyRepository {
    async fn get_company(
        &self,
        id: Uuid,
    ) -> Result<Option<Company>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, CompanyRow>("SELECT id, name FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Company::from))
    }

    async fn list_companies(
        &self,
    ) -> Result<Vec<Company>, Box<dyn std::error::Error + Send + Sync>> {
        let rows =
            sqlx::query_as::<_, CompanyRow>("SELECT id, name FROM companies ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Company::from).collect())
    }
}
