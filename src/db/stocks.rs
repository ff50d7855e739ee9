use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DbResult, StocksRepository};
use crate::models::stock::{NewStock, Stock};

#[derive(Clone)]
pub struct PgStocksRepository {
    pool: PgPool,
}

impl PgStocksRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StocksRepository for PgStocksRepository {
    async fn find_all(&self) -> DbResult<Vec<Stock>> {
        sqlx::query_as::<_, Stock>(
            "SELECT * FROM stocks WHERE deleted_at IS NULL ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Stock>> {
        sqlx::query_as::<_, Stock>("SELECT * FROM stocks WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_by_code(&self, code: &str) -> DbResult<Option<Stock>> {
        sqlx::query_as::<_, Stock>(
            "SELECT * FROM stocks WHERE code = $1 AND deleted_at IS NULL",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn search_by_name(&self, fragment: &str) -> DbResult<Vec<Stock>> {
        sqlx::query_as::<_, Stock>(
            r#"
            SELECT * FROM stocks
            WHERE name ILIKE '%' || $1 || '%' AND deleted_at IS NULL
            ORDER BY code
            "#,
        )
        .bind(fragment)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_without_news_url(&self) -> DbResult<Vec<Stock>> {
        sqlx::query_as::<_, Stock>(
            r#"
            SELECT * FROM stocks
            WHERE (url_news IS NULL OR url_news = '') AND deleted_at IS NULL
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn find_with_news_url(&self) -> DbResult<Vec<Stock>> {
        sqlx::query_as::<_, Stock>(
            r#"
            SELECT * FROM stocks
            WHERE url_news IS NOT NULL AND url_news <> '' AND deleted_at IS NULL
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn create_many(&self, stocks: &[NewStock]) -> DbResult<Vec<Stock>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(stocks.len());

        for stock in stocks {
            let row = sqlx::query_as::<_, Stock>(
                r#"
                INSERT INTO stocks (id, name, code, company, url)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (code) WHERE deleted_at IS NULL DO NOTHING
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&stock.name)
            .bind(&stock.code)
            .bind(&stock.company)
            .bind(&stock.url)
            .fetch_optional(&mut *tx)
            .await?;
            created.extend(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn update_company(&self, id: Uuid, company: &str) -> DbResult<Option<Stock>> {
        sqlx::query_as::<_, Stock>(
            r#"
            UPDATE stocks SET company = $2, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(company)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_news_url(&self, id: Uuid, url_news: &str) -> DbResult<Option<Stock>> {
        sqlx::query_as::<_, Stock>(
            r#"
            UPDATE stocks SET url_news = $2, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(url_news)
        .fetch_optional(&self.pool)
        .await
    }

    async fn soft_delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE stocks SET deleted_at = now(), updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
