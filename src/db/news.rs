use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DbResult, NewsRepository};
use crate::models::news::{InfomoneyNews, NewsContent};

#[derive(Clone)]
pub struct PgNewsRepository {
    pool: PgPool,
}

impl PgNewsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NewsRepository for PgNewsRepository {
    async fn find_all(&self) -> DbResult<Vec<InfomoneyNews>> {
        sqlx::query_as::<_, InfomoneyNews>(
            r#"
            SELECT * FROM infomoney_news
            WHERE deleted_at IS NULL
            ORDER BY published_date DESC NULLS LAST, created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<InfomoneyNews>> {
        sqlx::query_as::<_, InfomoneyNews>(
            "SELECT * FROM infomoney_news WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_url(&self, url: &str) -> DbResult<Vec<InfomoneyNews>> {
        sqlx::query_as::<_, InfomoneyNews>(
            "SELECT * FROM infomoney_news WHERE url = $1 AND deleted_at IS NULL",
        )
        .bind(url)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_by_stock_id(&self, stock_id: Uuid) -> DbResult<Vec<InfomoneyNews>> {
        sqlx::query_as::<_, InfomoneyNews>(
            r#"
            SELECT * FROM infomoney_news
            WHERE stock_id = $1 AND deleted_at IS NULL
            ORDER BY published_date DESC NULLS LAST, created_at DESC
            "#,
        )
        .bind(stock_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_without_date(&self) -> DbResult<Vec<InfomoneyNews>> {
        sqlx::query_as::<_, InfomoneyNews>(
            r#"
            SELECT * FROM infomoney_news
            WHERE published_date IS NULL AND deleted_at IS NULL
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn find_without_content(&self) -> DbResult<Vec<InfomoneyNews>> {
        sqlx::query_as::<_, InfomoneyNews>(
            r#"
            SELECT * FROM infomoney_news
            WHERE (content IS NULL OR content = '') AND deleted_at IS NULL
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn save_news_urls(
        &self,
        stock_id: Uuid,
        urls: &[String],
    ) -> DbResult<Vec<InfomoneyNews>> {
        let mut tx = self.pool.begin().await?;
        let mut seen = HashSet::new();
        let mut saved = Vec::new();

        for url in urls.iter().filter(|u| !u.is_empty()) {
            if !seen.insert(url.as_str()) {
                continue;
            }
            let row = sqlx::query_as::<_, InfomoneyNews>(
                r#"
                INSERT INTO infomoney_news (id, url, stock_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (stock_id, url) WHERE deleted_at IS NULL DO NOTHING
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(url)
            .bind(stock_id)
            .fetch_optional(&mut *tx)
            .await?;
            saved.extend(row);
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &NewsContent,
    ) -> DbResult<Option<InfomoneyNews>> {
        sqlx::query_as::<_, InfomoneyNews>(
            r#"
            UPDATE infomoney_news
            SET title = $2, content = $3, published_date = $4, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&content.title)
        .bind(&content.content)
        .bind(content.published_date)
        .fetch_optional(&self.pool)
        .await
    }

    async fn soft_delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE infomoney_news SET deleted_at = now(), updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
