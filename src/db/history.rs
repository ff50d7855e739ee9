use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DbResult, HistoryRepository};
use crate::models::history::{HistoricalStockData, NewHistoricalEntry};

#[derive(Clone)]
pub struct PgHistoryRepository {
    pool: PgPool,
}

impl PgHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
    async fn find_by_stock_id(&self, stock_id: Uuid) -> DbResult<Vec<HistoricalStockData>> {
        sqlx::query_as::<_, HistoricalStockData>(
            r#"
            SELECT * FROM historical_stock_data
            WHERE stock_id = $1 AND deleted_at IS NULL
            ORDER BY trading_date DESC
            "#,
        )
        .bind(stock_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_by_date_range(
        &self,
        stock_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> DbResult<Vec<HistoricalStockData>> {
        sqlx::query_as::<_, HistoricalStockData>(
            r#"
            SELECT * FROM historical_stock_data
            WHERE stock_id = $1
              AND trading_date >= $2
              AND trading_date <= $3
              AND deleted_at IS NULL
            ORDER BY trading_date
            "#,
        )
        .bind(stock_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_latest(&self, stock_id: Uuid) -> DbResult<Option<HistoricalStockData>> {
        sqlx::query_as::<_, HistoricalStockData>(
            r#"
            SELECT * FROM historical_stock_data
            WHERE stock_id = $1 AND deleted_at IS NULL
            ORDER BY trading_date DESC
            LIMIT 1
            "#,
        )
        .bind(stock_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn date_range(
        &self,
        stock_id: Uuid,
    ) -> DbResult<(Option<NaiveDateTime>, Option<NaiveDateTime>)> {
        sqlx::query_as::<_, (Option<NaiveDateTime>, Option<NaiveDateTime>)>(
            r#"
            SELECT MIN(trading_date), MAX(trading_date) FROM historical_stock_data
            WHERE stock_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(stock_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn save_entries(
        &self,
        entries: &[NewHistoricalEntry],
    ) -> DbResult<Vec<HistoricalStockData>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(entries.len());

        for entry in entries {
            let row = sqlx::query_as::<_, HistoricalStockData>(
                r#"
                INSERT INTO historical_stock_data
                    (id, stock_id, trading_date, variation, open_price, close_price,
                     min_price, max_price, volume)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (stock_id, trading_date) WHERE deleted_at IS NULL DO NOTHING
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(entry.stock_id)
            .bind(entry.trading_date)
            .bind(&entry.variation)
            .bind(&entry.open_price)
            .bind(&entry.close_price)
            .bind(&entry.min_price)
            .bind(&entry.max_price)
            .bind(&entry.volume)
            .fetch_optional(&mut *tx)
            .await?;
            saved.extend(row);
        }

        tx.commit().await?;
        Ok(saved)
    }
}
