//! Repository traits over the Postgres tables and their `sqlx` implementations.
//!
//! Every read filters out soft-deleted rows.

pub mod history;
#[cfg(test)]
pub mod memory;
pub mod news;
pub mod stocks;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::models::{
    history::{HistoricalStockData, NewHistoricalEntry},
    news::{InfomoneyNews, NewsContent},
    stock::{NewStock, Stock},
};

pub use history::PgHistoryRepository;
pub use news::PgNewsRepository;
pub use stocks::PgStocksRepository;

pub type DbResult<T> = Result<T, sqlx::Error>;

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Some(Duration::from_secs(60)))
}

fn connect_options(db_url: &str) -> DbResult<PgConnectOptions> {
    Ok(PgConnectOptions::from_str(db_url)?.statement_cache_capacity(0))
}

/// Opens the pool and brings the schema up to date.
pub async fn connect(db_url: &str) -> Result<PgPool, Box<dyn std::error::Error>> {
    let pool = pool_options()
        .connect_with(connect_options(db_url)?)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// A pool that only connects on first use.
pub fn connect_lazy(db_url: &str) -> DbResult<PgPool> {
    Ok(pool_options().connect_lazy_with(connect_options(db_url)?))
}

#[async_trait]
pub trait StocksRepository: Send + Sync {
    async fn find_all(&self) -> DbResult<Vec<Stock>>;
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Stock>>;
    async fn find_by_code(&self, code: &str) -> DbResult<Option<Stock>>;
    /// Case-insensitive substring match on the name.
    async fn search_by_name(&self, fragment: &str) -> DbResult<Vec<Stock>>;
    async fn find_without_news_url(&self) -> DbResult<Vec<Stock>>;
    async fn find_with_news_url(&self) -> DbResult<Vec<Stock>>;
    /// Inserts the stocks whose code is not taken yet; returns the inserted rows.
    async fn create_many(&self, stocks: &[NewStock]) -> DbResult<Vec<Stock>>;
    async fn update_company(&self, id: Uuid, company: &str) -> DbResult<Option<Stock>>;
    async fn set_news_url(&self, id: Uuid, url_news: &str) -> DbResult<Option<Stock>>;
    async fn soft_delete(&self, id: Uuid) -> DbResult<bool>;
}

#[async_trait]
pub trait NewsRepository: Send + Sync {
    async fn find_all(&self) -> DbResult<Vec<InfomoneyNews>>;
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<InfomoneyNews>>;
    async fn find_by_url(&self, url: &str) -> DbResult<Vec<InfomoneyNews>>;
    async fn find_by_stock_id(&self, stock_id: Uuid) -> DbResult<Vec<InfomoneyNews>>;
    async fn find_without_date(&self) -> DbResult<Vec<InfomoneyNews>>;
    async fn find_without_content(&self) -> DbResult<Vec<InfomoneyNews>>;
    /// Stores the URLs not yet known for the stock, ignoring repeats in `urls`.
    async fn save_news_urls(&self, stock_id: Uuid, urls: &[String])
        -> DbResult<Vec<InfomoneyNews>>;
    async fn update_content(
        &self,
        id: Uuid,
        content: &NewsContent,
    ) -> DbResult<Option<InfomoneyNews>>;
    async fn soft_delete(&self, id: Uuid) -> DbResult<bool>;
}

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Newest first.
    async fn find_by_stock_id(&self, stock_id: Uuid) -> DbResult<Vec<HistoricalStockData>>;
    /// Oldest first, both ends inclusive.
    async fn find_by_date_range(
        &self,
        stock_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> DbResult<Vec<HistoricalStockData>>;
    async fn find_latest(&self, stock_id: Uuid) -> DbResult<Option<HistoricalStockData>>;
    /// Oldest and newest trading dates stored for the stock.
    async fn date_range(
        &self,
        stock_id: Uuid,
    ) -> DbResult<(Option<NaiveDateTime>, Option<NaiveDateTime>)>;
    async fn save_entries(
        &self,
        entries: &[NewHistoricalEntry],
    ) -> DbResult<Vec<HistoricalStockData>>;
}
