//! Everything that talks to InfoMoney.
//!
//! [`InfomoneySource`] is the seam the ingestion jobs depend on;
//! [`InfomoneyClient`] is the HTTP implementation used in production.

pub mod client;
pub mod history;
pub mod html;
pub mod news;
pub mod stocks;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{history::StockHistoryEntry, news::NewsContent, stock::Stock};

pub use client::{InfomoneyClient, InfomoneyEndpoints};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response status: {status} at {url}")]
    Status { status: u16, url: String },

    #[error("Could not parse response from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Missing(String),
}

/// A stock as it appears in the top gainers/losers listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedStock {
    pub code: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockListingPage {
    pub stocks: Vec<ListedStock>,
    pub total_pages: Option<u32>,
}

#[async_trait]
pub trait InfomoneySource: Send + Sync {
    /// One page (1-based) of the stock listing.
    async fn fetch_stock_page(&self, page: u32) -> Result<StockListingPage, FetchError>;

    /// The "tudo sobre" hub linked from the stock's own page, if any.
    async fn fetch_news_hub_url(&self, stock: &Stock) -> Result<Option<String>, FetchError>;

    /// Article URLs listed on the stock's news hub.
    async fn fetch_news_urls(&self, stock: &Stock) -> Result<Vec<String>, FetchError>;

    async fn fetch_article(&self, url: &str) -> Result<NewsContent, FetchError>;

    /// One page (0-based) of the daily quote history for `code`.
    async fn fetch_history(
        &self,
        code: &str,
        page: u32,
        items_per_page: u32,
    ) -> Result<Vec<StockHistoryEntry>, FetchError>;
}
