use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{history::StockHistoryEntry, news::NewsContent, stock::Stock};
use crate::services::{FetchError, InfomoneySource, StockListingPage};

/// Canned InfoMoney responses keyed by page, stock code or URL. Anything not
/// registered fails with a 404 status error.
#[derive(Default)]
pub struct FakeSource {
    pub pages: HashMap<u32, StockListingPage>,
    pub hubs: HashMap<String, Option<String>>,
    pub news_urls: HashMap<String, Vec<String>>,
    pub articles: HashMap<String, NewsContent>,
    pub history: HashMap<(String, u32), Vec<StockHistoryEntry>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSource {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn missing(what: &str) -> FetchError {
        FetchError::Status {
            status: 404,
            url: what.to_string(),
        }
    }
}

#[async_trait]
impl InfomoneySource for FakeSource {
    async fn fetch_stock_page(&self, page: u32) -> Result<StockListingPage, FetchError> {
        self.record(format!("page {page}"));
        self.pages
            .get(&page)
            .cloned()
            .ok_or_else(|| Self::missing(&format!("page {page}")))
    }

    async fn fetch_news_hub_url(&self, stock: &Stock) -> Result<Option<String>, FetchError> {
        self.record(format!("hub {}", stock.code));
        self.hubs
            .get(&stock.code)
            .cloned()
            .ok_or_else(|| Self::missing(&stock.code))
    }

    async fn fetch_news_urls(&self, stock: &Stock) -> Result<Vec<String>, FetchError> {
        self.record(format!("news {}", stock.code));
        self.news_urls
            .get(&stock.code)
            .cloned()
            .ok_or_else(|| Self::missing(&stock.code))
    }

    async fn fetch_article(&self, url: &str) -> Result<NewsContent, FetchError> {
        self.record(format!("article {url}"));
        self.articles
            .get(url)
            .cloned()
            .ok_or_else(|| Self::missing(url))
    }

    async fn fetch_history(
        &self,
        code: &str,
        page: u32,
        _items_per_page: u32,
    ) -> Result<Vec<StockHistoryEntry>, FetchError> {
        self.record(format!("history {code} {page}"));
        self.history
            .get(&(code.to_string(), page))
            .cloned()
            .ok_or_else(|| Self::missing(code))
    }
}
