//! In-memory repositories mirroring the Postgres semantics, for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use super::{DbResult, HistoryRepository, NewsRepository, StocksRepository};
use crate::models::{
    history::{HistoricalStockData, NewHistoricalEntry},
    news::{InfomoneyNews, NewsContent},
    stock::{NewStock, Stock},
};

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Ids whose writes fail the way a rejected row does in Postgres.
#[derive(Default)]
struct FailingWrites(Mutex<HashSet<Uuid>>);

impl FailingWrites {
    fn add(&self, id: Uuid) {
        self.0.lock().unwrap().insert(id);
    }

    fn check(&self, id: Uuid) -> DbResult<()> {
        if self.0.lock().unwrap().contains(&id) {
            return Err(sqlx::Error::Protocol(format!(
                "value too long for type character varying (row {id})"
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStocks {
    rows: Mutex<Vec<Stock>>,
    failing: FailingWrites,
}

impl MemoryStocks {
    pub fn with(stocks: Vec<Stock>) -> Self {
        Self {
            rows: Mutex::new(stocks),
            failing: FailingWrites::default(),
        }
    }

    /// Makes every write touching `id` fail.
    pub fn fail_writes_for(&self, id: Uuid) {
        self.failing.add(id);
    }

    pub fn all_rows(&self) -> Vec<Stock> {
        self.rows.lock().unwrap().clone()
    }

    fn active<F>(&self, keep: F) -> Vec<Stock>
    where
        F: Fn(&Stock) -> bool,
    {
        let mut found: Vec<Stock> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.deleted_at.is_none() && keep(s))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.code.cmp(&b.code));
        found
    }

    fn update<F>(&self, id: Uuid, change: F) -> Option<Stock>
    where
        F: FnOnce(&mut Stock),
    {
        let mut rows = self.rows.lock().unwrap();
        let stock = rows
            .iter_mut()
            .find(|s| s.id == id && s.deleted_at.is_none())?;
        change(stock);
        stock.updated_at = Some(now());
        Some(stock.clone())
    }
}

pub fn stock(code: &str, name: &str) -> Stock {
    Stock {
        id: Uuid::new_v4(),
        name: name.to_string(),
        code: code.to_string(),
        company: None,
        url: Some(format!("https://infomoney.com.br/{code}")),
        url_news: None,
        created_at: Some(now()),
        updated_at: Some(now()),
        deleted_at: None,
    }
}

#[async_trait]
impl StocksRepository for MemoryStocks {
    async fn find_all(&self) -> DbResult<Vec<Stock>> {
        Ok(self.active(|_| true))
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Stock>> {
        Ok(self.active(|s| s.id == id).into_iter().next())
    }

    async fn find_by_code(&self, code: &str) -> DbResult<Option<Stock>> {
        Ok(self.active(|s| s.code == code).into_iter().next())
    }

    async fn search_by_name(&self, fragment: &str) -> DbResult<Vec<Stock>> {
        let fragment = fragment.to_lowercase();
        Ok(self.active(|s| s.name.to_lowercase().contains(&fragment)))
    }

    async fn find_without_news_url(&self) -> DbResult<Vec<Stock>> {
        Ok(self.active(|s| s.url_news.as_deref().map_or(true, str::is_empty)))
    }

    async fn find_with_news_url(&self) -> DbResult<Vec<Stock>> {
        Ok(self.active(|s| s.url_news.as_deref().is_some_and(|u| !u.is_empty())))
    }

    async fn create_many(&self, stocks: &[NewStock]) -> DbResult<Vec<Stock>> {
        let mut rows = self.rows.lock().unwrap();
        let mut created = Vec::new();
        for new in stocks {
            let taken = rows
                .iter()
                .any(|s| s.code == new.code && s.deleted_at.is_none());
            if taken {
                continue;
            }
            let stock = Stock {
                id: Uuid::new_v4(),
                name: new.name.clone(),
                code: new.code.clone(),
                company: new.company.clone(),
                url: new.url.clone(),
                url_news: None,
                created_at: Some(now()),
                updated_at: Some(now()),
                deleted_at: None,
            };
            rows.push(stock.clone());
            created.push(stock);
        }
        Ok(created)
    }

    async fn update_company(&self, id: Uuid, company: &str) -> DbResult<Option<Stock>> {
        self.failing.check(id)?;
        Ok(self.update(id, |s| s.company = Some(company.to_string())))
    }

    async fn set_news_url(&self, id: Uuid, url_news: &str) -> DbResult<Option<Stock>> {
        self.failing.check(id)?;
        Ok(self.update(id, |s| s.url_news = Some(url_news.to_string())))
    }

    async fn soft_delete(&self, id: Uuid) -> DbResult<bool> {
        Ok(self.update(id, |s| s.deleted_at = Some(now())).is_some())
    }
}

#[derive(Default)]
pub struct MemoryNews {
    rows: Mutex<Vec<InfomoneyNews>>,
    failing: FailingWrites,
}

impl MemoryNews {
    pub fn with(news: Vec<InfomoneyNews>) -> Self {
        Self {
            rows: Mutex::new(news),
            failing: FailingWrites::default(),
        }
    }

    /// Makes every write touching `id` fail.
    pub fn fail_writes_for(&self, id: Uuid) {
        self.failing.add(id);
    }

    pub fn all_rows(&self) -> Vec<InfomoneyNews> {
        self.rows.lock().unwrap().clone()
    }

    fn active<F>(&self, keep: F) -> Vec<InfomoneyNews>
    where
        F: Fn(&InfomoneyNews) -> bool,
    {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.deleted_at.is_none() && keep(n))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NewsRepository for MemoryNews {
    async fn find_all(&self) -> DbResult<Vec<InfomoneyNews>> {
        Ok(self.active(|_| true))
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<InfomoneyNews>> {
        Ok(self.active(|n| n.id == id).into_iter().next())
    }

    async fn find_by_url(&self, url: &str) -> DbResult<Vec<InfomoneyNews>> {
        Ok(self.active(|n| n.url == url))
    }

    async fn find_by_stock_id(&self, stock_id: Uuid) -> DbResult<Vec<InfomoneyNews>> {
        Ok(self.active(|n| n.stock_id == stock_id))
    }

    async fn find_without_date(&self) -> DbResult<Vec<InfomoneyNews>> {
        Ok(self.active(|n| n.published_date.is_none()))
    }

    async fn find_without_content(&self) -> DbResult<Vec<InfomoneyNews>> {
        Ok(self.active(|n| n.content.as_deref().map_or(true, str::is_empty)))
    }

    async fn save_news_urls(
        &self,
        stock_id: Uuid,
        urls: &[String],
    ) -> DbResult<Vec<InfomoneyNews>> {
        self.failing.check(stock_id)?;
        let mut rows = self.rows.lock().unwrap();
        let mut known: HashSet<String> = rows
            .iter()
            .filter(|n| n.stock_id == stock_id && n.deleted_at.is_none())
            .map(|n| n.url.clone())
            .collect();

        let mut saved = Vec::new();
        for url in urls.iter().filter(|u| !u.is_empty()) {
            if !known.insert(url.clone()) {
                continue;
            }
            let mut news = InfomoneyNews::new(stock_id, url.clone());
            news.created_at = Some(now());
            news.updated_at = news.created_at;
            rows.push(news.clone());
            saved.push(news);
        }
        Ok(saved)
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &NewsContent,
    ) -> DbResult<Option<InfomoneyNews>> {
        self.failing.check(id)?;
        let mut rows = self.rows.lock().unwrap();
        let Some(news) = rows
            .iter_mut()
            .find(|n| n.id == id && n.deleted_at.is_none())
        else {
            return Ok(None);
        };
        news.title = content.title.clone();
        news.content = Some(content.content.clone());
        news.published_date = Some(content.published_date);
        news.updated_at = Some(now());
        Ok(Some(news.clone()))
    }

    async fn soft_delete(&self, id: Uuid) -> DbResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|n| n.id == id && n.deleted_at.is_none())
        {
            Some(news) => {
                news.deleted_at = Some(now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryHistory {
    rows: Mutex<Vec<HistoricalStockData>>,
    failing: FailingWrites,
}

impl MemoryHistory {
    pub fn with(entries: Vec<HistoricalStockData>) -> Self {
        Self {
            rows: Mutex::new(entries),
            failing: FailingWrites::default(),
        }
    }

    /// Makes every write touching `id` fail.
    pub fn fail_writes_for(&self, id: Uuid) {
        self.failing.add(id);
    }

    pub fn all_rows(&self) -> Vec<HistoricalStockData> {
        self.rows.lock().unwrap().clone()
    }

    fn active_for(&self, stock_id: Uuid) -> Vec<HistoricalStockData> {
        let mut found: Vec<HistoricalStockData> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.stock_id == stock_id && h.deleted_at.is_none())
            .cloned()
            .collect();
        found.sort_by_key(|h| h.trading_date);
        found
    }
}

pub fn history_row(stock_id: Uuid, trading_date: NaiveDateTime, variation: &str) -> HistoricalStockData {
    HistoricalStockData {
        id: Uuid::new_v4(),
        stock_id,
        trading_date,
        variation: variation.to_string(),
        open_price: "10,00".to_string(),
        close_price: "10,50".to_string(),
        min_price: "9,90".to_string(),
        max_price: "10,60".to_string(),
        volume: "1,2M".to_string(),
        created_at: Some(now()),
        updated_at: Some(now()),
        deleted_at: None,
    }
}

#[async_trait]
impl HistoryRepository for MemoryHistory {
    async fn find_by_stock_id(&self, stock_id: Uuid) -> DbResult<Vec<HistoricalStockData>> {
        let mut found = self.active_for(stock_id);
        found.reverse();
        Ok(found)
    }

    async fn find_by_date_range(
        &self,
        stock_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> DbResult<Vec<HistoricalStockData>> {
        Ok(self
            .active_for(stock_id)
            .into_iter()
            .filter(|h| h.trading_date >= start && h.trading_date <= end)
            .collect())
    }

    async fn find_latest(&self, stock_id: Uuid) -> DbResult<Option<HistoricalStockData>> {
        Ok(self.active_for(stock_id).pop())
    }

    async fn date_range(
        &self,
        stock_id: Uuid,
    ) -> DbResult<(Option<NaiveDateTime>, Option<NaiveDateTime>)> {
        let found = self.active_for(stock_id);
        Ok((
            found.first().map(|h| h.trading_date),
            found.last().map(|h| h.trading_date),
        ))
    }

    async fn save_entries(
        &self,
        entries: &[NewHistoricalEntry],
    ) -> DbResult<Vec<HistoricalStockData>> {
        for entry in entries {
            self.failing.check(entry.stock_id)?;
        }
        let mut rows = self.rows.lock().unwrap();
        let mut saved = Vec::new();
        for entry in entries {
            let taken = rows.iter().any(|h| {
                h.stock_id == entry.stock_id
                    && h.trading_date == entry.trading_date
                    && h.deleted_at.is_none()
            });
            if taken {
                continue;
            }
            let row = HistoricalStockData {
                id: Uuid::new_v4(),
                stock_id: entry.stock_id,
                trading_date: entry.trading_date,
                variation: entry.variation.clone(),
                open_price: entry.open_price.clone(),
                close_price: entry.close_price.clone(),
                min_price: entry.min_price.clone(),
                max_price: entry.max_price.clone(),
                volume: entry.volume.clone(),
                created_at: Some(now()),
                updated_at: Some(now()),
                deleted_at: None,
            };
            rows.push(row.clone());
            saved.push(row);
        }
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn soft_deleted_stocks_disappear_from_every_read() {
        let mut petr = stock("PETR4", "PETROBRAS PN");
        petr.url_news = Some("https://www.infomoney.com.br/tudo-sobre/petrobras/".to_string());
        let vale = stock("VALE3", "VALE ON");
        let (petr_id, vale_id) = (petr.id, vale.id);
        let repo = MemoryStocks::with(vec![petr, vale]);

        assert!(repo.soft_delete(petr_id).await.unwrap());
        assert!(!repo.soft_delete(petr_id).await.unwrap());

        assert!(repo.find_by_id(petr_id).await.unwrap().is_none());
        assert!(repo.find_by_code("PETR4").await.unwrap().is_none());
        assert!(repo.search_by_name("petro").await.unwrap().is_empty());
        assert!(repo.find_with_news_url().await.unwrap().is_empty());
        let remaining: Vec<Uuid> = repo.find_all().await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(remaining, vec![vale_id]);
        assert!(repo.set_news_url(petr_id, "https://x/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleted_code_can_be_created_again() {
        let petr = stock("PETR4", "PETROBRAS PN");
        let old_id = petr.id;
        let repo = MemoryStocks::with(vec![petr]);
        repo.soft_delete(old_id).await.unwrap();

        let created = repo
            .create_many(&[NewStock {
                name: "PETROBRAS PN".to_string(),
                code: "PETR4".to_string(),
                company: None,
                url: None,
            }])
            .await
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_ne!(created[0].id, old_id);
        assert_eq!(repo.all_rows().len(), 2);
    }

    #[tokio::test]
    async fn soft_deleted_news_is_hidden_and_its_url_reusable() {
        let stock_id = Uuid::new_v4();
        let url = "https://www.infomoney.com.br/mercados/petrobras-lucro/";
        let repo = MemoryNews::default();
        let first = repo.save_news_urls(stock_id, &[url.to_string()]).await.unwrap();
        let old_id = first[0].id;

        assert!(repo.soft_delete(old_id).await.unwrap());

        assert!(repo.find_by_id(old_id).await.unwrap().is_none());
        assert!(repo.find_by_url(url).await.unwrap().is_empty());
        assert!(repo.find_by_stock_id(stock_id).await.unwrap().is_empty());
        assert!(repo.find_without_date().await.unwrap().is_empty());
        assert!(repo.find_without_content().await.unwrap().is_empty());
        assert!(repo.find_all().await.unwrap().is_empty());

        let again = repo.save_news_urls(stock_id, &[url.to_string()]).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_ne!(again[0].id, old_id);
        assert_eq!(repo.find_by_url(url).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_writes_report_a_database_error() {
        let petr = stock("PETR4", "PETROBRAS PN");
        let id = petr.id;
        let repo = MemoryStocks::with(vec![petr]);
        repo.fail_writes_for(id);

        assert!(repo.set_news_url(id, "https://x/").await.is_err());
        assert!(repo.find_by_id(id).await.unwrap().unwrap().url_news.is_none());
    }
}
