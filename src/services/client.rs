use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use super::{history, news, stocks, FetchError, InfomoneySource, StockListingPage};
use crate::models::{history::StockHistoryEntry, news::NewsContent, stock::Stock};
use crate::utils::rate_limiter::RateLimiter;

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/113.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
];

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const LISTING_PAGE_SIZE: u32 = 15;

const LISTING_URL: &str = "https://api.infomoney.com.br/ativos/top-alta-baixa-por-ativo/acao";
const SITE_URL: &str = "https://www.infomoney.com.br/";
const LISTING_PATH: &str = "ativos/top-alta-baixa-por-ativo/acao";
const HISTORY_PATH: &str = "wp-json/infomoney/v1/quotes/history";

/// Base URLs of the InfoMoney surfaces the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfomoneyEndpoints {
    pub listing: Url,
    pub site: Url,
    pub history: Url,
}

impl InfomoneyEndpoints {
    pub fn infomoney() -> Result<Self, url::ParseError> {
        let site = Url::parse(SITE_URL)?;
        Ok(Self {
            listing: Url::parse(LISTING_URL)?,
            history: site.join(HISTORY_PATH)?,
            site,
        })
    }

    /// Every surface served from one host, as a local mock does.
    pub fn rooted_at(base: &str) -> Result<Self, url::ParseError> {
        let site = Url::parse(&format!("{}/", base.trim_end_matches('/')))?;
        Ok(Self {
            listing: site.join(LISTING_PATH)?,
            history: site.join(HISTORY_PATH)?,
            site,
        })
    }
}

/// Retry behaviour for GET requests.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each one after.
    pub base_delay: Duration,
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            retry_on_status: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    fn retries_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }
}

#[derive(Clone, Debug)]
pub struct InfomoneyClient {
    http: Client,
    endpoints: InfomoneyEndpoints,
    retry: RetryPolicy,
    limiter: RateLimiter,
}

impl InfomoneyClient {
    pub fn new(http: Client, endpoints: InfomoneyEndpoints) -> Self {
        Self {
            http,
            endpoints,
            retry: RetryPolicy::default(),
            limiter: RateLimiter::new(1, 1000).with_jitter(2000),
        }
    }

    /// A reqwest client with the connect and request timeouts used for scraping.
    pub fn http_client() -> Result<Client, reqwest::Error> {
        Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    fn site_referer(&self) -> &str {
        self.endpoints.site.as_str()
    }

    /// Resolves a link found on an InfoMoney page against the site base.
    /// Links that do not lead to a web page are dropped.
    fn absolute_url(&self, href: &str) -> Option<String> {
        let url = self.endpoints.site.join(href.trim()).ok()?;
        matches!(url.scheme(), "http" | "https").then(|| String::from(url))
    }

    async fn get_text(&self, url: &str, referer: &str) -> Result<String, FetchError> {
        let mut attempt = 0u32;
        loop {
            let guard = self.limiter.acquire().await;
            let result = self
                .http
                .get(url)
                .headers(browser_headers(Some(referer)))
                .send()
                .await;
            drop(guard);

            let retryable = match result {
                Ok(resp) if resp.status().is_success() => return Ok(resp.text().await?),
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if !self.retry.retries_status(status) || attempt >= self.retry.max_retries {
                        return Err(FetchError::Status {
                            status,
                            url: url.to_string(),
                        });
                    }
                    format!("status {status}")
                }
                Err(err) => {
                    if !(err.is_connect() || err.is_timeout()) || attempt >= self.retry.max_retries
                    {
                        return Err(err.into());
                    }
                    err.to_string()
                }
            };

            let delay = self.retry.delay(attempt);
            warn!(
                "GET {url} failed ({retryable}), retry {} of {} in {delay:?}",
                attempt + 1,
                self.retry.max_retries
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Headers of an ordinary browser visit, with a rotating user agent.
pub fn browser_headers(referer: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(random_user_agent()),
    );
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

    if let Some(value) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
        headers.insert(header::REFERER, value);
    }
    headers
}

/// Browser headers plus the ones the quote history XHR sends.
fn history_headers(referer: &str, origin: &str) -> HeaderMap {
    let mut headers = browser_headers(Some(referer));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
    );
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(header::ORIGIN, value);
    }
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
    headers.insert(
        "x-requested-with",
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers
}

#[async_trait]
impl InfomoneySource for InfomoneyClient {
    async fn fetch_stock_page(&self, page: u32) -> Result<StockListingPage, FetchError> {
        let mut url = self.endpoints.listing.clone();
        url.query_pairs_mut()
            .append_pair("sector", "Todos")
            .append_pair("orderAtributte", "Volume")
            .append_pair("pageIndex", &page.to_string())
            .append_pair("pageSize", &LISTING_PAGE_SIZE.to_string());
        info!("Fetching stock listing page {page}");
        let body = self.get_text(url.as_str(), self.site_referer()).await?;
        Ok(stocks::parse_listing(&body))
    }

    async fn fetch_news_hub_url(&self, stock: &Stock) -> Result<Option<String>, FetchError> {
        let url = stock
            .url
            .as_deref()
            .ok_or_else(|| FetchError::Missing(format!("Stock {} has no page url", stock.code)))?;
        debug!("Looking for the news hub of {} at {url}", stock.code);
        let body = self.get_text(url, self.site_referer()).await?;
        Ok(news::parse_news_hub_url(&body).and_then(|href| self.absolute_url(&href)))
    }

    async fn fetch_news_urls(&self, stock: &Stock) -> Result<Vec<String>, FetchError> {
        let url = stock
            .url_news
            .as_deref()
            .ok_or_else(|| FetchError::Missing(format!("Stock {} has no news url", stock.code)))?;
        debug!("Collecting news links of {} from {url}", stock.code);
        let body = self.get_text(url, self.site_referer()).await?;
        Ok(news::parse_news_urls(&body)
            .iter()
            .filter_map(|href| self.absolute_url(href))
            .collect())
    }

    async fn fetch_article(&self, url: &str) -> Result<NewsContent, FetchError> {
        let body = self.get_text(url, self.site_referer()).await?;
        news::parse_article(&body, url)
    }

    async fn fetch_history(
        &self,
        code: &str,
        page: u32,
        items_per_page: u32,
    ) -> Result<Vec<StockHistoryEntry>, FetchError> {
        let referer = self
            .endpoints
            .site
            .join(&format!("cotacoes/b3/acao/{}/historico/", code.to_lowercase()))?;
        let origin = self.endpoints.site.origin().ascii_serialization();
        let form = [
            ("page", page.to_string()),
            ("numberItems", items_per_page.to_string()),
            ("symbol", code.to_string()),
        ];

        info!("Fetching historical data for {code} (page {page})");
        let guard = self.limiter.acquire().await;
        let resp = self
            .http
            .post(self.endpoints.history.clone())
            .headers(history_headers(referer.as_str(), &origin))
            .form(&form)
            .send()
            .await?;
        drop(guard);

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
                url: self.endpoints.history.to_string(),
            });
        }
        let body = resp.text().await?;
        history::parse_history(&body).map_err(|e| FetchError::Parse {
            url: self.endpoints.history.to_string(),
            reason: e.to_string(),
        })
    }
}
