use std::collections::HashSet;

use tracing::{error, info, warn};

use super::JobReport;
use crate::db::{DbResult, NewsRepository, StocksRepository};
use crate::models::{char_prefix, news::NewsContent};
use crate::services::InfomoneySource;

const TITLE_MAX_CHARS: usize = 255;

/// Finds and stores the news hub URL of every stock that lacks one.
pub async fn save_url_news_stock(
    stocks: &dyn StocksRepository,
    source: &dyn InfomoneySource,
) -> DbResult<JobReport> {
    let pending = stocks.find_without_news_url().await?;
    if pending.is_empty() {
        warn!("No stocks found to fetch news URLs for");
    }
    info!("Looking up news hubs for {} stocks", pending.len());

    let mut report = JobReport::default();
    for stock in pending {
        report.processed += 1;
        match source.fetch_news_hub_url(&stock).await {
            Ok(Some(url)) => match stocks.set_news_url(stock.id, &url).await {
                Ok(_) => {
                    report.saved += 1;
                    info!("Saved news hub {url} for stock {}", stock.code);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Error saving news hub {url} for stock {}: {e}", stock.code);
                }
            },
            Ok(None) => info!("No news hub found for stock {}", stock.code),
            Err(e) => {
                report.failed += 1;
                error!("Error fetching news hub for stock {}: {e}", stock.code);
            }
        }
    }

    info!("Finished saving news hub URLs: {report:?}");
    Ok(report)
}

/// Collects the article links of every stock hub and stores the new ones.
pub async fn save_infomoney_news(
    stocks: &dyn StocksRepository,
    news: &dyn NewsRepository,
    source: &dyn InfomoneySource,
) -> DbResult<JobReport> {
    let with_hub = stocks.find_with_news_url().await?;
    if with_hub.is_empty() {
        warn!("No stocks found to fetch news for");
    }
    info!("Fetching news links for {} stocks", with_hub.len());

    let mut report = JobReport::default();
    for stock in with_hub {
        report.processed += 1;
        let urls = match source.fetch_news_urls(&stock).await {
            Ok(urls) => urls,
            Err(e) => {
                report.failed += 1;
                error!("Error fetching news urls for stock {}: {e}", stock.code);
                continue;
            }
        };
        if urls.is_empty() {
            info!("No news found for stock {}", stock.code);
            continue;
        }

        let saved = match news.save_news_urls(stock.id, &urls).await {
            Ok(saved) => saved,
            Err(e) => {
                report.failed += 1;
                error!("Error saving news links for stock {}: {e}", stock.code);
                continue;
            }
        };
        report.saved += saved.len();
        info!(
            "Stock {}: {} links found, {} new",
            stock.code,
            urls.len(),
            saved.len()
        );
    }

    info!("Finished saving news links: {report:?}");
    Ok(report)
}

/// Fetches every article still missing its publication date and fills
/// title, content and date on all records sharing that URL.
///
/// `processed`/`saved`/`failed` count distinct URLs.
pub async fn update_news_content(
    news: &dyn NewsRepository,
    source: &dyn InfomoneySource,
) -> DbResult<JobReport> {
    let mut seen = HashSet::new();
    let urls: Vec<String> = news
        .find_without_date()
        .await?
        .into_iter()
        .map(|record| record.url)
        .filter(|url| seen.insert(url.clone()))
        .collect();
    info!("Updating content of {} news articles", urls.len());

    let mut report = JobReport::default();
    for url in urls {
        report.processed += 1;
        let mut content = match source.fetch_article(&url).await {
            Ok(content) => content,
            Err(e) => {
                report.failed += 1;
                error!("Error fetching content for news article at {url}: {e}");
                continue;
            }
        };
        if content.content.trim().is_empty() {
            report.failed += 1;
            warn!("Could not find content for news article at {url}");
            continue;
        }
        content.title = content
            .title
            .map(|title| char_prefix(&title, TITLE_MAX_CHARS).to_string());

        match store_content(news, &url, &content).await {
            Ok(()) => report.saved += 1,
            Err(e) => {
                report.failed += 1;
                error!("Error saving content for news article at {url}: {e}");
            }
        }
    }

    match news.find_without_content().await {
        Ok(still_empty) => info!(
            "Finished updating news content: {report:?}, {} articles still without content",
            still_empty.len()
        ),
        Err(e) => info!("Finished updating news content: {report:?} ({e})"),
    }
    Ok(report)
}

async fn store_content(news: &dyn NewsRepository, url: &str, content: &NewsContent) -> DbResult<()> {
    for record in news.find_by_url(url).await? {
        news.update_content(record.id, content).await?;
    }
    Ok(())
}
