use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::{DbResult, HistoryRepository, StocksRepository};
use crate::models::history::HistoricalStockData;
use crate::models::stock::Stock;
use crate::services::InfomoneySource;

pub const ITEMS_PER_PAGE: u32 = 50;
pub const DEFAULT_VARIATION_DAYS: i64 = 30;
pub const MAX_VARIATION_DAYS: i64 = 36_500;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("No historical data available for this stock")]
    NoData,
    #[error("No historical data available for the last {0} days")]
    NoDataInWindow(i64),
    #[error("Error calculating price variation: cannot read '{0}' as a number")]
    Unparseable(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryFetchReport {
    pub stocks_processed: usize,
    pub pages_fetched: u32,
    pub entries_saved: usize,
    pub duplicates_skipped: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceVariation {
    pub days: i64,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub start_price: String,
    pub end_price: String,
    pub absolute_variation: f64,
    pub percentage_variation: f64,
}

/// Fetches `pages` pages of history for every stock with a news hub and
/// stores the trading days not already known. `None` when there is no such stock.
pub async fn fetch_and_save_historical_data(
    stocks: &dyn StocksRepository,
    history: &dyn HistoryRepository,
    source: &dyn InfomoneySource,
    pages: u32,
) -> DbResult<Option<HistoryFetchReport>> {
    let targets = stocks.find_with_news_url().await?;
    if targets.is_empty() {
        warn!("No stocks found to fetch historical data for");
        return Ok(None);
    }

    let mut report = HistoryFetchReport::default();
    for stock in &targets {
        if let Err(e) = fetch_for_stock(history, source, stock, pages, &mut report).await {
            error!("Error processing historical data for {}: {e}", stock.code);
            report.errors.push(format!("{}: {e}", stock.code));
        }
        report.stocks_processed += 1;
    }
    info!("Finished fetching historical data: {report:?}");
    Ok(Some(report))
}

async fn fetch_for_stock(
    history: &dyn HistoryRepository,
    source: &dyn InfomoneySource,
    stock: &Stock,
    pages: u32,
    report: &mut HistoryFetchReport,
) -> DbResult<()> {
    let mut known: HashSet<NaiveDate> = history
        .find_by_stock_id(stock.id)
        .await?
        .iter()
        .map(|entry| entry.trading_date.date())
        .collect();
    info!("Found {} existing dates for stock {}", known.len(), stock.code);

    for page in 0..pages {
        let entries = match source.fetch_history(&stock.code, page, ITEMS_PER_PAGE).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error fetching historical data for {} (page {page}): {e}", stock.code);
                report.errors.push(format!("{}: error on page {page}: {e}", stock.code));
                continue;
            }
        };
        report.pages_fetched += 1;

        let found = entries.len();
        let mut duplicates = 0;
        let mut batch_days = HashSet::new();
        let batch: Vec<_> = entries
            .into_iter()
            .filter_map(|entry| entry.into_new_entry(stock.id))
            .filter(|entry| {
                let day = entry.trading_date.date();
                let fresh = !known.contains(&day) && batch_days.insert(day);
                if !fresh {
                    duplicates += 1;
                }
                fresh
            })
            .collect();

        info!(
            "{} page {page}: found {found} entries, skipped {duplicates} duplicates, saving {}",
            stock.code,
            batch.len()
        );
        report.duplicates_skipped += duplicates;
        if batch.is_empty() {
            continue;
        }
        match history.save_entries(&batch).await {
            Ok(saved) => {
                report.entries_saved += saved.len();
                known.extend(batch_days);
            }
            Err(e) => {
                error!("Error saving historical data for {} (page {page}): {e}", stock.code);
                report.errors.push(format!("{}: could not save page {page}: {e}", stock.code));
            }
        }
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD` or a full ISO-8601 date-time.
pub fn parse_date_param(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Inclusive bounds for a date-range query; the end is pushed to 23:59:59.
pub fn date_range_bounds(start: &str, end: &str) -> Result<(NaiveDateTime, NaiveDateTime), String> {
    let start_at = parse_date_param(start).ok_or_else(|| format!("Invalid date format: '{start}'"))?;
    let end_at = parse_date_param(end).ok_or_else(|| format!("Invalid date format: '{end}'"))?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    Ok((start_at, end_at.date().and_time(end_of_day)))
}

/// Reads a number as InfoMoney prints it. With a decimal comma, dots are
/// thousands separators.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };
    normalized.parse().ok()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Change between the earliest and the latest entry, read from their
/// `variation` values.
pub fn compute_variation(
    earliest: &HistoricalStockData,
    latest: &HistoricalStockData,
    days: i64,
) -> Result<PriceVariation, HistoryError> {
    let start = parse_decimal(&earliest.variation)
        .ok_or_else(|| HistoryError::Unparseable(earliest.variation.clone()))?;
    let end = parse_decimal(&latest.variation)
        .ok_or_else(|| HistoryError::Unparseable(latest.variation.clone()))?;

    let absolute = end - start;
    let percentage = if start != 0.0 {
        absolute / start * 100.0
    } else {
        0.0
    };

    Ok(PriceVariation {
        days,
        start_date: earliest.trading_date,
        end_date: latest.trading_date,
        start_price: earliest.variation.clone(),
        end_price: latest.variation.clone(),
        absolute_variation: round2(absolute),
        percentage_variation: round2(percentage),
    })
}

/// Variation over the `days` before the latest stored trading day. A window
/// reaching past the representable calendar covers all stored history.
pub async fn price_variation(
    history: &dyn HistoryRepository,
    stock_id: uuid::Uuid,
    days: i64,
) -> Result<PriceVariation, HistoryError> {
    let latest = history
        .find_latest(stock_id)
        .await?
        .ok_or(HistoryError::NoData)?;
    let window_start = TimeDelta::try_days(days)
        .and_then(|span| latest.trading_date.checked_sub_signed(span))
        .unwrap_or(NaiveDateTime::MIN);

    let window = history
        .find_by_date_range(stock_id, window_start, latest.trading_date)
        .await?;
    let earliest = window
        .iter()
        .min_by_key(|entry| entry.trading_date)
        .ok_or(HistoryError::NoDataInWindow(days))?;

    compute_variation(earliest, &latest, days)
}
