use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::{
    db::{HistoryRepository, StocksRepository},
    domain::history::{
        date_range_bounds, fetch_and_save_historical_data, price_variation,
        DEFAULT_VARIATION_DAYS, MAX_VARIATION_DAYS,
    },
    models::{error::Error, history::HistoricalStockData, iso_or_null, stock::Stock},
    utils::state::AppState,
};

#[derive(Deserialize)]
pub struct FetchQuery {
    pages: Option<u32>,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Deserialize)]
pub struct VariationQuery {
    days: Option<i64>,
}

async fn stock_by_code(state: &AppState, code: &str) -> Result<Stock, Error> {
    state
        .stocks()
        .find_by_code(code)
        .await?
        .ok_or_else(|| Error::not_found(&format!("Stock with code {code} not found")))
}

fn history_list(entries: &[HistoricalStockData]) -> Vec<Value> {
    entries.iter().map(HistoricalStockData::to_json).collect()
}

pub async fn fetch_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FetchQuery>,
) -> Result<Json<Value>, Error> {
    let pages = params.pages.unwrap_or(1).max(1);
    info!("Fetching {pages} pages of historical data");

    let result = fetch_and_save_historical_data(
        &state.stocks(),
        &state.history(),
        &state.infomoney,
        pages,
    )
    .await;

    match result {
        Ok(Some(report)) => Ok(Json(json!({
            "success": true,
            "stocks_processed": report.stocks_processed,
            "pages_fetched": report.pages_fetched,
            "entries_saved": report.entries_saved,
            "duplicates_skipped": report.duplicates_skipped,
            "errors": report.errors,
        }))),
        Ok(None) => Err(Error::not_found("No stocks found")),
        Err(e) => {
            error!("Error fetching historical data: {e}");
            Err(Error::internal(&format!("Error fetching historical data: {e}")))
        }
    }
}

pub async fn history_by_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Value>, Error> {
    let bounds = match (params.start_date.as_deref(), params.end_date.as_deref()) {
        (Some(start), Some(end)) => Some(
            date_range_bounds(start, end).map_err(|msg| Error::bad_request(&msg))?,
        ),
        _ => None,
    };

    let stock = stock_by_code(&state, &code).await?;
    let history = state.history();

    let Some((start, end)) = bounds else {
        let entries = history.find_by_stock_id(stock.id).await?;
        return Ok(Json(json!({
            "success": true,
            "stock": stock.to_json(),
            "history": history_list(&entries),
        })));
    };

    let entries = history.find_by_date_range(stock.id, start, end).await?;
    Ok(Json(json!({
        "success": true,
        "stock": stock.to_json(),
        "date_range": {
            "start": params.start_date,
            "end": params.end_date,
        },
        "history": history_list(&entries),
        "count": entries.len(),
    })))
}

pub async fn latest_price(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Value>, Error> {
    let stock = stock_by_code(&state, &code).await?;
    let latest = state
        .history()
        .find_latest(stock.id)
        .await?
        .ok_or_else(|| Error::not_found(&format!("No historical data found for stock {code}")))?;
    Ok(Json(json!({
        "success": true,
        "stock": stock.to_json(),
        "latest_price": latest.to_json(),
    })))
}

pub async fn variation(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(params): Query<VariationQuery>,
) -> Result<Json<Value>, Error> {
    let days = params.days.unwrap_or(DEFAULT_VARIATION_DAYS);
    if !(1..=MAX_VARIATION_DAYS).contains(&days) {
        return Err(Error::bad_request(&format!(
            "days must be between 1 and {MAX_VARIATION_DAYS}"
        )));
    }

    let stock = stock_by_code(&state, &code).await?;
    let variation = price_variation(&state.history(), stock.id, days).await?;

    Ok(Json(json!({
        "success": true,
        "stock": stock.to_json(),
        "stock_id": stock.id,
        "days": variation.days,
        "start_date": iso_or_null(Some(variation.start_date)),
        "end_date": iso_or_null(Some(variation.end_date)),
        "start_price": variation.start_price,
        "end_price": variation.end_price,
        "absolute_variation": variation.absolute_variation,
        "percentage_variation": variation.percentage_variation,
    })))
}

pub async fn date_range(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Value>, Error> {
    let stock = stock_by_code(&state, &code).await?;
    let (oldest, newest) = state.history().date_range(stock.id).await?;
    Ok(Json(json!({
        "success": true,
        "stock": stock.to_json(),
        "date_range": {
            "oldest_date": iso_or_null(oldest),
            "newest_date": iso_or_null(newest),
            "has_data": oldest.is_some() && newest.is_some(),
        },
    })))
}
