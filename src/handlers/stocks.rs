use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::{
    db::StocksRepository,
    domain::stocks::{fetch_and_save_stocks, save_stocks},
    models::{
        error::Error,
        stock::{CreateStocksRequest, Stock},
    },
    utils::state::AppState,
};

#[derive(Deserialize)]
pub struct StockQuery {
    name: Option<String>,
}

fn stock_list(stocks: &[Stock]) -> Vec<Value> {
    stocks.iter().map(Stock::to_json).collect()
}

pub async fn list_stocks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StockQuery>,
) -> Result<Json<Value>, Error> {
    let repo = state.stocks();
    let stocks = match params.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => repo.search_by_name(name).await?,
        None => repo.find_all().await?,
    };
    Ok(Json(json!({"success": true, "stocks": stock_list(&stocks)})))
}

pub async fn create_stocks(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateStocksRequest>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    let inputs = payload
        .ok()
        .and_then(|Json(body)| body.stocks)
        .ok_or_else(|| Error::bad_request("No stocks data provided"))?;

    let created = save_stocks(&state.stocks(), &inputs).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Added {} new stocks", created.len()),
        "stocks": stock_list(&created),
    })))
}

pub async fn get_stock(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Value>, Error> {
    let stock = state
        .stocks()
        .find_by_code(&code)
        .await?
        .ok_or_else(|| Error::not_found(&format!("Stock with code {code} not found")))?;
    Ok(Json(json!({"success": true, "stock": stock.to_json()})))
}

pub async fn delete_stock(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Value>, Error> {
    let repo = state.stocks();
    let stock = repo
        .find_by_code(&code)
        .await?
        .ok_or_else(|| Error::not_found(&format!("Stock with code {code} not found")))?;
    repo.soft_delete(stock.id).await?;
    info!("Soft deleted stock {code}");
    Ok(Json(json!({
        "success": true,
        "message": format!("Stock {code} deleted"),
    })))
}

pub async fn fetch_stocks(State(state): State<Arc<AppState>>) -> Result<Json<Value>, Error> {
    info!("Fetching stocks from InfoMoney");
    match fetch_and_save_stocks(&state.stocks(), &state.infomoney).await {
        Ok(report) => Ok(Json(json!({
            "success": true,
            "source": "infomoney",
            "message": format!("Fetched and added {} new stocks from InfoMoney", report.saved),
            "report": report,
        }))),
        Err(e) => {
            error!("Error fetching stocks: {e}");
            Err(Error::internal(&format!("Error fetching stocks: {e}")))
        }
    }
}
