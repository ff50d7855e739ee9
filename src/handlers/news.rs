use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    db::{NewsRepository, StocksRepository},
    domain::news::{save_infomoney_news, save_url_news_stock, update_news_content},
    models::{error::Error, news::InfomoneyNews},
    utils::state::AppState,
};

#[derive(Deserialize)]
pub struct NewsQuery {
    stock_code: Option<String>,
}

fn news_list(news: &[InfomoneyNews]) -> Vec<Value> {
    news.iter().map(InfomoneyNews::to_json).collect()
}

fn news_not_found(id: &str) -> Error {
    Error::not_found(&format!("News with ID {id} not found"))
}

pub async fn list_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsQuery>,
) -> Result<Json<Value>, Error> {
    let news_repo = state.news();

    let Some(code) = params.stock_code.filter(|c| !c.trim().is_empty()) else {
        let news = news_repo.find_all().await?;
        return Ok(Json(json!({
            "success": true,
            "news_count": news.len(),
            "news": news_list(&news),
        })));
    };

    let stock = state
        .stocks()
        .find_by_code(&code)
        .await?
        .ok_or_else(|| Error::not_found(&format!("Stock with code {code} not found")))?;
    let news = news_repo.find_by_stock_id(stock.id).await?;

    Ok(Json(json!({
        "success": true,
        "stock_code": stock.code,
        "stock_name": stock.name,
        "stock_company": stock.company,
        "news_count": news.len(),
        "news": news_list(&news),
    })))
}

pub async fn get_news(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, Error> {
    let news_id = Uuid::parse_str(&id).map_err(|_| news_not_found(&id))?;
    let news = state
        .news()
        .find_by_id(news_id)
        .await?
        .ok_or_else(|| news_not_found(&id))?;
    Ok(Json(json!({"success": true, "news": news.to_json()})))
}

pub async fn delete_news(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, Error> {
    let news_id = Uuid::parse_str(&id).map_err(|_| news_not_found(&id))?;
    if !state.news().soft_delete(news_id).await? {
        return Err(news_not_found(&id));
    }
    info!("Soft deleted news {id}");
    Ok(Json(json!({
        "success": true,
        "message": format!("News {id} deleted"),
    })))
}

pub async fn fetch_news(State(state): State<Arc<AppState>>) -> Result<Json<Value>, Error> {
    info!("Starting to fetch news from InfoMoney");
    match save_infomoney_news(&state.stocks(), &state.news(), &state.infomoney).await {
        Ok(report) => Ok(Json(json!({
            "success": true,
            "message": "Successfully fetched and saved news from InfoMoney",
            "report": report,
        }))),
        Err(e) => {
            error!("Error fetching news from InfoMoney: {e}");
            Err(Error::internal(&format!("Error fetching news: {e}")))
        }
    }
}

pub async fn save_stock_urls(State(state): State<Arc<AppState>>) -> Result<Json<Value>, Error> {
    info!("Starting to save news URLs for stocks");
    match save_url_news_stock(&state.stocks(), &state.infomoney).await {
        Ok(report) => Ok(Json(json!({
            "success": true,
            "message": "Successfully saved news URLs for stocks",
            "report": report,
        }))),
        Err(e) => {
            error!("Error saving news URLs for stocks: {e}");
            Err(Error::internal(&format!("Error saving news URLs for stocks: {e}")))
        }
    }
}

pub async fn update_content(State(state): State<Arc<AppState>>) -> Result<Json<Value>, Error> {
    info!("Starting to update news content and dates");
    match update_news_content(&state.news(), &state.infomoney).await {
        Ok(report) => Ok(Json(json!({
            "success": true,
            "message": "Successfully updated news content and dates",
            "report": report,
        }))),
        Err(e) => {
            error!("Error updating news content and dates: {e}");
            Err(Error::internal(&format!(
                "Error updating news content and dates: {e}"
            )))
        }
    }
}
