use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::{
    handlers::{
        middleware::require_api_token,
        news::{delete_news, fetch_news, get_news, list_news, save_stock_urls, update_content},
    },
    utils::state::AppState,
};

pub fn news_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let triggers = Router::new()
        .route("/fetch", post(fetch_news))
        .route("/save-stock-urls", get(save_stock_urls))
        .route("/update-content", post(update_content))
        .route_layer(from_fn_with_state(state, require_api_token));

    Router::new()
        .route("/", get(list_news))
        .route("/{id}", get(get_news).delete(delete_news))
        .merge(triggers)
}
