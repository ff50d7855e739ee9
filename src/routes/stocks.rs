use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::{
    handlers::{
        middleware::require_api_token,
        stocks::{create_stocks, delete_stock, fetch_stocks, get_stock, list_stocks},
    },
    utils::state::AppState,
};

pub fn stock_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let triggers = Router::new()
        .route("/fetch", get(fetch_stocks))
        .route_layer(from_fn_with_state(state, require_api_token));

    Router::new()
        .route("/", get(list_stocks).post(create_stocks))
        .route("/{code}", get(get_stock).delete(delete_stock))
        .merge(triggers)
}
