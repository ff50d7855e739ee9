use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::{
    handlers::{
        history::{date_range, fetch_history, history_by_code, latest_price, variation},
        middleware::require_api_token,
    },
    utils::state::AppState,
};

pub fn history_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let triggers = Router::new()
        .route("/fetch", get(fetch_history))
        .route_layer(from_fn_with_state(state, require_api_token));

    Router::new()
        .route("/{code}", get(history_by_code))
        .route("/{code}/latest", get(latest_price))
        .route("/{code}/variation", get(variation))
        .route("/{code}/date-range", get(date_range))
        .merge(triggers)
}
