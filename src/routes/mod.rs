pub mod history;
pub mod news;
pub mod stocks;

use axum::{response::IntoResponse, routing::get, Json, Router};
use http::StatusCode;
use serde_json::json;
use std::{error::Error, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt, Registry};

use crate::{
    db,
    handlers::docs::{apidocs, apispec},
    routes::{history::history_routes, news::news_routes, stocks::stock_routes},
    services::{InfomoneyClient, InfomoneyEndpoints},
    utils::{config::Config, state::AppState},
};

fn level_for(log_level: &str) -> Level {
    match log_level {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

pub fn init_tracing(config: &Config) {
    let filter = filter::Targets::new()
        .with_target("tower_http::trace::on_response", Level::TRACE)
        .with_target("tower_http::trace::on_request", Level::TRACE)
        .with_target("tower_http::trace::make_span", Level::DEBUG)
        .with_target("axum::rejection", Level::TRACE)
        .with_target("sqlx", Level::WARN)
        .with_target(env!("CARGO_CRATE_NAME"), level_for(&config.log_level))
        .with_default(Level::INFO);

    Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/apispec.json", get(apispec))
        .route("/apidocs", get(apidocs))
        .route("/apidocs/", get(apidocs))
        .nest("/api/stocks", stock_routes(state.clone()))
        .nest("/api/news", news_routes(state.clone()))
        .nest("/api/historical-data", history_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn make_app(config: Config) -> Result<Router, Box<dyn Error>> {
    info!("Initializing application ({} environment)...", config.environment);
    if config.uses_default_secret_outside_development() {
        warn!("SECRET_KEY is not set; ingestion triggers accept the built-in key");
    }
    let db_pool = db::connect(&config.db_url).await?;
    info!("Database connection pool created and migrations applied");

    let infomoney = InfomoneyClient::new(
        InfomoneyClient::http_client()?,
        InfomoneyEndpoints::infomoney()?,
    );
    info!("InfoMoney client initialized");

    let state = Arc::new(AppState::new(db_pool, config, infomoney));
    let app = build_router(state);
    info!("Application initialized successfully");

    Ok(app)
}

async fn root() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({"message": "Welcome to the Investing API"})),
    )
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}
