mod db;
mod domain;
mod handlers;
mod models;
mod routes;
mod services;
mod utils;

use std::error::Error;

use axum::serve;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{
    routes::{init_tracing, make_app},
    utils::{config::Config, scheduler::Scheduler},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let config = Config::init()?;
    init_tracing(&config);

    let addr = config.listen_addr();
    let scheduler = config.scheduler_enabled.then(|| Scheduler::from_config(&config));
    let app = make_app(config).await?;

    match scheduler {
        Some(scheduler) => {
            scheduler.spawn();
        }
        None => info!("Scheduler disabled"),
    }

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
