use sqlx::PgPool;

use crate::db::{PgHistoryRepository, PgNewsRepository, PgStocksRepository};
use crate::services::InfomoneyClient;
use crate::utils::config::Config;

pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,
    pub infomoney: InfomoneyClient,
}

impl AppState {
    pub fn new(db_pool: PgPool, config: Config, infomoney: InfomoneyClient) -> Self {
        Self {
            db_pool,
            config,
            infomoney,
        }
    }

    pub fn stocks(&self) -> PgStocksRepository {
        PgStocksRepository::new(self.db_pool.clone())
    }

    pub fn news(&self) -> PgNewsRepository {
        PgNewsRepository::new(self.db_pool.clone())
    }

    pub fn history(&self) -> PgHistoryRepository {
        PgHistoryRepository::new(self.db_pool.clone())
    }
}
