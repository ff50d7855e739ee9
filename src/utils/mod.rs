pub mod config;
pub mod rate_limiter;
pub mod scheduler;
pub mod state;
