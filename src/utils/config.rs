use thiserror::Error;

const DEFAULT_SECRET_KEY: &str = "dev-key-replace-in-production";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: String,
    pub secret_key: String,
    pub environment: String,
    pub scheduler_enabled: bool,
    pub api_base_url: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Config {
    pub fn init() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let db_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                require("POSTGRES_USER")?,
                require("POSTGRES_PASSWORD")?,
                require("POSTGRES_HOST")?,
                lookup("POSTGRES_PORT").unwrap_or_else(|| "5432".to_string()),
                require("POSTGRES_DB")?,
            ),
        };

        let environment = lookup("APP_ENV")
            .unwrap_or_else(|| "production".to_string())
            .to_lowercase();
        let debug = lookup("DEBUG").map(|v| is_truthy(&v)).unwrap_or(false);
        let default_level = if debug || environment == "development" {
            "debug"
        } else {
            "info"
        };

        let port = match lookup("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => 5000,
        };

        Ok(Config {
            db_url,
            secret_key: lookup("SECRET_KEY").unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string()),
            environment,
            scheduler_enabled: lookup("SCHEDULER_ENABLED")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            api_base_url: lookup("API_BASE_URL")
                .unwrap_or_else(|| "http://localhost:5000".to_string()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            log_level: lookup("LOG_LEVEL")
                .unwrap_or_else(|| default_level.to_string())
                .to_lowercase(),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// True when a non-development deployment still guards its triggers
    /// with the built-in key.
    pub fn uses_default_secret_outside_development(&self) -> bool {
        !self.is_development() && self.secret_key == DEFAULT_SECRET_KEY
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
