//! Application configuration loaded from environment variables.

use crate::errors::{PortalError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL (e.g. sqlite:./portal.db)
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Maximum connections held by the SQLite pool
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./portal.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| PortalError::Config("Invalid API_PORT".to_string()))?,
            db_max_connections: env_var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| PortalError::Config("Invalid DB_MAX_CONNECTIONS".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| PortalError::Config(format!("Missing env var: {key}")))
}
