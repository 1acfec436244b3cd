use config::{Case, Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database URL (SQLite connection string)
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Maximum number of pooled database connections
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// HS256 secret used to verify bearer tokens
    pub jwt_secret: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_database_url() -> String {
    "sqlite:data/pushreg.db".to_string()
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .set_default("host", default_host())?
            .set_default("port", default_port())?
            .set_default("database_url", default_database_url())?
            .set_default(
                "database_max_connections",
                default_database_max_connections(),
            )?
            .set_default("request_timeout_secs", default_request_timeout_secs())?
            // Load from config file if present
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config.local").required(false))
            // Override with environment variables (prefixed with PUSHREG_)
            .add_source(
                Environment::with_prefix("PUSHREG")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(Case::Snake)
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "jwt_secret must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_secret(secret: &str) -> AppConfig {
        AppConfig {
            host: default_host(),
            port: default_port(),
            database_url: default_database_url(),
            database_max_connections: default_database_max_connections(),
            jwt_secret: secret.to_string(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    #[test]
    fn test_validate_rejects_blank_secret() {
        assert!(config_with_secret("   ").validate().is_err());
        assert!(config_with_secret("s3cret").validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = config_with_secret("s3cret");
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, "sqlite:data/pushreg.db");
        assert_eq!(config.request_timeout_secs, 30);
    }
}
