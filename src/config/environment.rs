// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment and file based configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::auth::DEFAULT_TOKEN_EXPIRY_HOURS;
use crate::constants::service::SERVICE_NAME;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_host: String,
    pub http_port: u16,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// File holding the JWT signing secret, created on first start
    pub jwt_secret_path: PathBuf,
    pub jwt_expiry_hours: i64,
    /// bcrypt cost factor
    pub password_hash_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Allowed CORS origins, `*` for any
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "127.0.0.1".to_string(),
            http_port: 8080,
            log_level: "info".to_string(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:./data/runningapp.db".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_path: PathBuf::from("./data/jwt.secret"),
            jwt_expiry_hours: DEFAULT_TOKEN_EXPIRY_HOURS,
            password_hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    /// Load configuration from `path`, else the per-user config file, else the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => dirs::config_dir()
                .map(|dir| dir.join(SERVICE_NAME).join("config.toml"))
                .filter(|candidate| candidate.exists()),
        };

        match config_path {
            Some(config_path) => Self::from_file(&config_path),
            None => Self::from_env(),
        }
    }

    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenv::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let defaults = ServerConfig::default();
        let config = ServerConfig {
            http_host: env_var_or("HTTP_HOST", &defaults.http_host),
            http_port: env_var_or("HTTP_PORT", "8080")
                .parse()
                .context("Invalid HTTP_PORT value")?,
            log_level: env_var_or("RUST_LOG", &defaults.log_level),

            database: DatabaseConfig {
                url: env_var_or("DATABASE_URL", &defaults.database.url),
            },

            auth: AuthConfig {
                jwt_secret_path: env::var("JWT_SECRET_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.auth.jwt_secret_path),
                jwt_expiry_hours: env_var_or("JWT_EXPIRY_HOURS", &DEFAULT_TOKEN_EXPIRY_HOURS.to_string())
                    .parse()
                    .context("Invalid JWT_EXPIRY_HOURS value")?,
                password_hash_cost: env_var_or("PASSWORD_HASH_COST", &bcrypt::DEFAULT_COST.to_string())
                    .parse()
                    .context("Invalid PASSWORD_HASH_COST value")?,
            },

            security: SecurityConfig {
                cors_origins: parse_origins(&env_var_or("CORS_ORIGINS", "*")),
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(anyhow::anyhow!("DATABASE_URL cannot be empty"));
        }

        if self.auth.jwt_expiry_hours <= 0 {
            return Err(anyhow::anyhow!("JWT_EXPIRY_HOURS must be positive"));
        }

        if !(4..=31).contains(&self.auth.password_hash_cost) {
            return Err(anyhow::anyhow!("PASSWORD_HASH_COST must be between 4 and 31"));
        }

        for origin in &self.security.cors_origins {
            if origin != "*" && !(origin.starts_with("http://") || origin.starts_with("https://")) {
                return Err(anyhow::anyhow!("Invalid CORS origin {origin}, expected http(s)://host"));
            }
        }

        if self.security.cors_origins.is_empty() {
            warn!("No CORS origins configured, cross-origin requests will be refused");
        }

        Ok(())
    }

    pub fn allows_any_origin(&self) -> bool {
        self.security.cors_origins.iter().any(|origin| origin == "*")
    }

    /// Configuration summary for logging, without secrets
    pub fn summary(&self) -> String {
        format!(
            "Running app configuration:\n\
             - HTTP: {}:{}\n\
             - Log Level: {}\n\
             - Database: {}\n\
             - Token expiry: {}h\n\
             - CORS origins: {}",
            self.http_host,
            self.http_port,
            self.log_level,
            self.database.url,
            self.auth.jwt_expiry_hours,
            self.security.cors_origins.join(", "),
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str == "*" {
        vec!["*".to_string()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert_eq!(
            parse_origins("http://localhost:3000, https://app.example.com"),
            vec!["http://localhost:3000", "https://app.example.com"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.auth.jwt_expiry_hours, 24);
        assert!(config.allows_any_origin());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServerConfig::default();
        config.database.url = String::new();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.auth.jwt_expiry_hours = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.auth.password_hash_cost = 3;
        assert!(config.validate().is_err());
        config.auth.password_hash_cost = 4;
        assert!(config.validate().is_ok());

        let mut config = ServerConfig::default();
        config.security.cors_origins = vec!["localhost:3000".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
http_port = 9000

[database]
url = "sqlite::memory:"

[security]
cors_origins = ["http://localhost:3000"]
"#,
        )
        .unwrap();

        let config = ServerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.http_host, "127.0.0.1");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.auth.jwt_expiry_hours, 24);
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        assert!(ServerConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = ServerConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        assert!(serialized.contains("[auth]"));

        let deserialized: ServerConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.database.url, config.database.url);
        assert_eq!(deserialized.auth.password_hash_cost, config.auth.password_hash_cost);
    }
}
