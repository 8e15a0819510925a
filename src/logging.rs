// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Structured logging setup and application log events

use anyhow::Result;
use std::env;
use std::io;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::constants::service::{SERVICE_NAME, SERVICE_VERSION};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Emit span open/close events
    pub include_spans: bool,
    pub environment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for log shippers
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: false,
            include_spans: false,
            environment: "development".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Build logging configuration from `RUST_LOG`, `LOG_FORMAT` and `ENVIRONMENT`
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let format = env::var("LOG_FORMAT")
            .map(|value| LogFormat::parse(&value))
            .unwrap_or(LogFormat::Pretty);

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production = environment == "production";

        Self {
            level,
            format,
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            environment,
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Initialize the global tracing subscriber
    ///
    /// The returned handle changes the filter later, once the server
    /// configuration has been loaded.
    pub fn init(&self) -> Result<LogLevelHandle> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let (filter_layer, handle) = reload::Layer::new(env_filter);
        let registry = tracing_subscriber::registry().with(filter_layer);

        match self.format {
            LogFormat::Json => {
                let json_layer = fmt::layer()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_target(true)
                    .with_writer(io::stdout)
                    .with_span_events(self.span_events())
                    .json();

                registry.with(json_layer).try_init()?;
            }
            LogFormat::Pretty => {
                let pretty_layer = fmt::layer()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_target(true)
                    .with_writer(io::stdout)
                    .with_span_events(self.span_events());

                registry.with(pretty_layer).try_init()?;
            }
            LogFormat::Compact => {
                let compact_layer = fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(io::stdout)
                    .with_span_events(FmtSpan::NONE);

                registry.with(compact_layer).try_init()?;
            }
        }

        info!(
            service.name = SERVICE_NAME,
            service.version = SERVICE_VERSION,
            environment = %self.environment,
            log.level = %self.level,
            log.format = ?self.format,
            "Running app backend starting up"
        );

        Ok(LogLevelHandle { inner: handle })
    }
}

/// Changes the active log filter after the subscriber is installed
#[derive(Clone)]
pub struct LogLevelHandle {
    inner: reload::Handle<EnvFilter, Registry>,
}

impl LogLevelHandle {
    /// Replace the filter with `level`
    pub fn set_level(&self, level: &str) -> Result<()> {
        let filter = EnvFilter::try_new(level)?;
        self.inner.reload(filter)?;
        Ok(())
    }

    /// Apply a configured level, or `RUST_LOG` when it is set
    ///
    /// `RUST_LOG` is read again here since `.env` is only loaded with the
    /// server configuration, after the subscriber is installed.
    pub fn apply_default(&self, level: &str) -> Result<()> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());
        self.set_level(&level)?;
        info!(log.level = %level, "Log level set from configuration");
        Ok(())
    }
}

/// Application-specific log events
pub struct AppLogger;

impl AppLogger {
    /// Registration, login, logout and password changes
    pub fn log_auth_event(username: &str, event: &str, success: bool, details: Option<&str>) {
        info!(
            user.name = %username,
            auth.event = %event,
            auth.success = %success,
            auth.details = details.unwrap_or(""),
            "Authentication event"
        );
    }

    pub fn log_api_request(method: &str, path: &str, status: u16, duration_ms: u64) {
        info!(
            http.method = %method,
            http.path = %path,
            http.status = %status,
            http.duration_ms = %duration_ms,
            "HTTP request"
        );
    }

    /// Training created, updated or deleted
    pub fn log_training_event(user_id: i64, training_id: i64, event: &str, distance_km: f64, calories: i64) {
        info!(
            user.id = %user_id,
            training.id = %training_id,
            training.event = %event,
            training.distance_km = %distance_km,
            training.calories = %calories,
            "Training event"
        );
    }

    pub fn log_database_operation(operation: &str, table: &str, success: bool, duration_ms: u64) {
        info!(
            db.operation = %operation,
            db.table = %table,
            db.success = %success,
            db.duration_ms = %duration_ms,
            "Database operation"
        );
    }

    /// Rejected tokens, permission denials and admin actions
    pub fn log_security_event(event_type: &str, severity: &str, details: &str, user_id: Option<i64>) {
        warn!(
            security.event = %event_type,
            security.severity = %severity,
            security.details = %details,
            user.id = ?user_id,
            "Security event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();

        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.environment, "development");
        assert!(!config.include_location);
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Pretty);
    }

    #[test]
    fn test_from_env_defaults_to_pretty() {
        let config = LoggingConfig::from_env();
        if std::env::var("LOG_FORMAT").is_err() {
            assert_eq!(config.format, LogFormat::Pretty);
        }
        assert!(!config.level.is_empty());
    }

    #[test]
    fn test_log_level_handle_reloads_filter() {
        let (layer, handle) = reload::Layer::new(EnvFilter::new("info"));
        let _subscriber = tracing_subscriber::registry().with(layer);
        let levels = LogLevelHandle { inner: handle };

        assert!(levels.set_level("debug").is_ok());
        assert!(levels.set_level("runningapp=trace,warn").is_ok());
        assert!(levels.set_level("runningapp=notalevel").is_err());
    }
}
