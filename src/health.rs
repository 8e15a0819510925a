// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Health check endpoints

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::constants::service::{SERVICE_NAME, SERVICE_VERSION};
use crate::database::Database;

/// Overall health status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: ServiceInfo,
    /// Individual component checks
    pub checks: Vec<ComponentHealth>,
    /// Unix timestamp of the check
    pub timestamp: u64,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub uptime_seconds: u64,
}

/// Individual component health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    pub duration_ms: u64,
    pub metadata: Option<serde_json::Value>,
}

/// Health checker backed by the application database
pub struct HealthChecker {
    start_time: Instant,
    database: Database,
    cached_status: RwLock<Option<(HealthResponse, Instant)>>,
    cache_ttl: Duration,
}

impl HealthChecker {
    pub fn new(database: Database) -> Self {
        Self {
            start_time: Instant::now(),
            database,
            cached_status: RwLock::new(None),
            cache_ttl: Duration::from_secs(30),
        }
    }

    fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            name: SERVICE_NAME.to_string(),
            version: SERVICE_VERSION.to_string(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    fn response(&self, status: HealthStatus, checks: Vec<ComponentHealth>, start: Instant) -> HealthResponse {
        HealthResponse {
            status,
            service: self.service_info(),
            checks,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            response_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Fast check that only reports the process is up
    pub async fn basic_health(&self) -> HealthResponse {
        let start = Instant::now();
        let checks = vec![ComponentHealth {
            name: "service".to_string(),
            status: HealthStatus::Healthy,
            message: "Service is running".to_string(),
            duration_ms: 0,
            metadata: None,
        }];
        self.response(HealthStatus::Healthy, checks, start)
    }

    /// Full check including the database, cached for a short while
    pub async fn comprehensive_health(&self) -> HealthResponse {
        let start = Instant::now();

        {
            let cached = self.cached_status.read().await;
            if let Some((response, cached_at)) = cached.as_ref() {
                if cached_at.elapsed() < self.cache_ttl {
                    return response.clone();
                }
            }
        }

        info!("Performing comprehensive health check");

        let checks = vec![self.check_database().await];
        let status = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        let response = self.response(status, checks, start);

        {
            let mut cached = self.cached_status.write().await;
            *cached = Some((response.clone(), Instant::now()));
        }

        response
    }

    /// Ready once the database answers queries
    pub async fn readiness(&self) -> HealthResponse {
        let mut response = self.basic_health().await;
        let db_check = self.check_database().await;

        response.status = if db_check.status == HealthStatus::Healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };
        response.checks.push(db_check);
        response
    }

    pub async fn liveness(&self) -> HealthResponse {
        self.basic_health().await
    }

    async fn check_database(&self) -> ComponentHealth {
        let start = Instant::now();

        match self.database_health_check().await {
            Ok(metadata) => ComponentHealth {
                name: "database".to_string(),
                status: HealthStatus::Healthy,
                message: "Database is accessible and responsive".to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
                metadata: Some(metadata),
            },
            Err(e) => {
                error!("Database health check failed: {}", e);
                ComponentHealth {
                    name: "database".to_string(),
                    status: HealthStatus::Unhealthy,
                    message: format!("Database check failed: {}", e),
                    duration_ms: start.elapsed().as_millis() as u64,
                    metadata: None,
                }
            }
        }
    }

    async fn database_health_check(&self) -> Result<serde_json::Value> {
        let start = Instant::now();
        self.database.ping().await?;
        let users = self.database.count_users().await?;

        Ok(serde_json::json!({
            "type": "sqlite",
            "query_duration_ms": start.elapsed().as_millis() as u64,
            "users": users,
        }))
    }
}

/// Health check routes for the HTTP server
pub mod middleware {
    use super::*;
    use warp::filters::BoxedFilter;
    use warp::http::StatusCode;
    use warp::reply::Response;
    use warp::{Filter, Reply};

    /// `/health`, `/ready` and `/live`
    pub fn routes(health_checker: HealthChecker) -> BoxedFilter<(Response,)> {
        let health_checker = Arc::new(health_checker);

        let health = warp::path!("health")
            .and(warp::get())
            .and(with_health_checker(health_checker.clone()))
            .and_then(health_handler);

        let ready = warp::path!("ready")
            .and(warp::get())
            .and(with_health_checker(health_checker.clone()))
            .and_then(readiness_handler);

        let live = warp::path!("live")
            .and(warp::get())
            .and(with_health_checker(health_checker))
            .and_then(liveness_handler);

        health.or(ready).unify().or(live).unify().boxed()
    }

    fn with_health_checker(
        health_checker: Arc<HealthChecker>,
    ) -> impl Filter<Extract = (Arc<HealthChecker>,), Error = std::convert::Infallible> + Clone {
        warp::any().map(move || health_checker.clone())
    }

    fn status_reply(response: &HealthResponse, degraded_ok: bool) -> Response {
        let status_code = match response.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Degraded if degraded_ok => StatusCode::OK,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };
        warp::reply::with_status(warp::reply::json(response), status_code).into_response()
    }

    async fn health_handler(health_checker: Arc<HealthChecker>) -> Result<Response, warp::Rejection> {
        let response = health_checker.comprehensive_health().await;
        Ok(status_reply(&response, true))
    }

    async fn readiness_handler(health_checker: Arc<HealthChecker>) -> Result<Response, warp::Rejection> {
        let response = health_checker.readiness().await;
        Ok(status_reply(&response, false))
    }

    async fn liveness_handler(health_checker: Arc<HealthChecker>) -> Result<Response, warp::Rejection> {
        let response = health_checker.liveness().await;
        Ok(warp::reply::json(&response).into_response())
    }
}
