// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Running App Server Binary
//!
//! Starts the REST API with user authentication and SQLite storage.

use anyhow::Result;
use clap::Parser;
use runningapp::{
    auth::{load_or_generate_jwt_secret, AuthManager},
    config::ServerConfig,
    database::Database,
    logging::LoggingConfig,
    server::{self, AppState},
};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "runningapp-server")]
#[command(about = "REST backend for logging runs and computing fitness metrics")]
pub struct Args {
    /// Port to listen on, overrides the configuration
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind, overrides the configuration
    #[arg(long)]
    host: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database URL, overrides the configuration
    #[arg(short, long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = LoggingConfig::from_env().init()?;

    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(host) = args.host {
        config.http_host = host;
    }
    if let Some(database_url) = args.database_url {
        config.database.url = database_url;
    }
    config.validate()?;
    log_level.apply_default(&config.log_level)?;

    info!("{}", config.summary());
    if config.allows_any_origin() {
        warn!("CORS allows requests from any origin");
    }

    let jwt_secret = load_or_generate_jwt_secret(&config.auth.jwt_secret_path)?;
    info!("JWT secret loaded from: {}", config.auth.jwt_secret_path.display());

    let database = Database::new(&config.database.url).await?;
    info!("Database initialized successfully");

    let purged = database.purge_expired_revocations().await?;
    if purged > 0 {
        info!("Purged {} expired token revocations", purged);
    }

    let auth_manager = AuthManager::new(
        jwt_secret,
        config.auth.jwt_expiry_hours,
        config.auth.password_hash_cost,
    );
    info!("Authentication manager initialized");

    let state = AppState::new(database, auth_manager);
    if let Err(e) = server::run(state, &config).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
