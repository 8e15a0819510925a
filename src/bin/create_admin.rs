// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::Result;
use clap::Parser;
use runningapp::{
    auth::AuthManager,
    config::ServerConfig,
    constants::limits::PASSWORD_MIN_LENGTH,
    database::Database,
    models::NewUser,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "create-admin")]
#[command(about = "Create a user with admin and staff rights")]
struct Cli {
    #[arg(long)]
    username: String,

    /// Prompted for on stdin when omitted
    #[arg(long)]
    password: Option<String>,

    /// Database URL, defaults to the configured one
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ServerConfig::load(None)?;
    let database_url = cli.database_url.unwrap_or(config.database.url);

    let password = match cli.password {
        Some(password) => password,
        None => prompt_password().await?,
    };
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(anyhow::anyhow!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LENGTH
        ));
    }

    let database = Database::new(&database_url).await?;
    if database.get_user_by_username(&cli.username).await?.is_some() {
        return Err(anyhow::anyhow!("A user named {} already exists", cli.username));
    }

    // Token settings are irrelevant here, only hashing is used
    let auth_manager = AuthManager::new(Vec::new(), config.auth.jwt_expiry_hours, config.auth.password_hash_cost);
    let password_hash = auth_manager.hash_password(&password)?;
    let user_id = database
        .create_user(&NewUser::admin(cli.username.clone(), password_hash))
        .await?;

    info!("Created admin {} with id {}", cli.username, user_id);
    println!("Admin user {} created.", cli.username);
    Ok(())
}

async fn prompt_password() -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Password: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
