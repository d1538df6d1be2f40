//! Stylentu CLI - a command-line client for the Stylentu wardrobe service.
//!
//! Logs in, keeps the session tokens in the configured credential store,
//! and sends authenticated requests through the refresh-aware client.

mod commands;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stylentu_core::api::HttpTransport;
use stylentu_core::auth::ConfiguredStore;
use stylentu_core::utils::mask_secret;
use stylentu_core::{ApiError, ApiRequest, AuthenticatedClient, ClientConfig, CredentialStore, Session};

use commands::{Cli, Commands};

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first so it can feed the env-backed arguments
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();

    let mut config = ClientConfig::load()?;
    cli.apply_overrides(&mut config);
    info!(base_url = %config.base_url, "Stylentu CLI starting");

    run(cli.command, config).await
}

async fn run(command: Commands, config: ClientConfig) -> Result<()> {
    let store = Arc::new(config.open_store()?);
    let session = Session::new(Arc::clone(&store));
    let client = AuthenticatedClient::new(&config, Arc::clone(&store))?;

    match command {
        Commands::Login { username, password } => {
            login(&client, &session, &config, username, password).await
        }
        Commands::Logout => {
            session.logout().await?;
            println!("Logged out");
            Ok(())
        }
        Commands::Status => status(&session, &store).await,
        Commands::Refresh => {
            client.refresh_access_token().await?;
            println!("Access token refreshed");
            Ok(())
        }
        Commands::Get { .. } | Commands::Delete { .. } | Commands::Post { .. } | Commands::Patch { .. } => {
            match command.api_request()? {
                Some(request) => send_and_print(&client, request).await,
                None => Ok(()),
            }
        }
    }
}

/// Send one request through the pipeline and print the response body
async fn send_and_print(
    client: &AuthenticatedClient<HttpTransport, ConfiguredStore>,
    request: ApiRequest,
) -> Result<()> {
    let response = client.send(request).await.map_err(describe_api_error)?;
    match response.json::<Value>() {
        Ok(Value::Null) => {}
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{}", response.text()),
    }
    Ok(())
}

async fn login(
    client: &AuthenticatedClient<HttpTransport, ConfiguredStore>,
    session: &Session<ConfiguredStore>,
    config: &ClientConfig,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(u) if !u.trim().is_empty() => u.trim().to_string(),
        _ => prompt_username()?,
    };
    let password = match password {
        Some(p) if !p.is_empty() => p,
        _ => rpassword::prompt_password("Password: ")?,
    };

    if username.is_empty() || password.is_empty() {
        return Err(anyhow!("Username and password required"));
    }

    let tokens = match client.authenticate(&username, &password).await {
        Ok(tokens) => tokens,
        Err(e) if e.is_unauthorized() => return Err(anyhow!("Invalid username or password")),
        Err(e) => return Err(describe_api_error(e)),
    };
    session.login(&tokens).await.context("Failed to store session tokens")?;

    // Reload so command-line overrides are not written back
    match ClientConfig::load() {
        Ok(mut stored) => {
            stored.last_username = Some(username);
            if let Err(e) = stored.save() {
                warn!(error = %e, "Failed to save config");
            }
        }
        Err(e) => warn!(error = %e, "Failed to load config"),
    }

    println!("Login successful");
    Ok(())
}

async fn status(session: &Session<ConfiguredStore>, store: &ConfiguredStore) -> Result<()> {
    let state = session.state().await?;
    println!("Session:      {}", state.label());
    println!("Store:        {}", store.describe());

    let access = store.access_token().await?;
    let refresh = store.refresh_token().await?;
    println!(
        "Access token: {}",
        access.as_deref().map(mask_secret).unwrap_or_else(|| "-".to_string())
    );
    println!(
        "Refresh token: {}",
        refresh.as_deref().map(mask_secret).unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}

/// Prefer the server's own message when it sent one
fn describe_api_error(err: ApiError) -> anyhow::Error {
    if let (Some(status), Some(message)) = (err.status(), err.server_message()) {
        return anyhow!("{} ({})", message, status);
    }
    anyhow::Error::new(err)
}
