//! Command-line definition.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use stylentu_core::{ApiRequest, ClientConfig, CredentialBackend};

/// stylentu - command-line client for the StyleNTU wardrobe service
#[derive(Parser, Debug)]
#[command(name = "stylentu")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Service base URL (overrides the config file)
    #[arg(long, env = "STYLENTU_BASE_URL")]
    pub base_url: Option<String>,

    /// Where session tokens are kept (keyring, file)
    #[arg(long, env = "STYLENTU_CREDENTIAL_BACKEND")]
    pub credential_backend: Option<CredentialBackend>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session tokens
    Login {
        /// Account username (defaults to the last one used)
        #[arg(env = "STYLENTU_USERNAME")]
        username: Option<String>,

        /// Account password (prompted for when not given)
        #[arg(long, env = "STYLENTU_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Remove the stored session tokens
    Logout,

    /// Show whether a session is stored
    Status,

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Authenticated GET, prints the JSON response
    Get {
        /// Path relative to the base URL
        path: String,
    },

    /// Authenticated DELETE
    Delete {
        /// Path relative to the base URL
        path: String,
    },

    /// Authenticated POST with a JSON body
    Post {
        /// Path relative to the base URL
        path: String,

        /// Request body as JSON
        #[arg(value_parser = parse_json)]
        body: Value,
    },

    /// Authenticated PATCH with a JSON body
    Patch {
        /// Path relative to the base URL
        path: String,

        /// Request body as JSON
        #[arg(value_parser = parse_json)]
        body: Value,
    },
}

fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {}", e))
}

impl Cli {
    /// Apply command-line and environment overrides to the loaded config
    pub fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(ref url) = self.base_url {
            config.base_url = url.trim().to_string();
        }
        if let Some(backend) = self.credential_backend {
            config.credential_backend = backend;
        }
    }
}

impl Commands {
    /// The API request behind the raw request commands, `None` for the others
    pub fn api_request(&self) -> Result<Option<ApiRequest>> {
        let request = match self {
            Commands::Get { path } => ApiRequest::get(path.as_str()),
            Commands::Delete { path } => ApiRequest::delete(path.as_str()),
            Commands::Post { path, body } => ApiRequest::post(path.as_str()).json(body)?,
            Commands::Patch { path, body } => ApiRequest::patch(path.as_str()).json(body)?,
            Commands::Login { .. } | Commands::Logout | Commands::Status | Commands::Refresh => {
                return Ok(None)
            }
        };
        Ok(Some(request))
    }
}
