use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parish_schedule_server::config::{tracked_rooms, MinistryPlatformConfig};
use parish_schedule_server::server::{run_server, RequestsLoggingLevel};
use parish_schedule_server::MinistryPlatformClient;
use parish_schedule_server::SqliteStore;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite schedule database file. Created if absent.
    #[clap(value_parser = parse_path)]
    pub db_path: PathBuf,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Ministry Platform events endpoint. Overrides MP_API_URL.
    #[clap(long)]
    pub mp_api_url: Option<String>,

    /// Ministry Platform bearer token. Overrides MP_BEARER_TOKEN.
    #[clap(long)]
    pub mp_bearer_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    info!("Opening schedule database at {:?}...", cli_args.db_path);
    let store = Arc::new(SqliteStore::open(&cli_args.db_path)?);

    let mut mp_config = MinistryPlatformConfig::from_env();
    if let Some(api_url) = cli_args.mp_api_url {
        mp_config.api_url = api_url;
    }
    if let Some(bearer_token) = cli_args.mp_bearer_token {
        mp_config.bearer_token = Some(bearer_token);
    }
    if mp_config.bearer_token.is_none() {
        info!("MP_BEARER_TOKEN not set; sync requests will fail until it is configured");
    }
    let event_source = MinistryPlatformClient::new(mp_config)?;

    info!("Starting server on port {}...", cli_args.port);
    run_server(
        store.clone(),
        store,
        event_source,
        tracked_rooms(),
        cli_args.logging_level,
        cli_args.port,
    )
    .await
}
