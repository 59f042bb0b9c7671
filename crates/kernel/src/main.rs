//! Scrivener blog server binary.

use std::io::{Read, Write};
use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use scrivener_kernel::config::Config;
use scrivener_kernel::content::{SanitizationPolicy, sanitize};
use scrivener_kernel::state::AppState;
use scrivener_kernel::{build_app, routes, session};

#[derive(Parser)]
#[command(name = "scrivener", version, about = "Scrivener blog server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Sanitize HTML from stdin and write the result to stdout.
    Sanitize {
        /// Sanitization policy: default or extended.
        #[arg(long, default_value = "default")]
        policy: SanitizationPolicy,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Sanitize { policy } => sanitize_stdin(policy),
    }
}

async fn serve() -> Result<()> {
    info!("Starting Scrivener");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(port = config.port, site_url = %config.site_url, "Configuration loaded");

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    info!("Database and Redis connections established");

    let session_layer = session::create_session_layer(
        &config.redis_url,
        session::parse_same_site(&config.cookie_same_site),
        config.secure_cookies(),
        &config.session_secret,
    )
    .await
    .context("failed to create session layer")?;

    let app = build_app(state, routes::router(), session_layer);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn sanitize_stdin(policy: SanitizationPolicy) -> Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    let clean = sanitize(&input, policy);

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(clean.as_bytes())
        .context("failed to write stdout")?;
    stdout.flush().context("failed to flush stdout")?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
