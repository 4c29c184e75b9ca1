//! Registra
//!
//! HTTP server for the registration form.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use registra_kernel::form::RuleTable;
use registra_kernel::{AppState, Config, routes, session};

#[derive(Debug, Parser)]
#[command(name = "registra", version, about = "Registration form server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Print the rule table as the JSON schema the browser validator reads.
    Rules,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Rules => print_rules(),
    }
}

async fn serve() -> Result<()> {
    init_tracing();

    info!("Starting Registra");

    // Load configuration from environment
    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        port = config.port,
        redis_sessions = config.redis_url.is_some(),
        "Configuration loaded"
    );

    let state = AppState::new(&config).context("failed to initialize application state")?;

    // Middleware layers (last added = first executed in request flow):
    // TraceLayer → session → routes
    let app = match &config.redis_url {
        Some(redis_url) => {
            let session_layer = session::create_redis_session_layer(redis_url, &config)
                .await
                .context("failed to create session layer")?;
            info!("Redis session store connected");
            routes::app(state).layer(session_layer)
        }
        None => routes::app(state).layer(session::create_memory_session_layer(&config)),
    }
    .layer(TraceLayer::new_for_http());

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn print_rules() -> Result<()> {
    let rules = RuleTable::registration().context("failed to load registration rules")?;
    let schema = serde_json::to_string_pretty(&rules.client_schema())?;
    println!("{schema}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
