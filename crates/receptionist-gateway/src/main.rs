use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

mod app;
mod company_store;
mod http;

#[derive(Parser)]
#[command(name = "receptionist-gateway", about = "Conversation orchestration core gateway")]
struct Cli {
    /// Path to receptionist.toml (falls back to RECEPTIONIST_CONFIG, then ./receptionist.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP gateway (default when no subcommand is given).
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "receptionist_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config).await,
    }
}

async fn serve(config_path: Option<String>) -> anyhow::Result<()> {
    let config = receptionist_core::config::AppConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({}), using defaults", e);
        receptionist_core::config::AppConfig::default()
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let state = Arc::new(app::AppState::new(config)?);
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("receptionist gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
