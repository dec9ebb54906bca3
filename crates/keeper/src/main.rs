//! Keeper service entry point

use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use keeper::{CommandApi, Config, KubeRuntime};
use topology::{Orchestrator, RespDataPlane};

/// Keeper - Redis cluster topology keeper
#[derive(Parser, Debug)]
#[command(name = "keeper")]
#[command(about = "Forms, inspects and recovers Redis cluster meshes")]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP API listen address
    #[arg(long)]
    listen_addr: Option<String>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_overrides(args.listen_addr, args.log_level);

    // Initialize logging
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting keeper...");
    info!("  HTTP API: {}", config.server.listen_addr);
    info!("  Redis port: {}", config.redis.port);
    info!("  Cluster tool: {}", config.redis.cli_path);

    let client = kube::Client::try_default().await?;
    let runtime = KubeRuntime::new(client).runtime();
    let orchestrator = Arc::new(Orchestrator::new(
        config.redis.client_config(),
        runtime,
        Arc::new(RespDataPlane::new()),
    ));

    let app = CommandApi::new(orchestrator).router();

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    info!("HTTP API listening on {}", config.server.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
