use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use webcam_bridge::{create_router, AppState, Config};

#[derive(Parser)]
#[command(name = "webcam-bridge")]
#[command(about = "Receive webcam recordings and screenshots from a capture UI")]
struct Args {
    /// Config file (TOML), without extension
    #[arg(short, long, default_value = "config/webcam-bridge")]
    config: String,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let bind = args.bind.unwrap_or_else(|| cfg.service.http.bind.clone());
    let port = args.port.unwrap_or(cfg.service.http.port);
    let addr = format!("{}:{}", bind, port);

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Upload directory: {}", cfg.storage.upload_dir.display());
    info!("Artifacts served under {}", cfg.storage.public_url_prefix);

    let state = AppState::new(cfg.reassembler_config());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}
