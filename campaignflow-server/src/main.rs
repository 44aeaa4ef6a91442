//! Campaignflow HTTP server.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use campaignflow::config::CampaignConfig;
use campaignflow_server::wiring::{demo_state, live_state, ProviderSettings};

#[derive(Debug, Parser)]
#[command(name = "campaignflow-server", version, about = "Campaign generation service")]
struct Cli {
    /// JSON config file; defaults apply when omitted.
    #[arg(long, env = "CAMPAIGNFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, env = "CAMPAIGNFLOW_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Run against in-process fakes instead of external providers.
    #[arg(long, env = "CAMPAIGNFLOW_DEMO")]
    demo: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "CAMPAIGNFLOW_LOG_JSON")]
    log_json: bool,

    #[command(flatten)]
    providers: ProviderSettings,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,campaignflow=debug"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = match &cli.config {
        Some(path) => CampaignConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CampaignConfig::default(),
    };

    let state = if cli.demo {
        demo_state(&config)
    } else {
        live_state(&config, &cli.providers).context("wiring providers")?
    };
    let eviction = state.tracker.spawn_eviction();

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("binding {}", cli.bind))?;
    info!(addr = %cli.bind, demo = cli.demo, "Campaignflow server listening");

    axum::serve(listener, campaignflow_server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    eviction.abort();
    Ok(())
}
