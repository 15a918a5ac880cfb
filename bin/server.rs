// Pipeline CRM - Web Server
// JSON API over the seeded stores

use anyhow::{Context, Result};
use clap::Parser;
use pipeline_crm::{api, logging, CrmApp, CrmConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "crm-server", version)]
#[command(about = "Pipeline CRM - JSON API server")]
struct Args {
    /// JSON config file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = CrmConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    logging::init(&config.log_filter)?;

    println!("🌐 Pipeline CRM - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let app = CrmApp::from_config(&config)?;
    let router = api::router(app);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, latency_scale = config.latency_scale, "listening");

    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: http://{}/api/dashboard", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router)
        .await
        .context("Failed to start server")?;

    Ok(())
}
