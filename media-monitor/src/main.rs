use clap::Parser;
use media_monitor::config::Config;
use media_monitor::logging::init_tracing;
use media_monitor::serve;
use tracing::{error, info};

/// Media monitoring service: collects article submissions and turns them into emailed reports.
#[derive(Parser)]
#[command(name = "media-monitor", version, about)]
struct Args {
    /// Overrides DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    /// Overrides HOST
    #[arg(long)]
    host: Option<String>,

    /// Overrides PORT
    #[arg(long)]
    port: Option<u16>,

    /// Stub out scraping, summarization and delivery
    #[arg(long)]
    local_mode: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.local_mode {
        config.local_mode = true;
    }
    config.validate()?;

    init_tracing(&config)?;
    info!(config = %config.masked(), "Starting media monitor");

    if let Err(e) = serve(config).await {
        error!("Server stopped: {:#}", e);
        return Err(e);
    }
    Ok(())
}
