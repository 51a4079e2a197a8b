use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use scn_server::{ScenarioServer, ServerConfig};

/// Scenario planner REST server.
#[derive(Parser, Debug)]
#[command(name = "scenario-server", version, about)]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on; overrides the config file.
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    ScenarioServer::new(config)?.serve().await?;
    Ok(())
}
