use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skylink::common::config;
use skylink::server::runtime;

#[derive(Parser)]
#[command(name = "skylink")]
#[command(about = "One-shot peer file transfer coordinator")]
struct Cli {
    /// Override the control-plane listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = config::load_config()?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    runtime::run(config).await
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();
}
