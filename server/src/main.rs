//! loopcast entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use loopcast::Config;

#[tokio::main]
async fn main() -> Result<()> {
    loopcast::init_logging();

    let config = Config::parse();
    info!("Starting loopcast on port {}", config.port);

    loopcast::run(config).await
}
