use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::KeygateCli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    KeygateCli::parse().run(&mut std::io::stdout()).await
}
