//! Command-line entry point for offsets-tail.
//!
//! ```bash
//! offsets-tail --brokers localhost:9092 --report-interval 10s
//! RUST_LOG=offsets_source=debug offsets-tail --brokers localhost:9092
//! ```

use clap::Parser;
use offsets_tail::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    offsets_tail::run(config).await
}
