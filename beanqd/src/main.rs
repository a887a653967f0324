//! beanqd entry point.
//!
//! ```text
//! beanqd                      Listen with beanqd.toml or built-in defaults
//! beanqd --config <path>      Load a custom config TOML
//! beanqd --listen <addr>      Override the listen address
//! beanqd --gen-config         Write default config to stdout
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use beanq_core::{DiscardStore, Server};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use beanqd::config::DaemonConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "beanqd", about = "beanq job-queue broker")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "beanqd.toml")]
    config: PathBuf,

    /// Listen address; overrides `network.listen` from the config.
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", DaemonConfig::default().to_toml()?);
        return Ok(());
    }

    let mut config = DaemonConfig::load(&cli.config);
    if let Some(addr) = cli.listen {
        config.network.listen = addr;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("beanqd v{}", env!("CARGO_PKG_VERSION"));

    let server = match Server::bind(
        config.network.listen,
        Arc::new(DiscardStore),
        config.to_limits(),
    )
    .await
    {
        Ok(server) => server,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    server
        .run_until(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Ctrl-C received, shutting down");
        })
        .await;

    Ok(())
}
