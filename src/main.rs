//! Particle multi-chain proxy.
//!
//! Starts one local HTTP endpoint per supported network so existing tools
//! can use `http://127.0.0.1:<port>` as a plain HTTP provider.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                  PROXY                        │
//!   wallet / script      │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!   ───────────────────▶ │  │ listener │──▶│ handler  │──▶│ upstream │──┼──▶ gateway
//!   127.0.0.1:8545       │  │ (chain 1)│   │ read/    │   │ client   │  │    (HTTPS,
//!   127.0.0.1:8546       │  │ (chain N)│   │ decode/  │   │ Basic    │  │     Basic auth)
//!   ◀─────────────────── │  └──────────┘   │ respond  │◀──│ auth     │◀─┼───
//!                        │                 └──────────┘   └──────────┘  │
//!                        │   supervisor: one listener + client per chain │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use particle_proxy::blockchain::{ChainId, ChainRegistry};
use particle_proxy::config::{apply_overrides, load_config, ConfigError, Overrides, ProxyConfig};
use particle_proxy::lifecycle::{shutdown_signal, Supervisor};
use particle_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "particle-proxy", version)]
#[command(about = "Local per-chain HTTP proxies for the Particle multi-chain RPC gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxies
    Serve {
        /// Chain ids to serve; 0 serves every supported network
        #[arg(default_values_t = [0u64])]
        chains: Vec<u64>,

        /// Port of the first chain; each further chain takes the next port
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
        port: Option<u16>,

        /// Optional TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Project id (falls back to config, then PROJECT_ID)
        #[arg(long)]
        project_id: Option<String>,

        /// Project server key (falls back to config, then PROJECT_SERVER_KEY)
        #[arg(long)]
        project_secret: Option<String>,
    },
    /// List all supported chains
    Chains,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Credentials may live in .env
    let _ = dotenv::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Commands::Chains => {
            for network in ChainRegistry::default().networks() {
                println!("{:>12}  {}", network.chain_id.0, network.name);
            }
            ExitCode::SUCCESS
        }
        Commands::Serve {
            chains,
            port,
            config,
            project_id,
            project_secret,
        } => {
            let config = match resolve_config(config, port, project_id, project_secret) {
                Ok(config) => config,
                Err(e) => {
                    let _ = logging::init_logging("info");
                    tracing::error!(error = %e, "Failed to load configuration");
                    return ExitCode::FAILURE;
                }
            };
            let chains: Vec<ChainId> = chains.into_iter().map(ChainId).collect();
            serve(config, &chains).await
        }
    }
}

fn resolve_config(
    path: Option<PathBuf>,
    port: Option<u16>,
    project_id: Option<String>,
    project_secret: Option<String>,
) -> Result<ProxyConfig, ConfigError> {
    let config = match path {
        Some(path) => load_config(&path)?,
        None => ProxyConfig::default(),
    };
    apply_overrides(
        config,
        Overrides {
            base_port: port,
            project_id,
            project_secret,
        },
    )
}

async fn serve(config: ProxyConfig, chains: &[ChainId]) -> ExitCode {
    if let Err(e) = logging::init_logging(&config.observability.log_level) {
        eprintln!("Failed to initialise logging: {e}");
    }

    tracing::info!(
        chains = ?chains,
        base_port = config.listener.base_port,
        upstream = %config.upstream.base_url,
        "particle-proxy v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut supervisor = match Supervisor::new(config) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let started = supervisor.start(chains).await.map(|running| running.len());
    if let Err(e) = started {
        tracing::error!(error = %e, "Startup failed");
        supervisor.shutdown().await;
        return ExitCode::FAILURE;
    }

    supervisor.run_until(shutdown_signal()).await;
    ExitCode::SUCCESS
}
