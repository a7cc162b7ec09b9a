//! CLI for msgbridge
//!
//! Subcommands:
//! - `serve` (default): connect to the bound broker and serve the REST API
//! - `install-cert`: add a certificate to the local trust store and exit

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use msgbridge::app::build_bridge;
use msgbridge::config::{Settings, load_config};
use msgbridge::credentials::PlatformEnv;
use msgbridge::transport::{router, serve};
use msgbridge::trust::install_certificate;
use msgbridge::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "msgbridge", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST server
    Serve,
    /// Install a broker certificate into the trust store
    InstallCert {
        /// Certificate to install (PEM or DER); defaults to `tls.certificate_file`
        #[arg(long)]
        certificate: Option<PathBuf>,
        /// Trust store to update; defaults to `tls.trust_store`
        #[arg(long)]
        trust_store: Option<PathBuf>,
        /// Alias to file the certificate under; defaults to `tls.certificate_alias`
        #[arg(long)]
        alias: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(&settings.log.level);

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(settings).await,
        Command::InstallCert {
            certificate,
            trust_store,
            alias,
        } => run_install(&settings, certificate, trust_store, alias),
    };

    if let Err(e) = result {
        error!("msgbridge failed: {}", e);
        std::process::exit(1);
    }
}

async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let bridge = build_bridge(&settings, &PlatformEnv::from_env()).await;

    tokio::select! {
        result = serve(&addr, router(bridge)) => {
            result?;
            error!("HTTP server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

fn run_install(
    settings: &Settings,
    certificate: Option<PathBuf>,
    trust_store: Option<PathBuf>,
    alias: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let certificate =
        certificate.unwrap_or_else(|| PathBuf::from(&settings.tls.certificate_file));
    let trust_store = trust_store.unwrap_or_else(|| PathBuf::from(&settings.tls.trust_store));
    let alias = alias.unwrap_or_else(|| settings.tls.certificate_alias.clone());

    install_certificate(&certificate, &trust_store, &alias)?;
    Ok(())
}
