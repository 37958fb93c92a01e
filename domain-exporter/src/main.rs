//! Domain Exporter Server
//!
//! Serves whois-backed domain registration metrics for Prometheus.
//! This binary parses flags, layers configuration, sets up logging and runs
//! the HTTP listener from domain-exporter-lib.

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use domain_exporter_lib::{
    config::parse_timeout, load_env_config, resolve_listen_address, serve, AppState,
    ConfigManager, ExporterConfig, FileConfig,
};
use std::process;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for domain-exporter
#[derive(Parser, Debug)]
#[command(name = "domain-exporter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Prometheus exporter for domain paid-till and free-date from whois")]
#[command(
    long_about = "Prometheus exporter for domain paid-till and free-date from whois.\n\nScrape /probe?target=<domain> to look up one domain. Every probe runs a fresh whois lookup under a deadline."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Server address in host:port form (default: :80)
    #[arg(short = 'a', long = "listen-address", value_name = "ADDR", help_heading = "Server")]
    pub listen_address: Option<String>,

    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE", help_heading = "Server")]
    pub config: Option<String>,

    /// Deadline for each whois lookup, e.g. 5s, 30s (default: 5s)
    #[arg(short = 't', long = "timeout", value_name = "DURATION", value_parser = parse_timeout_arg, help_heading = "Probe")]
    pub timeout: Option<Duration>,

    /// Program used for lookups (default: whois)
    #[arg(long = "whois-command", value_name = "PROGRAM", help_heading = "Probe")]
    pub whois_command: Option<String>,

    /// Query this whois server instead of the program's default
    #[arg(long = "whois-server", value_name = "HOST", help_heading = "Probe")]
    pub whois_server: Option<String>,

    /// Keep a leading "www." on probe targets
    #[arg(long = "keep-www", help_heading = "Probe")]
    pub keep_www: bool,

    /// Debug mode: verbose logging including raw whois output
    #[arg(short = 'd', long = "debug", help_heading = "Logging")]
    pub debug: bool,
}

fn parse_timeout_arg(value: &str) -> Result<Duration, String> {
    parse_timeout(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    init_tracing(config.debug);

    if let Err(e) = run(config).await {
        error!("{}", e);
        process::exit(1);
    }
}

/// Merge defaults, configuration file, environment and flags, in that order.
fn build_config(args: &Args) -> Result<ExporterConfig, String> {
    let env_config = load_env_config();

    let file_config = match args.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => ConfigManager::load_file(path).map_err(|e| e.to_string())?,
        None => ConfigManager::discover_and_load().unwrap_or_else(|e| {
            eprintln!("Warning: ignoring configuration file: {}", e);
            FileConfig::default()
        }),
    };

    let mut config = ExporterConfig::default()
        .apply_file(&file_config)
        .map_err(|e| e.to_string())?
        .apply_env(&env_config);

    if let Some(address) = &args.listen_address {
        config.listen_address = address.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }
    if let Some(command) = &args.whois_command {
        config.whois_command = command.clone();
    }
    if args.whois_server.is_some() {
        config.whois_server = args.whois_server.clone();
    }
    if args.keep_www {
        config.strip_www = false;
    }
    if args.debug {
        config.debug = true;
    }

    Ok(config)
}

/// RUST_LOG wins when set; otherwise info, or debug in debug mode.
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(config: ExporterConfig) -> Result<(), String> {
    let bind_address = resolve_listen_address(&config.listen_address).map_err(|e| e.to_string())?;
    let state = AppState::from_config(&config).map_err(|e| e.to_string())?;

    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", config.listen_address, e))?;

    info!(
        address = %config.listen_address,
        timeout = ?config.timeout,
        whois_command = %config.whois_command,
        "domain-exporter v{} listening",
        env!("CARGO_PKG_VERSION")
    );

    serve(listener, state, shutdown_signal())
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "domain-exporter",
            "-a",
            "localhost:9203",
            "-t",
            "10s",
            "--keep-www",
            "-d",
        ]);
        let config = build_config(&args).unwrap();

        assert_eq!(config.listen_address, "localhost:9203");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(!config.strip_www);
        assert!(config.debug);
    }

    #[test]
    fn test_invalid_timeout_flag() {
        let result = Args::try_parse_from(["domain-exporter", "--timeout", "soon"]);
        assert!(result.is_err());
    }
}
