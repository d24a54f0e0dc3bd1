//! sockbridge — forward TCP ports and Unix sockets to each other.
//!
//! Binds a listener on every configured source address and relays each
//! accepted connection to the paired destination. Socket files created
//! here are removed again on Ctrl+C / SIGTERM.

use anyhow::Context;
use clap::Parser;
use sockbridge_core::error::{EXIT_CONFIG, EXIT_OK};
use sockbridge_core::{Bridge, BridgeConfig, BridgeError, Console, ShutdownHandler};
use std::path::PathBuf;
use tracing::{error, info};

/// Config file names looked up in the working directory, in merge order.
const LOCAL_CONFIG_FILES: &[&str] = &["package.json", "sockbridge.json", "sockbridge.toml"];

/// sockbridge — TCP / Unix socket forwarder
#[derive(Parser, Debug)]
#[command(name = "sockbridge", version, about = "Forward TCP ports and Unix sockets to each other")]
struct Cli {
    /// Source address to listen on (`host:port` or a socket path)
    #[arg(requires = "destination")]
    source: Option<String>,

    /// Destination address to forward to (`host:port` or a socket path)
    destination: Option<String>,

    /// Echo inbound traffic to the console
    #[arg(short, long)]
    verbose: bool,

    /// Fixed width for echoed traffic (defaults to the terminal width)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    width: Option<u16>,

    /// Do not remove socket files on Ctrl+C / SIGTERM
    #[arg(long)]
    no_signal_handler: bool,

    /// Config file path (repeatable, later files win); replaces the default search list
    #[arg(short, long = "config")]
    config: Vec<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    use tracing_subscriber::EnvFilter;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{e:#}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let code = match run(config).await {
        Ok(()) => EXIT_OK,
        Err(e) => {
            error!(error = %e, "sockbridge stopped");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

/// Merge config files, then apply CLI overrides.
fn load_config(cli: &Cli) -> anyhow::Result<BridgeConfig> {
    let paths = if cli.config.is_empty() {
        default_config_paths()
    } else {
        cli.config.clone()
    };

    let mut config = BridgeConfig::load_layered(&paths).context("failed to load configuration")?;

    if let (Some(src), Some(dst)) = (&cli.source, &cli.destination) {
        config = config.with_pair(src.clone(), dst.clone());
    }
    if cli.verbose {
        config.verbose = true;
    }
    if cli.width.is_some() {
        config.width = cli.width;
    }
    if cli.no_signal_handler {
        config.register_signal_handler = false;
    }
    Ok(config)
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("sockbridge").join("config.json"));
    }
    paths.extend(LOCAL_CONFIG_FILES.iter().map(PathBuf::from));
    paths
}

/// Bind every rule and serve until a shutdown signal arrives.
///
/// The signal handler is installed before the first bind, so an interrupt
/// at any point after startup, including mid-bind, still runs the socket
/// cleanup. Cleanup also runs on a failed startup with some listeners
/// already bound.
async fn run(config: BridgeConfig) -> Result<(), BridgeError> {
    let rules = config.rules()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        rules = rules.len(),
        "starting sockbridge"
    );

    let console = Console::stdout();
    let mut bridge = Bridge::new(console);
    let mut shutdown = if config.register_signal_handler {
        ShutdownHandler::install(bridge.registry(), console).map_err(|e| {
            error!(error = %e, "failed to install signal handler");
            BridgeError::Io(e)
        })?
    } else {
        info!("signal handler disabled, socket files will not be removed on exit");
        ShutdownHandler::new(bridge.registry(), console)
    };

    tokio::select! {
        bound = bridge.bind_all(rules) => {
            if let Err(e) = bound {
                shutdown.cleanup().await;
                return Err(e);
            }
        }
        _ = shutdown.wait_for_signal() => {
            shutdown.cleanup().await;
            info!("sockbridge stopped during startup");
            return Ok(());
        }
    }

    bridge.run_until(shutdown.wait_for_signal()).await;
    shutdown.cleanup().await;

    info!("sockbridge stopped");
    Ok(())
}
