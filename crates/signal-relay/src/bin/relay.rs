//! WebRTC Signal Relay
//!
//! Forwards offers, answers, and ICE candidates between connected peers.
//!
//! # Usage
//!
//! ```bash
//! # Defaults (0.0.0.0:3000, no static files)
//! signal-relay
//!
//! # Serve the client application alongside the relay
//! signal-relay --port 8443 --public-dir ./public
//!
//! # Load settings from a TOML file
//! signal-relay --config /etc/signal-relay/relay.toml
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use signal_core::{Config, RelayConfig};
use signal_relay::SignalServer;

#[derive(Parser, Debug)]
#[command(name = "signal-relay")]
#[command(about = "WebRTC signaling relay")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Bind address
    #[arg(short, long, env = "BIND")]
    bind: Option<IpAddr>,

    /// Directory of static client files to serve over HTTP
    #[arg(long)]
    public_dir: Option<PathBuf>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    sample_config: bool,
}

impl Args {
    /// Apply command-line overrides on top of the file configuration
    fn merge(&self, mut config: RelayConfig) -> RelayConfig {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(dir) = &self.public_dir {
            config.public_dir = Some(dir.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    if args.sample_config {
        print!("{}", Config::sample());
        return Ok(());
    }

    let file_config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::default(),
    };
    let config = args.merge(file_config.relay);

    info!("Starting WebRTC Signal Relay");
    info!("Listening on {}", config.listen_addr());

    match &config.public_dir {
        Some(dir) if dir.is_dir() => info!("Serving static files from {:?}", dir),
        Some(dir) => warn!("Public directory {:?} does not exist", dir),
        None => info!("Static file serving disabled"),
    }

    let server = SignalServer::new(config);
    server
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let stats = server.hub().stats();
    info!(
        "Relayed {} messages ({} IPv6 candidates suppressed, {} rejected, {} dropped)",
        stats.messages_forwarded,
        stats.candidates_suppressed,
        stats.messages_rejected,
        stats.messages_dropped
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_file() {
        let args = Args::parse_from(["signal-relay", "--port", "4000", "--public-dir", "web"]);
        let mut file = RelayConfig::default();
        file.port = 5000;
        file.max_message_bytes = 1024;

        let merged = args.merge(file);
        assert_eq!(merged.port, 4000);
        assert_eq!(merged.public_dir, Some(PathBuf::from("web")));
        assert_eq!(merged.max_message_bytes, 1024);
    }

    #[test]
    fn test_file_values_kept_without_flags() {
        // Built directly so PORT/BIND in the environment cannot leak in
        let args = Args {
            config: None,
            port: None,
            bind: None,
            public_dir: None,
            sample_config: false,
        };
        let mut file = RelayConfig::default();
        file.port = 5000;
        file.bind = "127.0.0.1".parse().unwrap();
        file.public_dir = Some(PathBuf::from("static"));
        file.max_message_bytes = 2048;

        let merged = args.merge(file);
        assert_eq!(merged.port, 5000);
        assert_eq!(merged.bind.to_string(), "127.0.0.1");
        assert_eq!(merged.public_dir, Some(PathBuf::from("static")));
        assert_eq!(merged.max_message_bytes, 2048);
    }
}
