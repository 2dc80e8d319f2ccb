//! ctrl-server: lock-step agent endpoint in front of the sandbox host
//!
//! Binds the agent endpoint (port 7777 unless configured), then runs the
//! headless sandbox with the bridge installed as its lifecycle hooks.
//!
//! Usage: `ctrl-server [PORT] [--frames N]`
//!
//! Environment: `CTRL_BIND_ADDR`, `CTRL_PORT`, `CTRL_STEP_TIMEOUT_MS`, `RUST_LOG`.

mod sandbox;

use anyhow::{Context, Result, bail};
use ctrl_bridge::{BridgeConfig, EnvironmentBridge, TcpReplySocket};
use sandbox::{ReloadHandle, SandboxGame};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command line arguments
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    /// Overrides `CTRL_PORT`
    port: Option<u16>,
    /// Stop after this many frames
    frames: Option<u64>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--frames" => {
                let value = args.next().context("--frames needs a value")?;
                parsed.frames = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid frame count {:?}", value))?,
                );
            }
            other if parsed.port.is_none() && !other.starts_with('-') => {
                parsed.port = Some(
                    other
                        .parse()
                        .with_context(|| format!("invalid port {:?}", other))?,
                );
            }
            other => bail!("unexpected argument {:?}", other),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args(std::env::args().skip(1))?;
    let mut config = BridgeConfig::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }

    info!(
        "Starting ctrl-server on {}, step timeout {:?}",
        config.endpoint(),
        config.step_timeout
    );

    // Bind failure is fatal: the bridge never starts
    let socket = TcpReplySocket::bind(&config)
        .with_context(|| format!("Failed to open agent endpoint {}", config.endpoint()))?;

    let reload = ReloadHandle::default();
    let bridge = EnvironmentBridge::new(socket, reload.clone(), config.reward);
    let mut game = SandboxGame::new(reload, Box::new(bridge));

    game.run(args.frames)?;
    info!("Reached room {} in {} frames", game.room(), game.frames());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(args(&[]).unwrap(), Args::default());
        assert_eq!(
            args(&["9000", "--frames", "600"]).unwrap(),
            Args {
                port: Some(9000),
                frames: Some(600)
            }
        );
        assert!(args(&["--frames"]).is_err());
        assert!(args(&["9000", "9001"]).is_err());
        assert!(args(&["--verbose"]).is_err());
        assert!(args(&["port"]).is_err());
    }
}
