//! Server configuration.
//!
//! Layers, lowest to highest priority:
//!
//!   defaults → config.toml → CHATRELAY_* env vars → command-line flags
//!
//! Env vars use a double underscore for nesting:
//!   `CHATRELAY_SERVER__PORT=4000`  →  `server.port = 4000`

use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ServerError;
use crate::server::routes::RESERVED_PATHS;

/// Default listening port (the browser client connects to `ws://localhost:3000`).
pub const DEFAULT_PORT: u16 = 3000;

/// Command-line arguments.
#[derive(Debug, Default, Parser)]
#[command(name = "chatrelay")]
#[command(about = "Real-time group chat relay over WebSockets")]
pub struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(short = 'b', long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log filter directive, e.g. "chatrelay=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

/// Top-level configuration, deserialized by figment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Overrides `RUST_LOG` when set.
    #[serde(default)]
    pub log_filter: Option<String>,
}

/// Listener settings (lives under `[server]` in config.toml).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Route that accepts WebSocket upgrades.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// Largest inbound frame accepted from a client.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Frames buffered per client before it is dropped as too slow.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_ws_path() -> String {
    "/".to_string()
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}

fn default_outbound_queue() -> usize {
    256
}

impl ServerConfig {
    /// `host:port` to bind. Hostnames are resolved by the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rejects settings the router or the relay cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        if !self.ws_path.starts_with('/') {
            return Err(ServerError::InvalidConfig(format!(
                "server.ws_path must start with '/', got {:?}",
                self.ws_path
            )));
        }
        if RESERVED_PATHS.contains(&self.ws_path.as_str()) {
            return Err(ServerError::InvalidConfig(format!(
                "server.ws_path {:?} is already served by the HTTP API",
                self.ws_path
            )));
        }
        if self.outbound_queue == 0 {
            return Err(ServerError::InvalidConfig(
                "server.outbound_queue must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Loads configuration from every layer, applying CLI overrides last.
    pub fn load(cli: &Cli) -> Result<Self, ServerError> {
        let path = cli.config.clone().or_else(default_config_path);
        let mut config: Config = figment(path.as_deref()).extract()?;

        if let Some(host) = &cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(filter) = &cli.log_filter {
            config.log_filter = Some(filter.clone());
        }

        config.server.validate()?;
        Ok(config)
    }
}

/// Builds the figment: defaults → config.toml (if any) → CHATRELAY_* env vars.
pub fn figment(config_path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(Env::prefixed("CHATRELAY_").split("__"))
}

/// `<config dir>/chatrelay/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chatrelay").join("config.toml"))
}
