use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 10301;
pub const DEFAULT_ENDPOINT: &str = "/mcp";
pub const DEFAULT_SSE_KEEP_ALIVE_SECS: u64 = 15;

#[derive(Debug, Clone, Parser)]
#[command(name = "netmcp", version, about = "MCP Streamable HTTP server for network diagnostics")]
pub struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Path of the single MCP endpoint
    #[arg(long, env = "MCP_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// SSE keep-alive interval in seconds (0 disables)
    #[arg(long, env = "SSE_KEEP_ALIVE_SECS", default_value_t = DEFAULT_SSE_KEEP_ALIVE_SECS)]
    pub sse_keep_alive_secs: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Endpoint must start with '/': {0}")]
    InvalidEndpoint(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub endpoint: String,
    pub sse_keep_alive: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            sse_keep_alive: keep_alive_from_secs(DEFAULT_SSE_KEEP_ALIVE_SECS),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl TryFrom<Cli> for ServerConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let endpoint = cli.endpoint.trim().to_string();
        if !endpoint.starts_with('/') {
            return Err(ConfigError::InvalidEndpoint(endpoint));
        }

        Ok(ServerConfig {
            host: cli.host,
            port: cli.port,
            endpoint,
            sse_keep_alive: keep_alive_from_secs(cli.sse_keep_alive_secs),
        })
    }
}

fn keep_alive_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
