//! `dns-lookup` tool: resolves a hostname to its first address
//!
//! Returns `{"address": "...", "family": 4|6}` on success. Any resolution
//! failure is reported as `{"type": "error", "value": {...}}` instead of
//! being raised.

use super::{ToolOutput, TypedTool};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serde_valid::Validate;
use std::io::ErrorKind;
use std::net::IpAddr;
use thiserror::Error;

pub const DNS_LOOKUP_TOOL: &str = "dns-lookup";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    pub family: u8,
}

impl From<IpAddr> for AddressInfo {
    fn from(ip: IpAddr) -> Self {
        let family = match ip {
            IpAddr::V4(_) => 4,
            IpAddr::V6(_) => 6,
        };
        Self {
            address: ip.to_string(),
            family,
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("getaddrinfo failed for {host}: {source}")]
    Resolution {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no addresses found for {0}")]
    NoAddress(String),
}

impl LookupError {
    /// Node-style `dns` error code.
    ///
    /// `getaddrinfo` failures surface as uncategorized io errors, so anything
    /// that is not a timeout or a malformed name reads as `ENOTFOUND`.
    pub fn code(&self) -> &'static str {
        match self {
            LookupError::Resolution { source, .. } => match source.kind() {
                ErrorKind::TimedOut => "ETIMEOUT",
                ErrorKind::InvalidInput => "EBADNAME",
                _ => "ENOTFOUND",
            },
            LookupError::NoAddress(_) => "ENOTFOUND",
        }
    }
}

/// Hostname resolution backend
#[async_trait]
pub trait HostResolver: Send + Sync + 'static {
    async fn lookup(&self, host: &str) -> Result<AddressInfo, LookupError>;
}

/// Resolver backed by the operating system's `getaddrinfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup(&self, host: &str) -> Result<AddressInfo, LookupError> {
        let mut addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|source| LookupError::Resolution {
                host: host.to_string(),
                source,
            })?;

        addrs
            .next()
            .map(|addr| AddressInfo::from(addr.ip()))
            .ok_or_else(|| LookupError::NoAddress(host.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DnsLookupArgs {
    #[validate(min_length = 1)]
    pub host: String,
}

pub struct DnsLookupTool<R = SystemResolver> {
    resolver: R,
}

impl<R: HostResolver> DnsLookupTool<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl<R: HostResolver> TypedTool for DnsLookupTool<R> {
    type Args = DnsLookupArgs;

    fn name(&self) -> &'static str {
        DNS_LOOKUP_TOOL
    }

    fn description(&self) -> &'static str {
        "Perform a dns lookup request on host (ex: example.com)"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "host": { "type": "string", "minLength": 1 }
            },
            "required": ["host"]
        })
    }

    async fn call(&self, args: DnsLookupArgs) -> ToolOutput {
        match self.resolver.lookup(&args.host).await {
            Ok(info) => {
                tracing::debug!(host = %args.host, address = %info.address, "DNS lookup succeeded");
                ToolOutput::Success(json!(info))
            }
            Err(e) => {
                tracing::debug!(host = %args.host, error = %e, "DNS lookup failed");
                ToolOutput::Failure(json!({
                    "code": e.code(),
                    "hostname": args.host,
                    "message": e.to_string(),
                }))
            }
        }
    }
}
