//! Command-line and environment configuration for the proxy binary.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Forwards each request to the URL in its path and opens the response to
/// cross-origin browsers.
#[derive(Debug, Clone, Parser)]
#[command(name = "dynamic-cors-proxy", version, about)]
pub struct ProxyConfig {
    /// Address to listen on.
    #[arg(long, env = "CORS_PROXY_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Abort requests (including the upstream response) after this many
    /// seconds. Unset means no limit.
    #[arg(long, env = "CORS_PROXY_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Give up connecting to an upstream after this many seconds.
    #[arg(long, env = "CORS_PROXY_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Log output format.
    #[arg(long, env = "CORS_PROXY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

impl ProxyConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
