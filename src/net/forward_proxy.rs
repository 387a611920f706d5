//! Forward proxy options for the origin client.

use serde::{Deserialize, Serialize};

/// Upstream proxy the origin client may route through.
///
/// The port is kept as text, the way it arrives from configuration. Anything
/// that does not parse to a non-zero port counts as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardProxyOptions {
    pub host: String,
    pub port: String,
}

impl ForwardProxyOptions {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    /// Parsed port, `0` when missing or malformed.
    pub fn port_number(&self) -> u16 {
        self.port.trim().parse().unwrap_or(0)
    }

    /// Non-blank host and a non-zero port.
    pub fn is_valid(&self) -> bool {
        !self.host.trim().is_empty() && self.port_number() != 0
    }

    /// Proxy URL handed to the HTTP client, if the options are usable.
    pub fn proxy_url(&self) -> Option<String> {
        if !self.is_valid() {
            return None;
        }
        let host = self.host.trim();
        if host.contains("://") {
            Some(format!("{}:{}", host.trim_end_matches('/'), self.port_number()))
        } else {
            Some(format!("http://{}:{}", host, self.port_number()))
        }
    }
}
