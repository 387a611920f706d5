//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mapper.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::net::forward_proxy::ForwardProxyOptions;

/// Root configuration for the context mapper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The origin being proxied.
    pub target: TargetConfig,

    /// Mapping pipeline settings.
    pub mapper: MapperConfig,

    /// Optional upstream proxy for origin traffic.
    pub forward_proxy: ForwardProxyOptions,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Target origin. There is deliberately no default url.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TargetConfig {
    /// Origin url, e.g. "https://example.com".
    pub url: String,
}

/// Mapping pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Parse and re-serialize HTML responses.
    pub load_html: bool,

    /// Write cookies as escaped-then-unescaped literal headers instead of
    /// through the native cookie writer.
    pub disable_set_cookie_encoding: bool,

    /// Rewrite a cookie `Domain` naming the target host to the proxy host.
    pub rewrite_cookie_domain: bool,

    /// Largest inbound request body that will be buffered.
    pub max_request_body_bytes: usize,

    /// Request headers never sent to the origin, on top of the built-in list.
    pub excluded_headers: Vec<String>,

    /// When set, every `<title>` in HTML responses gets this text.
    pub html_title: Option<String>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            load_html: true,
            disable_set_cookie_encoding: false,
            rewrite_cookie_domain: true,
            max_request_body_bytes: 10 * 1024 * 1024,
            excluded_headers: Vec::new(),
            html_title: None,
        }
    }
}

/// Timeout configuration. Enforced by the origin client only.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connect timeout in seconds.
    pub connect_secs: u64,

    /// Total origin request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [target]
            url = "https://example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.target.url, "https://example.com");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.mapper.load_html);
        assert!(config.mapper.rewrite_cookie_domain);
        assert!(!config.mapper.disable_set_cookie_encoding);
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert!(!config.forward_proxy.is_valid());
    }

    #[test]
    fn test_full_config() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [target]
            url = "http://10.0.0.2:8080"

            [mapper]
            load_html = false
            disable_set_cookie_encoding = true
            excluded_headers = ["x-debug"]
            html_title = "Proxied"

            [forward_proxy]
            host = "squid.internal"
            port = "3128"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert!(!config.mapper.load_html);
        assert!(config.mapper.disable_set_cookie_encoding);
        assert_eq!(config.mapper.excluded_headers, vec!["x-debug".to_string()]);
        assert_eq!(config.mapper.html_title.as_deref(), Some("Proxied"));
        assert!(config.forward_proxy.is_valid());
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
