//! Proxy and target identities and the string rewriting between them.
//!
//! The rewriter is a plain substring substitution. It performs no escaping or
//! decoding; callers keep both sides in the same encoding space.

use thiserror::Error;
use url::Url;

/// Errors raised while parsing a configured target.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("target url `{0}` could not be parsed: {1}")]
    Parse(String, String),

    #[error("target url `{0}` must use http or https")]
    Scheme(String),

    #[error("target url `{0}` has no host")]
    MissingHost(String),
}

/// A scheme plus host (with optional port) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    scheme: String,
    host: String,
}

/// What the client believes it is talking to. Derived per request.
pub type ProxyIdentity = Identity;

/// The origin being proxied. Configured once per mapper.
pub type TargetIdentity = Identity;

impl Identity {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            host: host.into(),
        }
    }

    /// Parse a target such as `https://example.com` or `http://10.0.0.2:8080`.
    ///
    /// Any path, query or fragment on the url is ignored.
    pub fn parse_target(raw: &str) -> Result<Self, IdentityError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| IdentityError::Parse(raw.to_string(), e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(IdentityError::Scheme(raw.to_string()));
        }

        let host = url
            .host_str()
            .ok_or_else(|| IdentityError::MissingHost(raw.to_string()))?;

        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self::new(url.scheme(), host))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host including the port when one is present.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host without any port suffix.
    pub fn hostname(&self) -> &str {
        if self.host.starts_with('[') {
            // IPv6 literal, e.g. `[::1]:8080`
            return match self.host.find(']') {
                Some(end) => &self.host[..=end],
                None => &self.host,
            };
        }
        match self.host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => &self.host,
        }
    }

    /// `scheme://host`
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Bidirectional substitution between a proxy identity and a target identity.
#[derive(Debug, Clone)]
pub struct UrlRewriter {
    proxy: ProxyIdentity,
    target: TargetIdentity,
}

impl UrlRewriter {
    pub fn new(proxy: ProxyIdentity, target: TargetIdentity) -> Self {
        Self { proxy, target }
    }

    pub fn proxy(&self) -> &ProxyIdentity {
        &self.proxy
    }

    pub fn target(&self) -> &TargetIdentity {
        &self.target
    }

    /// Rewrite proxy references into target references.
    ///
    /// `scheme://host` is replaced before the bare host so an already-absolute
    /// url is never half rewritten.
    pub fn to_target(&self, value: &str) -> String {
        substitute(value, &self.proxy, &self.target)
    }

    /// Rewrite target references into proxy references.
    pub fn to_proxy(&self, value: &str) -> String {
        substitute(value, &self.target, &self.proxy)
    }

    /// Rewrite a cookie `Domain` attribute that names the target host.
    ///
    /// Ports never appear in cookie domains, so matching happens on hostnames.
    /// A leading dot is preserved. Unrelated domains come back unchanged.
    pub fn cookie_domain_to_proxy(&self, domain: &str) -> String {
        let (dot, bare) = match domain.strip_prefix('.') {
            Some(rest) => (".", rest),
            None => ("", domain),
        };

        if !self.proxy.hostname().is_empty() && bare.eq_ignore_ascii_case(self.target.hostname()) {
            format!("{}{}", dot, self.proxy.hostname())
        } else {
            domain.to_string()
        }
    }
}

fn substitute(value: &str, from: &Identity, to: &Identity) -> String {
    if from.host.is_empty() {
        return value.to_string();
    }
    value
        .replace(&from.origin(), &to.origin())
        .replace(&from.host, &to.host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> UrlRewriter {
        UrlRewriter::new(
            Identity::new("https", "proxy.local"),
            Identity::parse_target("https://example.com").unwrap(),
        )
    }

    #[test]
    fn test_parse_target() {
        let target = Identity::parse_target("https://example.com/some/path").unwrap();
        assert_eq!(target.scheme(), "https");
        assert_eq!(target.host(), "example.com");
        assert_eq!(target.origin(), "https://example.com");

        let with_port = Identity::parse_target("http://127.0.0.1:3000").unwrap();
        assert_eq!(with_port.host(), "127.0.0.1:3000");
        assert_eq!(with_port.hostname(), "127.0.0.1");
    }

    #[test]
    fn test_parse_target_rejects_bad_input() {
        assert!(matches!(Identity::parse_target("not a url"), Err(IdentityError::Parse(..))));
        assert!(matches!(Identity::parse_target("ftp://example.com"), Err(IdentityError::Scheme(_))));
    }

    #[test]
    fn test_ipv6_hostname() {
        let id = Identity::new("http", "[::1]:8080");
        assert_eq!(id.hostname(), "[::1]");
    }

    #[test]
    fn test_to_target_replaces_origin_then_host() {
        let r = rewriter();
        assert_eq!(r.to_target("https://proxy.local/login"), "https://example.com/login");
        assert_eq!(r.to_target("proxy.local"), "example.com");
        // scheme mismatch still has its host rewritten
        assert_eq!(r.to_target("http://proxy.local/a"), "http://example.com/a");
    }

    #[test]
    fn test_to_proxy_rewrites_location() {
        let r = rewriter();
        assert_eq!(
            r.to_proxy("https://example.com/path?x=1"),
            "https://proxy.local/path?x=1"
        );
    }

    #[test]
    fn test_no_occurrence_is_noop() {
        let r = rewriter();
        assert_eq!(r.to_target("/relative/path"), "/relative/path");
        assert_eq!(r.to_proxy("https://other.org/"), "https://other.org/");
    }

    #[test]
    fn test_round_trip() {
        let r = rewriter();
        for s in [
            "https://proxy.local/a?b=c",
            "see proxy.local and https://proxy.local",
            "nothing here",
        ] {
            assert_eq!(r.to_proxy(&r.to_target(s)), s);
        }
    }

    #[test]
    fn test_empty_proxy_host_is_noop() {
        let r = UrlRewriter::new(
            Identity::new("http", ""),
            Identity::parse_target("https://example.com").unwrap(),
        );
        assert_eq!(r.to_target("abc"), "abc");
    }

    #[test]
    fn test_cookie_domain_rewrite() {
        let r = UrlRewriter::new(
            Identity::new("http", "localhost:8080"),
            Identity::parse_target("https://example.com").unwrap(),
        );
        assert_eq!(r.cookie_domain_to_proxy("example.com"), "localhost");
        assert_eq!(r.cookie_domain_to_proxy(".Example.com"), ".localhost");
        assert_eq!(r.cookie_domain_to_proxy("cdn.other.net"), "cdn.other.net");
    }
}
