//! `Set-Cookie` parsing and re-emission.
//!
//! # Responsibilities
//! - Split a raw `Set-Cookie` value into name/value plus attributes
//! - Re-emit it through the native cookie writer or a manual escape/unescape path
//! - Point cookie domains naming the origin at the proxy instead
//!
//! # Design Decisions
//! - Attributes are recognized from a fixed, case-insensitive key set; the
//!   cookie's own pair is whatever segment is left over. A cookie whose name
//!   collides with an attribute keyword therefore cannot be identified.
//! - Flag attributes accept `true`/`false` or their own bare name
//! - Unparseable dates, ages and same-site values drop that attribute only

use std::time::SystemTime;

use axum::http::{header, HeaderValue};
use chrono::{DateTime, NaiveDateTime, Utc};
use cookie::Cookie;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use time::OffsetDateTime;

use crate::mapper::identity::UrlRewriter;
use crate::mapper::message::OutboundResponse;

/// Everything outside RFC 3986 unreserved characters.
const COOKIE_VALUE_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const DOMAIN: &str = "domain";
const PATH: &str = "path";
const EXPIRES: &str = "expires";
const SECURE: &str = "secure";
const SAME_SITE: &str = "samesite";
const HTTP_ONLY: &str = "httponly";
const MAX_AGE: &str = "max-age";
const MAX_AGE_COMPACT: &str = "maxage";
const IS_ESSENTIAL: &str = "isessential";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        }
    }
}

/// A decoded `Set-Cookie` header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    /// Seconds.
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    pub is_essential: bool,
}

impl CookieRecord {
    /// Parse a raw value such as `id=abc; Path=/; Secure; HttpOnly`.
    pub fn extract(raw: &str) -> Self {
        let mut record = CookieRecord::default();

        for part in raw.split("; ") {
            let (key, value) = part.split_once('=').unwrap_or((part, part));

            match key.trim().to_ascii_lowercase().as_str() {
                DOMAIN => record.domain = Some(value.to_string()),
                PATH => record.path = Some(value.to_string()),
                EXPIRES => record.expires = parse_expires(value),
                SECURE => record.secure = parse_flag(value, SECURE),
                SAME_SITE => record.same_site = SameSite::parse(value),
                HTTP_ONLY => record.http_only = parse_flag(value, HTTP_ONLY),
                MAX_AGE | MAX_AGE_COMPACT => record.max_age = value.trim().parse().ok(),
                IS_ESSENTIAL => record.is_essential = parse_flag(value, IS_ESSENTIAL),
                _ => {
                    record.name = key.to_string();
                    record.value = value.to_string();
                }
            }
        }

        record
    }

    /// Build a cookie for the native writer with the given value and domain.
    fn to_cookie(&self, value: String, domain: Option<String>) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), value);

        if let Some(domain) = domain {
            cookie.set_domain(domain);
        }
        if let Some(path) = &self.path {
            cookie.set_path(path.clone());
        }
        if let Some(expires) = self.expires {
            cookie.set_expires(OffsetDateTime::from(SystemTime::from(expires)));
        }
        if let Some(max_age) = self.max_age {
            cookie.set_max_age(time::Duration::seconds(max_age));
        }
        // Explicit false keeps SameSite=None from implying Secure
        cookie.set_secure(self.secure);
        cookie.set_http_only(self.http_only);
        if let Some(same_site) = self.same_site {
            cookie.set_same_site(cookie::SameSite::from(same_site));
        }

        cookie
    }
}

/// `true`/`false` in any case, otherwise true only for the attribute's own name.
fn parse_flag(value: &str, attribute: &str) -> bool {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        return true;
    }
    if value.eq_ignore_ascii_case("false") {
        return false;
    }
    value.eq_ignore_ascii_case(attribute)
}

fn parse_expires(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%a, %d-%b-%Y %H:%M:%S GMT", "%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// How cookies are written onto the client response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieStrategy {
    /// Through the response's native cookie writer.
    Native,
    /// Literal header built with an escaped value, then unescaped as a whole.
    Manual,
}

/// Re-emits origin cookies onto the client response.
#[derive(Debug, Clone)]
pub struct CookieTranslator {
    strategy: CookieStrategy,
    rewrite_domain: bool,
}

impl CookieTranslator {
    pub fn new(strategy: CookieStrategy, rewrite_domain: bool) -> Self {
        Self {
            strategy,
            rewrite_domain,
        }
    }

    pub fn strategy(&self) -> CookieStrategy {
        self.strategy
    }

    /// Parse one raw `Set-Cookie` value and append it to the response.
    pub fn emit(&self, raw: &str, response: &mut OutboundResponse, rewriter: &UrlRewriter) {
        let record = CookieRecord::extract(raw);
        let domain = record.domain.as_deref().map(|domain| {
            if self.rewrite_domain {
                rewriter.cookie_domain_to_proxy(domain)
            } else {
                domain.to_string()
            }
        });

        match self.strategy {
            CookieStrategy::Native => {
                let cookie = record.to_cookie(record.value.clone(), domain);
                response.append_cookie(&cookie);
            }
            CookieStrategy::Manual => {
                let escaped = utf8_percent_encode(&record.value, COOKIE_VALUE_ESCAPE).to_string();
                let literal = record.to_cookie(escaped, domain).to_string();
                let unescaped = percent_decode_str(&literal).decode_utf8_lossy();

                match HeaderValue::from_str(&unescaped) {
                    Ok(value) => response.append_header(header::SET_COOKIE, value),
                    Err(_) => {
                        tracing::warn!(cookie = %record.name, "Dropping cookie that is not a valid header value");
                    }
                }
            }
        }
    }
}
