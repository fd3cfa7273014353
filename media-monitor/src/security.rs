use crate::types::{MonitorError, Result};
use regex::Regex;
use report_delivery::escape_html;
use std::net::{IpAddr, Ipv6Addr};
use std::sync::LazyLock;
use url::{Host, Url};

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_TEXT_LENGTH: usize = 100_000;
pub const MAX_EMAIL_LENGTH: usize = 254;

const SUSPICIOUS_PATTERNS: [&str; 10] = [
    "javascript:",
    "data:",
    "vbscript:",
    "file:",
    "ftp:",
    "<script",
    "</script>",
    "<iframe",
    "<object",
    "<embed",
];

const BLOCKED_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "0.0.0.0", "::1"];

// A pattern that fails to compile matches nothing.
static NAME_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\-'.]+$").ok());
static EMAIL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

fn matches(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified() || is_internal_v6(&v6),
    }
}

fn is_internal_v6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    // fc00::/7 unique local, fe80::/10 link local
    (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}

/// Validate a submitted article URL and return its cleaned form
/// (lowercase scheme and host, fragment removed).
pub fn validate_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MonitorError::invalid("URL is required"));
    }
    if raw.len() > MAX_URL_LENGTH {
        return Err(MonitorError::invalid(format!("URL exceeds {} characters", MAX_URL_LENGTH)));
    }
    let lowered = raw.to_lowercase();
    if SUSPICIOUS_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return Err(MonitorError::invalid("URL contains a disallowed pattern"));
    }

    let mut url = Url::parse(raw).map_err(|_| MonitorError::invalid("Invalid URL format"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(MonitorError::invalid("URL must use http or https"));
    }

    let blocked = match url.host() {
        None => return Err(MonitorError::invalid("URL must include a host")),
        Some(Host::Domain(domain)) => BLOCKED_HOSTS.contains(&domain.to_lowercase().as_str()),
        Some(Host::Ipv4(ip)) => is_internal_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_internal_ip(IpAddr::V6(ip)),
    };
    if blocked {
        return Err(MonitorError::invalid("URLs pointing at local or private hosts are not allowed"));
    }

    url.set_fragment(None);
    Ok(url.to_string())
}

/// Validate a submitter name and return it trimmed and HTML-escaped.
pub fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(MonitorError::invalid("Name is required"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(MonitorError::invalid(format!("Name exceeds {} characters", MAX_NAME_LENGTH)));
    }
    if !matches(&NAME_PATTERN, name) {
        return Err(MonitorError::invalid(
            "Name may only contain letters, numbers, spaces, hyphens, apostrophes and periods",
        ));
    }
    Ok(escape_html(name))
}

/// Validate free text (pasted or manually supplied article content) and HTML-escape it.
pub fn sanitize_text(raw: &str) -> Result<String> {
    let text = raw.trim();
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(MonitorError::invalid(format!("Text exceeds {} characters", MAX_TEXT_LENGTH)));
    }
    Ok(escape_html(text))
}

pub fn validate_email(raw: &str) -> Result<String> {
    let email = raw.trim();
    if email.len() > MAX_EMAIL_LENGTH || !matches(&EMAIL_PATTERN, email) {
        return Err(MonitorError::invalid("Invalid email address"));
    }
    Ok(email.to_string())
}
