//! URL canonicalization
//!
//! `HTTP://WWW.Example.com/Page/?utm_source=x#frag` and
//! `https://example.com/Page` produce the same key: scheme forced to https,
//! `www.` dropped, host lower-cased, path case preserved, trailing slash,
//! query string and fragment removed.

use url::Url;

/// Canonical comparison key for a review URL, `None` for empty or unparseable input
pub fn normalize_url(raw: &str) -> Option<String> {
    let parsed = parse_lenient(raw)?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        return None;
    }

    let mut key = String::with_capacity(raw.len());
    key.push_str("https://");
    key.push_str(host);
    if let Some(port) = parsed.port() {
        if port != 80 && port != 443 {
            key.push(':');
            key.push_str(&port.to_string());
        }
    }
    key.push_str(parsed.path().trim_end_matches('/'));
    Some(key)
}

/// Lower-cased host without `www.`, for domain lookups
pub fn url_host(raw: &str) -> Option<String> {
    let parsed = parse_lenient(raw)?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Parse http(s) URLs, accepting bare "example.com/path" forms
fn parse_lenient(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return None;
    }

    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", trimmed)).ok()?
        }
        Err(_) => return None,
    };

    match parsed.scheme() {
        "http" | "https" => Some(parsed),
        _ => None,
    }
}
