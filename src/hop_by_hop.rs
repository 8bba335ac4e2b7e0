//! Hop-by-hop header handling ([RFC9110 Section 7.6.1](https://www.rfc-editor.org/rfc/rfc9110.html#section-7.6.1)).
//!
//! Headers that only describe a single connection are removed before a
//! message crosses the proxy, in both directions:
//! - the standard hop-by-hop headers
//! - every header listed in `Connection`

use http::header::{CONNECTION, UPGRADE};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashSet;
use std::str::FromStr;

/// Standard hop-by-hop headers
static HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Check if a header is a standard hop-by-hop header
pub fn is_hop_by_hop_header(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| name.as_str().eq_ignore_ascii_case(h))
}

/// Removes hop-by-hop headers and the headers named in `Connection`.
pub fn remove_hop_by_hop_headers(headers: &mut HeaderMap) {
    let mut headers_to_remove: HashSet<HeaderName> = HOP_BY_HOP_HEADERS
        .iter()
        .map(|&name| HeaderName::from_static(name))
        .collect();
    headers_to_remove.extend(connection_listed_headers(headers));

    for header in headers_to_remove {
        headers.remove(&header);
    }
}

/// Like [`remove_hop_by_hop_headers`], but keeps `Connection: upgrade` and
/// `Upgrade` so the peer can switch protocols.
pub fn remove_hop_by_hop_headers_for_upgrade(headers: &mut HeaderMap) {
    let upgrade = headers.get(UPGRADE).cloned();
    remove_hop_by_hop_headers(headers);

    if let Some(upgrade) = upgrade {
        headers.insert(CONNECTION, HeaderValue::from_static("upgrade"));
        headers.insert(UPGRADE, upgrade);
    }
}

fn connection_listed_headers(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_str(name.trim()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_standard_and_connection_listed_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("close, x-custom-header"));
        headers.insert("x-custom-header", HeaderValue::from_static("value"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("proxy-authorization", HeaderValue::from_static("Basic Zm9v"));
        headers.insert("x-kept", HeaderValue::from_static("kept"));

        remove_hop_by_hop_headers(&mut headers);

        assert!(!headers.contains_key("connection"));
        assert!(!headers.contains_key("x-custom-header"));
        assert!(!headers.contains_key("keep-alive"));
        assert!(!headers.contains_key("transfer-encoding"));
        assert!(!headers.contains_key("proxy-authorization"));
        assert_eq!(headers.get("x-kept").unwrap(), "kept");
    }

    #[test]
    fn upgrade_headers_survive_for_upgrades() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("Upgrade, keep-alive"));
        headers.insert("upgrade", HeaderValue::from_static("websocket"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));

        remove_hop_by_hop_headers_for_upgrade(&mut headers);

        assert_eq!(headers.get("connection").unwrap(), "upgrade");
        assert_eq!(headers.get("upgrade").unwrap(), "websocket");
        assert!(!headers.contains_key("keep-alive"));
    }

    #[test]
    fn end_to_end_headers_are_kept() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        headers.insert("cache-control", HeaderValue::from_static("no-cache"));

        remove_hop_by_hop_headers(&mut headers);

        assert_eq!(headers.len(), 2);
        assert!(!is_hop_by_hop_header(&http::header::CONTENT_TYPE));
    }
}
