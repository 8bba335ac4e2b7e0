//! Cross-origin header rewriting for proxied responses.
//!
//! The upstream's own CORS policy never reaches the browser. Instead every
//! response leaves the proxy with:
//!
//! - `Access-Control-Allow-Origin: *`
//! - `Access-Control-Expose-Headers` naming each remaining upstream header
//! - `Access-Control-Allow-Methods` echoing the preflight's requested method
//! - `Access-Control-Allow-Headers` echoing the preflight's requested headers

use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
};
use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::trace;

const ACCESS_CONTROL_PREFIX: &str = "access-control-";

/// Preflight headers sent by the client, captured before the request is
/// handed to the upstream client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsPreflight {
    request_method: Option<HeaderValue>,
    request_headers: Vec<HeaderValue>,
}

impl CorsPreflight {
    /// Captures the first non-empty `Access-Control-Request-Method` value and
    /// every `Access-Control-Request-Headers` value.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_method = headers
            .get(ACCESS_CONTROL_REQUEST_METHOD)
            .filter(|value| !value.is_empty())
            .cloned();
        let request_headers = headers
            .get_all(ACCESS_CONTROL_REQUEST_HEADERS)
            .iter()
            .cloned()
            .collect();

        Self {
            request_method,
            request_headers,
        }
    }

    pub fn request_method(&self) -> Option<&HeaderValue> {
        self.request_method.as_ref()
    }

    pub fn request_headers(&self) -> &[HeaderValue] {
        &self.request_headers
    }
}

/// Returns `true` for any header whose name starts with `access-control-`,
/// ignoring case.
pub fn is_access_control_header(name: &HeaderName) -> bool {
    name.as_str()
        .get(..ACCESS_CONTROL_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(ACCESS_CONTROL_PREFIX))
}

/// Rewrites `headers` in place so a browser on any origin can read the
/// response.
///
/// Steps run in a fixed order: upstream `Access-Control-*` headers are
/// dropped first, the survivors are exposed, and only then are the proxy's
/// own `Access-Control-*` headers added, so exposure never lists them.
pub fn rewrite_cors_headers(headers: &mut HeaderMap, preflight: &CorsPreflight) {
    strip_access_control_headers(headers);
    expose_headers(headers);

    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));

    if let Some(method) = &preflight.request_method {
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, method.clone());
    }

    for requested in &preflight.request_headers {
        headers.append(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
    }
}

fn strip_access_control_headers(headers: &mut HeaderMap) {
    let inherited: Vec<HeaderName> = headers
        .keys()
        .filter(|name| is_access_control_header(name))
        .cloned()
        .collect();

    for name in inherited {
        trace!(header = %name, "dropping upstream cross-origin header");
        headers.remove(&name);
    }
}

fn expose_headers(headers: &mut HeaderMap) {
    // keys() yields each name once, however many values it carries
    let exposed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| !is_access_control_header(name))
        .cloned()
        .collect();

    for name in exposed {
        headers.append(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from(name));
    }
}
