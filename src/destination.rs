//! Resolution of the forwarding destination encoded in a request path.
//!
//! A request to `http://proxy/<target>` is forwarded to `<target>`, where the
//! target may be written in any of these shapes (non-exhaustive):
//!
//! - `google.com`
//! - `https://google.com`
//! - `google.com:443`
//! - `google.com/foo?q=1`
//!
//! Targets without a `scheme://` prefix default to `http`. Any target whose
//! explicit port is `443` is forwarded over `https`, whatever scheme it was
//! written with.

use http::uri::{Authority, InvalidUri, InvalidUriParts, PathAndQuery, Scheme};
use http::Uri;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Scheme assumed for targets that do not carry one.
pub const DEFAULT_SCHEME: &str = "http";

/// Port that forces the destination onto `https`.
pub const HTTPS_PORT: u16 = 443;

/// Matches targets that start with one or more letters followed by `://`.
///
/// Only letters are recognised: `2ttp://host` does not count as schemed and
/// gets the default scheme prepended.
static SCHEME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[[:alpha:]]+://").expect("scheme prefix pattern is valid"));

/// Failure to turn a request path into an absolute URL.
#[derive(Debug, thiserror::Error)]
pub enum MalformedDestination {
    #[error("parse {target:?}: {source}")]
    Unparseable {
        target: String,
        #[source]
        source: InvalidUri,
    },
    #[error("parse {target:?}: missing scheme")]
    MissingScheme { target: String },
    #[error("parse {target:?}: empty host")]
    EmptyHost { target: String },
    #[error("assemble upstream URI for {target:?}: {source}")]
    Unassemblable {
        target: String,
        #[source]
        source: InvalidUriParts,
    },
}

impl MalformedDestination {
    /// The string that failed to parse, after any default scheme was added.
    pub fn target(&self) -> &str {
        match self {
            Self::Unparseable { target, .. }
            | Self::MissingScheme { target }
            | Self::EmptyHost { target }
            | Self::Unassemblable { target, .. } => target,
        }
    }
}

/// The absolute URL a single request is forwarded to.
///
/// Always has a non-empty scheme and host. Recomputed for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    scheme: Scheme,
    authority: Authority,
    path_and_query: Option<PathAndQuery>,
    uri: Uri,
}

impl Destination {
    /// Resolves the destination encoded in `path`.
    ///
    /// `path` is the inbound request target (path plus optional query). One
    /// leading `/` is stripped and the remainder is the raw target.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_cors_proxy::Destination;
    ///
    /// let destination = Destination::resolve("/foo.com:443").unwrap();
    /// assert_eq!(destination.to_string(), "https://foo.com:443");
    /// ```
    pub fn resolve(path: &str) -> Result<Self, MalformedDestination> {
        let raw_target = path.strip_prefix('/').unwrap_or(path);
        Self::parse(&with_default_scheme(DEFAULT_SCHEME, raw_target))
    }

    fn parse(target: &str) -> Result<Self, MalformedDestination> {
        let parsed: Uri = target
            .parse()
            .map_err(|source| MalformedDestination::Unparseable {
                target: target.to_string(),
                source,
            })?;

        let mut scheme = parsed
            .scheme()
            .cloned()
            .ok_or_else(|| MalformedDestination::MissingScheme {
                target: target.to_string(),
            })?;

        let authority = parsed
            .authority()
            .filter(|authority| !authority.host().is_empty())
            .cloned()
            .ok_or_else(|| MalformedDestination::EmptyHost {
                target: target.to_string(),
            })?;

        // http::Uri reports "/" for an absent path; keep only what was written.
        let written_tail = target
            .find("://")
            .and_then(|idx| target.get(idx + 3 + authority.as_str().len()..))
            .unwrap_or("");
        let path_and_query = if written_tail.is_empty() {
            None
        } else {
            parsed.path_and_query().cloned()
        };

        if authority.port_u16() == Some(HTTPS_PORT) {
            scheme = Scheme::HTTPS;
        }

        let uri = upstream_uri(&scheme, &authority, path_and_query.as_ref()).map_err(|source| {
            MalformedDestination::Unassemblable {
                target: target.to_string(),
                source,
            }
        })?;

        Ok(Self {
            scheme,
            authority,
            path_and_query,
            uri,
        })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        self.authority.host()
    }

    pub fn port(&self) -> Option<u16> {
        self.authority.port_u16()
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// The path as written in the raw target, or `""` when there was none.
    pub fn path(&self) -> &str {
        match &self.path_and_query {
            Some(pq) if pq.as_str().starts_with('/') => pq.path(),
            _ => "",
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.path_and_query.as_ref().and_then(PathAndQuery::query)
    }

    /// Absolute URI the forwarded request is sent to.
    pub fn to_uri(&self) -> Uri {
        self.uri.clone()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)?;
        if let Some(pq) = &self.path_and_query {
            f.write_str(pq.as_str())?;
        }
        Ok(())
    }
}

/// Returns `true` when `target` already starts with `letters://`.
pub fn has_scheme(target: &str) -> bool {
    SCHEME_PREFIX.is_match(target)
}

fn with_default_scheme(scheme: &str, target: &str) -> String {
    if has_scheme(target) {
        target.to_string()
    } else {
        format!("{scheme}://{target}")
    }
}

fn upstream_uri(
    scheme: &Scheme,
    authority: &Authority,
    path_and_query: Option<&PathAndQuery>,
) -> Result<Uri, InvalidUriParts> {
    let path_and_query = match path_and_query {
        Some(pq) if pq.as_str().starts_with('/') => pq.clone(),
        // "?q=1" needs a root path to be a valid request target
        Some(pq) => format!("/{}", pq.as_str())
            .parse()
            .unwrap_or_else(|_| PathAndQuery::from_static("/")),
        None => PathAndQuery::from_static("/"),
    };

    let mut parts = http::uri::Parts::default();
    parts.scheme = Some(scheme.clone());
    parts.authority = Some(authority.clone());
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_prefix_requires_letters() {
        assert!(has_scheme("https://foo.com"));
        assert!(has_scheme("ws://foo.com"));
        assert!(!has_scheme("foo.com"));
        assert!(!has_scheme("2ttp://foo.com"));
        assert!(!has_scheme("h2://foo.com"));
        assert!(!has_scheme("://foo.com"));
    }

    #[test]
    fn default_scheme_is_only_added_when_missing() {
        assert_eq!(with_default_scheme("http", "foo.com"), "http://foo.com");
        assert_eq!(
            with_default_scheme("http", "https://foo.com"),
            "https://foo.com"
        );
        assert_eq!(
            with_default_scheme("http", "2ttp://foo.com"),
            "http://2ttp://foo.com"
        );
    }

    #[test]
    fn bare_query_gets_root_path_upstream() {
        let destination = Destination::resolve("/foo.com?q=1").unwrap();
        assert_eq!(destination.to_string(), "http://foo.com?q=1");
        assert_eq!(destination.to_uri().to_string(), "http://foo.com/?q=1");
        assert_eq!(destination.path(), "");
        assert_eq!(destination.query(), Some("q=1"));
    }
}
