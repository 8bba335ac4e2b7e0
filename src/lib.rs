//! A dynamic CORS reverse proxy for Axum.
//!
//! Every request names its own destination in its path: a request for
//! `/api.example.com/items?page=2` is forwarded to
//! `http://api.example.com/items?page=2`, and the response comes back readable
//! from any browser origin.
//!
//! Two pieces of logic run for each request:
//!
//! - [`Destination::resolve`] turns the request path into an absolute URL.
//!   Targets without a scheme default to `http`, and port `443` always means
//!   `https`.
//! - [`rewrite_cors_headers`] drops the upstream's `Access-Control-*` headers,
//!   exposes every other upstream header, allows any origin, and echoes the
//!   client's preflight method and headers.
//!
//! [`CorsProxy`] ties them together as a [`tower::Service`] that forwards with
//! a pooled `hyper-util` client.
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::Router;
//! use dynamic_cors_proxy::CorsProxy;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let app: Router = CorsProxy::new().into();
//!
//!     let listener = TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! A browser script can then fetch `http://localhost:8080/httpbin.org/get`.
//!
//! # Failure responses
//!
//! A path that cannot be turned into a URL answers `400 Bad Request` with the
//! body `unable to parse URL: <detail>`. An unreachable upstream answers
//! `502 Bad Gateway`. Both carry the same CORS headers as proxied responses.

pub mod config;
mod cors;
mod destination;
mod hop_by_hop;
mod proxy;
mod router;
mod upgrade;

pub use config::{LogFormat, ProxyConfig};
pub use cors::{is_access_control_header, rewrite_cors_headers, CorsPreflight};
pub use destination::{has_scheme, Destination, MalformedDestination, DEFAULT_SCHEME, HTTPS_PORT};
pub use hop_by_hop::{is_hop_by_hop_header, remove_hop_by_hop_headers};
pub use proxy::{CorsProxy, StandardCorsProxy, DEFAULT_CONNECT_TIMEOUT};
pub use router::proxy_app;
