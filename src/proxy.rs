use axum::body::Body;
use axum::extract::ConnectInfo;
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, Version};
#[cfg(feature = "tls")]
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{
    connect::{Connect, HttpConnector},
    Client,
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::Service;
use tracing::{error, trace, warn};

use crate::cors::{rewrite_cors_headers, CorsPreflight};
use crate::destination::Destination;
use crate::hop_by_hop::{remove_hop_by_hop_headers, remove_hop_by_hop_headers_for_upgrade};
use crate::upgrade;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Default upstream TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A reverse proxy that forwards each request to the URL written in its own
/// path and rewrites the response's cross-origin headers.
///
/// A request for `/example.com/data?page=2` is forwarded to
/// `http://example.com/data?page=2`. Every response, including the proxy's own
/// error responses, leaves with `Access-Control-Allow-Origin: *`.
///
/// The proxy holds no per-request state; clones share the HTTP client's
/// connection pool.
#[derive(Clone)]
pub struct CorsProxy<C: Connect + Clone + Send + Sync + 'static> {
    client: Client<C, Body>,
}

#[cfg(feature = "tls")]
pub type StandardCorsProxy = CorsProxy<HttpsConnector<HttpConnector>>;
#[cfg(not(feature = "tls"))]
pub type StandardCorsProxy = CorsProxy<HttpConnector>;

impl StandardCorsProxy {
    /// Creates a proxy with the default client settings.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_cors_proxy::CorsProxy;
    ///
    /// let proxy = CorsProxy::new();
    /// ```
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Creates a proxy whose upstream connections give up after `timeout`.
    pub fn with_connect_timeout(timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        connector.enforce_http(false);
        connector.set_keepalive(Some(Duration::from_secs(60)));
        connector.set_connect_timeout(Some(timeout));
        connector.set_reuse_address(true);

        #[cfg(feature = "tls")]
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector);

        let client = Client::builder(hyper_util::rt::TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(32)
            .retry_canceled_requests(true)
            .set_host(true)
            .build(connector);

        Self::new_with_client(client)
    }
}

impl Default for StandardCorsProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CorsProxy<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    /// Creates a proxy around a pre-configured HTTP client.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_cors_proxy::CorsProxy;
    /// use hyper_util::client::legacy::{Client, connect::HttpConnector};
    /// use axum::body::Body;
    /// use hyper_util::rt::TokioExecutor;
    ///
    /// let client = Client::builder(TokioExecutor::new())
    ///     .pool_idle_timeout(std::time::Duration::from_secs(120))
    ///     .build(HttpConnector::new());
    ///
    /// let proxy = CorsProxy::new_with_client(client);
    /// ```
    pub fn new_with_client(client: Client<C, Body>) -> Self {
        Self { client }
    }

    /// Handles a single request: resolve, forward, rewrite.
    pub async fn proxy_request(&self, req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let preflight = CorsPreflight::from_headers(req.headers());
        let mut response = self.forward(req).await;
        rewrite_cors_headers(response.headers_mut(), &preflight);
        Ok(response)
    }

    async fn forward(&self, mut req: Request<Body>) -> Response<Body> {
        let raw_target = req.uri().path_and_query().map(|x| x.as_str()).unwrap_or("/");
        let destination = match Destination::resolve(raw_target) {
            Ok(destination) => destination,
            Err(err) => {
                warn!(raw_target, "Rejecting request with malformed destination: {}", err);
                return text_response(
                    StatusCode::BAD_REQUEST,
                    format!("unable to parse URL: {err}"),
                );
            }
        };

        trace!("Proxying request method={} destination={}", req.method(), destination);
        trace!("Original headers headers={:?}", req.headers());

        let client_upgrade = upgrade::is_upgrade_request(req.headers())
            .then(|| hyper::upgrade::on(&mut req));
        let client_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let (parts, body) = req.into_parts();
        let mut headers = parts.headers;
        headers.remove(HOST);
        if client_upgrade.is_some() {
            remove_hop_by_hop_headers_for_upgrade(&mut headers);
        } else {
            remove_hop_by_hop_headers(&mut headers);
        }
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut headers, ip);
        }

        let mut forward_req = Request::new(body);
        *forward_req.method_mut() = parts.method;
        *forward_req.uri_mut() = destination.to_uri();
        *forward_req.version_mut() = Version::HTTP_11;
        *forward_req.headers_mut() = headers;

        trace!(
            "Forwarding headers forwarded_headers={:?}",
            forward_req.headers()
        );

        match self.client.request(forward_req).await {
            Ok(mut res) => {
                trace!(
                    "Received response status={} headers={:?} version={:?}",
                    res.status(),
                    res.headers(),
                    res.version()
                );

                match client_upgrade {
                    Some(client_upgrade) if res.status() == StatusCode::SWITCHING_PROTOCOLS => {
                        let upstream_upgrade = hyper::upgrade::on(&mut res);
                        upgrade::spawn_tunnel(
                            client_upgrade,
                            upstream_upgrade,
                            destination.to_string(),
                        );
                        remove_hop_by_hop_headers_for_upgrade(res.headers_mut());
                    }
                    _ => remove_hop_by_hop_headers(res.headers_mut()),
                }

                let (parts, body) = res.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                error!(%destination, "Proxy error occurred err={}", e);
                text_response(
                    StatusCode::BAD_GATEWAY,
                    format!("failed to reach upstream: {e}"),
                )
            }
        }
    }
}

/// Appends the client address to `X-Forwarded-For`, folding any earlier
/// entries into a single comma-separated value.
fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    let value = if prior.is_empty() {
        ip.to_string()
    } else {
        format!("{}, {ip}", prior.join(", "))
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

fn text_response(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

impl<C> Service<Request<Body>> for CorsProxy<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { this.proxy_request(req).await })
    }
}
