use crate::proxy::CorsProxy;
use axum::routing::Router;
use hyper_util::client::legacy::connect::Connect;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Enables conversion from a `CorsProxy` into an Axum `Router`.
///
/// The proxy becomes the fallback service, so requests of every method at
/// every path reach it. To serve it below a prefix, nest the resulting router:
/// Axum strips the prefix before the proxy reads the destination from the
/// path.
///
/// # Example
///
/// ```rust
/// use axum::Router;
/// use dynamic_cors_proxy::CorsProxy;
///
/// let proxy = CorsProxy::new();
/// let proxy_router: Router = proxy.into();
/// let app: Router = Router::new().nest_service("/cors", proxy_router);
/// ```
impl<C, S> From<CorsProxy<C>> for Router<S>
where
    C: Connect + Clone + Send + Sync + 'static,
    S: Send + Sync + Clone + 'static,
{
    fn from(proxy: CorsProxy<C>) -> Self {
        Router::<S>::new().fallback_service(proxy)
    }
}

/// Builds the application served by the binary: the proxy as a catch-all
/// route, request tracing, and an optional whole-request timeout.
///
/// Without a timeout a request waits for the upstream for as long as the
/// connection stays open.
pub fn proxy_app<C>(proxy: CorsProxy<C>, request_timeout: Option<Duration>) -> Router
where
    C: Connect + Clone + Send + Sync + 'static,
{
    let mut app: Router = proxy.into();
    if let Some(timeout) = request_timeout {
        app = app.layer(TimeoutLayer::new(timeout));
    }
    app.layer(TraceLayer::new_for_http())
}
