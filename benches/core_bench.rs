use axum::{routing::get, Router};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dynamic_cors_proxy::{rewrite_cors_headers, CorsPreflight, CorsProxy, Destination};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server_ready = Arc::new(Notify::new());
    let server_ready_clone = server_ready.clone();

    tokio::spawn(async move {
        server_ready_clone.notify_one();
        axum::serve(listener, app).await.unwrap();
    });

    server_ready.notified().await;
    addr
}

fn bench_resolve(c: &mut Criterion) {
    let paths = [
        "/foo.com",
        "/https://foo.com/some/long/path?with=query&and=more",
        "/http://foo.com:443/upgrade",
        "/api.example.com:8080/v1/items",
    ];

    c.bench_function("resolve_destination", |b| {
        b.iter(|| {
            for path in paths {
                black_box(Destination::resolve(black_box(path)).unwrap());
            }
        });
    });
}

fn bench_rewrite(c: &mut Criterion) {
    let mut upstream = HeaderMap::new();
    for i in 0..20 {
        upstream.insert(
            HeaderName::from_bytes(format!("x-upstream-{i}").as_bytes()).unwrap(),
            HeaderValue::from_static("value"),
        );
    }
    upstream.insert(
        "access-control-allow-origin",
        HeaderValue::from_static("https://only.example"),
    );

    let mut request = HeaderMap::new();
    request.insert(
        "access-control-request-method",
        HeaderValue::from_static("PUT"),
    );
    request.append(
        "access-control-request-headers",
        HeaderValue::from_static("content-type"),
    );
    let preflight = CorsPreflight::from_headers(&request);

    c.bench_function("rewrite_cors_headers", |b| {
        b.iter(|| {
            let mut headers = upstream.clone();
            rewrite_cors_headers(&mut headers, black_box(&preflight));
            black_box(headers);
        });
    });
}

fn bench_proxied_get(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let upstream_addr = rt.block_on(serve(
        Router::new().route("/test", get(|| async { "Hello from test server!" })),
    ));
    let proxy_app: Router = CorsProxy::new().into();
    let proxy_addr = rt.block_on(serve(proxy_app));

    let client = reqwest::Client::new();

    c.bench_function("http1_get_through_proxy", |b| {
        b.to_async(&rt).iter(|| async {
            let response = client
                .get(format!("http://{proxy_addr}/{upstream_addr}/test"))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status().as_u16(), StatusCode::OK.as_u16());
        });
    });
}

criterion_group!(benches, bench_resolve, bench_rewrite, bench_proxied_get);
criterion_main!(benches);
