// tests/fetch_http.rs
//
// HttpFetcher against a throwaway local axum server.

use std::net::SocketAddr;

use shuttle_axum::axum::{http::StatusCode, routing::get, Router};

use quake_watch::error::FetchError;
use quake_watch::feed::fetch::HttpFetcher;
use quake_watch::feed::profiles::Profile;
use quake_watch::feed::{Fetcher, Format, Source};

async fn serve() -> SocketAddr {
    let app = Router::new()
        .route(
            "/jma_eew.json",
            get(|| async { include_str!("fixtures/eew_warn.json") }),
        )
        .route(
            "/broken.json",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        shuttle_axum::axum::serve(listener, app).await.ok();
    });
    addr
}

fn source(url: String) -> Source {
    Source {
        id: "eew".into(),
        title: None,
        url,
        format: Format::Json,
        interval_secs: 20,
        alert: None,
        sound: None,
        profile: Profile::Eew,
    }
}

#[tokio::test]
async fn ok_response_returns_body() {
    let addr = serve().await;
    let fetcher = HttpFetcher::new();

    let raw = fetcher
        .fetch(&source(format!("http://{addr}/jma_eew.json")))
        .await
        .expect("fetch ok");
    assert_eq!(raw.source_id, "eew");
    assert_eq!(raw.format, Format::Json);
    assert!(raw.body.contains("石川県能登地方"));
}

#[tokio::test]
async fn non_success_status_is_status_error() {
    let addr = serve().await;
    let err = HttpFetcher::new()
        .fetch(&source(format!("http://{addr}/broken.json")))
        .await
        .expect_err("500 must fail");
    match err {
        FetchError::Status { source_id, status } => {
            assert_eq!(source_id, "eew");
            assert_eq!(status, 500);
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn refused_connection_is_transport_error() {
    // Bind and drop to get a port nobody listens on.
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        l.local_addr().expect("addr").port()
    };
    let err = HttpFetcher::new()
        .fetch(&source(format!("http://127.0.0.1:{port}/jma_eew.json")))
        .await
        .expect_err("nothing listening");
    assert!(matches!(err, FetchError::Transport { .. }), "{err:?}");
    assert_eq!(err.source_id(), "eew");
}
