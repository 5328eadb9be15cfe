//! HTTP front end.
//!
//! Every path serves the PAC script except `/debug/match`, which reports how
//! the current script routes a given host and only answers loopback peers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::{PipelineError, Result};
use crate::service::{PacArtifact, PacService};

/// MIME type browsers expect for a PAC script.
pub const PAC_CONTENT_TYPE: &str = "application/x-ns-proxy-autoconfig";

/// Path of the host routing debug endpoint.
pub const DEBUG_MATCH_PATH: &str = "/debug/match";

#[derive(Clone)]
struct AppState {
    service: Arc<PacService>,
}

#[derive(Deserialize)]
struct MatchQuery {
    host: Option<String>,
}

/// Build the router serving `service`.
///
/// Handlers extract the peer address, so the router must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(service: Arc<PacService>) -> axum::Router {
    axum::Router::new()
        .route(DEBUG_MATCH_PATH, get(handle_match))
        .fallback(handle_pac)
        .with_state(AppState { service })
}

/// Serve PAC requests on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an I/O error if the listener fails.
pub async fn run_server<F>(listener: TcpListener, service: Arc<PacService>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "PAC server listening");

    axum::serve(
        listener,
        router(service).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("PAC server stopped");
    Ok(())
}

/// Run the pipeline on the blocking pool; it stats and reads files.
async fn load_pac(service: &Arc<PacService>) -> std::result::Result<Arc<PacArtifact>, String> {
    let service = Arc::clone(service);
    match tokio::task::spawn_blocking(move || service.load_pac()).await {
        Ok(result) => result.map_err(|err: PipelineError| err.to_string()),
        Err(err) => Err(format!("build task failed: {err}")),
    }
}

async fn handle_pac(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    uri: Uri,
) -> Response {
    metrics::counter!("pac_requests_total").increment(1);
    info!(%peer, path = uri.path(), "PAC request");

    match load_pac(&state.service).await {
        Ok(pac) => (
            [(header::CONTENT_TYPE, PAC_CONTENT_TYPE)],
            pac.script().to_owned(),
        )
            .into_response(),
        Err(err) => {
            error!(%peer, error = %err, "failed to serve PAC");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to generate PAC: {err}"),
            )
                .into_response()
        }
    }
}

async fn handle_match(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Query(query): Query<MatchQuery>,
) -> Response {
    if !peer.ip().to_canonical().is_loopback() {
        warn!(%peer, "rejected debug request from non-loopback peer");
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({
                "error": "debug endpoint is only accessible from localhost"
            })),
        )
            .into_response();
    }

    let Some(host) = query.host.filter(|host| !host.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "'host' must be provided" })),
        )
            .into_response();
    };

    let pac = match load_pac(&state.service).await {
        Ok(pac) => pac,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": format!("failed to generate PAC: {err}")
                })),
            )
                .into_response();
        }
    };

    let route = pac.router().route(&host);
    let directive = pac.find_proxy_for_host(&host);
    info!(%peer, host = %host, route = %route, "debug match");

    Json(serde_json::json!({
        "host": host,
        "route": route.as_str(),
        "directive": directive,
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::EmbeddedSource;
    use axum::extract::connect_info::MockConnectInfo;

    const LIST: &str = "@@||direct.example.com\n||proxy.example.com\n";

    fn service() -> Arc<PacService> {
        Arc::new(PacService::new(
            EmbeddedSource::new("test", LIST.as_bytes()),
            "PROXY 10.0.0.1:3128",
        ))
    }

    async fn spawn_with_peer(peer: SocketAddr) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(service()).layer(MockConnectInfo(peer));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn serves_pac_on_any_path() {
        let addr = spawn_with_peer(SocketAddr::from(([127, 0, 0, 1], 50000))).await;

        for path in ["/", "/proxy.pac", "/some/other/path"] {
            let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::OK);
            assert_eq!(
                response.headers()[reqwest::header::CONTENT_TYPE],
                PAC_CONTENT_TYPE
            );
            let body = response.text().await.unwrap();
            assert!(body.contains("function FindProxyForURL(url, host)"));
            assert!(body.contains("\"proxy.example.com\": 1"));
        }
    }

    #[tokio::test]
    async fn debug_match_reports_route() {
        let addr = spawn_with_peer(SocketAddr::from(([127, 0, 0, 1], 50000))).await;

        let body: serde_json::Value =
            reqwest::get(format!("http://{addr}/debug/match?host=www.proxy.example.com"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(body["host"], "www.proxy.example.com");
        assert_eq!(body["route"], "proxy");
        assert_eq!(body["directive"], "PROXY 10.0.0.1:3128");

        let body: serde_json::Value =
            reqwest::get(format!("http://{addr}/debug/match?host=sub.direct.example.com"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(body["route"], "direct");
        assert_eq!(body["directive"], "DIRECT");
    }

    #[tokio::test]
    async fn debug_match_requires_host() {
        let addr = spawn_with_peer(SocketAddr::from(([127, 0, 0, 1], 50000))).await;

        for query in ["", "?host=", "?host=%20"] {
            let response = reqwest::get(format!("http://{addr}/debug/match{query}"))
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn debug_match_rejects_remote_peer() {
        let addr = spawn_with_peer(SocketAddr::from(([192, 168, 1, 20], 50000))).await;

        let response = reqwest::get(format!("http://{addr}/debug/match?host=example.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn pipeline_failure_maps_to_500() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service = Arc::new(PacService::new(
            EmbeddedSource::new("empty", b"! nothing here\n".as_slice()),
            "PROXY 10.0.0.1:3128",
        ));
        let app = router(service).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 1))));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.text().await.unwrap();
        assert!(body.starts_with("failed to generate PAC: "), "{body}");
    }
}
