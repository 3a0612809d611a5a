mod webhook;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use wifimap_core::{AppConfig, HotspotStore, LocationReplier};
use wifimap_line::LineClient;

use crate::imagemap::{serve_imagemap, ImageProxy};
use crate::middleware::{request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub replier: LocationReplier,
    pub line: LineClient,
    pub image_proxy: ImageProxy,
}

impl AppState {
    /// Wire the pipeline, the LINE client and the image proxy from config.
    ///
    /// # Errors
    ///
    /// Fails if either HTTP client cannot be constructed.
    pub fn from_config(
        config: Arc<AppConfig>,
        store: Arc<dyn HotspotStore>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            replier: LocationReplier::new(store, &config),
            line: LineClient::from_config(&config)?,
            image_proxy: ImageProxy::from_config(&config)?,
            config,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "bad_request" | "invalid_signature" | "missing_signature" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", post(webhook::receive))
        .route("/imagemap/{url}/{size}", get(serve_imagemap))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match state.replier.store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::imagemap::render::tests::noisy_png;
    use crate::test_support::{test_state, FixedStore, TestStateOptions, UnreachableStore};

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, body.to_vec())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    /// `/imagemap/{encoded}/{size}` for an upstream URL.
    fn imagemap_path(upstream: &str, size: &str) -> String {
        format!(
            "{}/{size}",
            wifimap_core::reply::imagemap_base_url("", upstream)
        )
    }

    #[test]
    fn api_error_signature_codes_map_to_bad_request() {
        let response = ApiError::new("req-1", "invalid_signature", "bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = ApiError::new("req-1", "missing_signature", "absent").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = ApiError::new("req-1", "internal", "boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_reports_ok_when_store_answers() {
        let state = test_state(TestStateOptions::new(Arc::new(FixedStore::new(vec![]))));
        let (status, body) = send(build_app(state), get_request("/health")).await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["database"], "ok");
        assert!(json["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn health_reports_degraded_when_store_is_down() {
        let state = test_state(TestStateOptions::new(Arc::new(UnreachableStore)));
        let (status, body) = send(build_app(state), get_request("/health")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["status"], "degraded");
        assert_eq!(json["data"]["database"], "unavailable");
    }

    #[tokio::test]
    async fn imagemap_resizes_upstream_png_to_requested_size() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/staticmap"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(noisy_png(32, 32)),
            )
            .mount(&upstream)
            .await;

        let map_url = format!("{}/maps/api/staticmap?center=35.6586,139.7454&zoom=15", upstream.uri());
        let state = test_state(TestStateOptions::new(Arc::new(FixedStore::new(vec![]))));

        for size in [1u32, 520, 1040] {
            let response = build_app(state.clone())
                .oneshot(get_request(&imagemap_path(&map_url, &size.to_string())))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["content-type"], "image/png");
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let img = image::load_from_memory(&body).expect("png body");
            assert_eq!((img.width(), img.height()), (size, size));
        }
    }

    #[tokio::test]
    async fn imagemap_rejects_bad_size_and_foreign_host() {
        let state = test_state(TestStateOptions::new(Arc::new(FixedStore::new(vec![]))));

        let (status, _) = send(
            build_app(state.clone()),
            get_request(&imagemap_path("http://127.0.0.1/map.png", "huge")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            build_app(state),
            get_request(&imagemap_path("https://evil.example.com/map.png", "520")),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "host_not_allowed");
    }

    #[tokio::test]
    async fn imagemap_upstream_errors_are_bad_gateway_then_circuit_opens() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&upstream)
            .await;

        let mut options = TestStateOptions::new(Arc::new(FixedStore::new(vec![])));
        options.breaker_threshold = 2;
        let state = test_state(options);
        let uri = imagemap_path(&format!("{}/map.png", upstream.uri()), "520");

        for _ in 0..2 {
            let (status, _) = send(build_app(state.clone()), get_request(&uri)).await;
            assert_eq!(status, StatusCode::BAD_GATEWAY);
        }
        let (status, _) = send(build_app(state), get_request(&uri)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn imagemap_undecodable_body_is_unprocessable() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>quota exceeded</html>"))
            .mount(&upstream)
            .await;

        let state = test_state(TestStateOptions::new(Arc::new(FixedStore::new(vec![]))));
        let uri = imagemap_path(&format!("{}/map.png", upstream.uri()), "240");
        let (status, _) = send(build_app(state), get_request(&uri)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
