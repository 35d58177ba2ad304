use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vitae_core::db::{LibSqlLinkStore, LinkStore};
use vitae_core::{LinkId, ViewEvent, ViewRecorder};

use crate::config::AppConfig;
use crate::error::{AppError, Operation};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    recorder: ViewRecorder,
}

impl AppState {
    pub async fn from_config(config: Arc<AppConfig>) -> vitae_core::Result<Self> {
        let store = LibSqlLinkStore::open(&config.database_path).await?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    pub fn with_store(config: Arc<AppConfig>, store: Arc<dyn LinkStore>) -> Self {
        Self {
            config,
            recorder: ViewRecorder::new(store),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let link_routes = Router::new()
        .route("/links/{link_id}/view", post(record_view))
        .route("/links/{link_id}/views", get(view_history))
        .layer(DefaultBodyLimit::max(state.config.view_payload_max_bytes));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(link_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

#[derive(Debug, Serialize)]
struct RecordViewResponse {
    success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewHistoryResponse {
    link_id: LinkId,
    view_count: usize,
    last_viewed: Option<DateTime<Utc>>,
    views: Vec<ViewEvent>,
}

/// Ids that cannot be decoded or are blank can never name an existing link.
fn link_id_from_path(path: Result<Path<String>, PathRejection>) -> Result<LinkId, AppError> {
    let Path(raw) = path.map_err(|rejection| AppError::NotFound(rejection.body_text()))?;
    LinkId::new(raw).map_err(|_| AppError::NotFound(String::new()))
}

async fn record_view(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<RecordViewResponse>, AppError> {
    let link_id = link_id_from_path(path)?;

    let body = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|error| AppError::bad_request(format!("Body is not valid JSON: {error}")))?;
    let event = ViewEvent::from_payload(payload)
        .map_err(|error| AppError::from_core(Operation::RecordView, error))?;

    let recorded = state
        .recorder
        .record_view(&link_id, event)
        .await
        .map_err(|error| AppError::from_core(Operation::RecordView, error))?;

    tracing::info!(
        endpoint = Operation::RecordView.label(),
        link_id = %link_id,
        version = recorded.version,
        "Recorded link view"
    );
    Ok(Json(RecordViewResponse { success: true }))
}

async fn view_history(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<ViewHistoryResponse>, AppError> {
    let link_id = link_id_from_path(path)?;

    let link = state
        .recorder
        .view_history(&link_id)
        .await
        .map_err(|error| AppError::from_core(Operation::ViewHistory, error))?;

    Ok(Json(ViewHistoryResponse {
        view_count: link.view_count(),
        link_id: link.id,
        last_viewed: link.last_viewed,
        views: link.views,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tower::ServiceExt;
    use vitae_core::db::{AppendOutcome, MemoryLinkStore};
    use vitae_core::ShareLink;

    fn test_config() -> Arc<AppConfig> {
        Arc::new(AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            database_path: ":memory:".to_string(),
            view_payload_max_bytes: 512,
        })
    }

    fn link_id(value: &str) -> LinkId {
        LinkId::new(value).unwrap()
    }

    async fn app_with_link(id: &str) -> (Router, Arc<MemoryLinkStore>) {
        let store = Arc::new(MemoryLinkStore::new());
        store.create(&link_id(id)).await.unwrap();
        let router = app_router(AppState::with_store(test_config(), store.clone()));
        (router, store)
    }

    fn post_view(path: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Knows every link but cannot write.
    struct ReadOnlyStore;

    #[async_trait]
    impl LinkStore for ReadOnlyStore {
        async fn get(&self, id: &LinkId) -> vitae_core::Result<Option<ShareLink>> {
            Ok(Some(ShareLink::new(id.clone())))
        }

        async fn version(&self, _id: &LinkId) -> vitae_core::Result<Option<u64>> {
            Ok(Some(0))
        }

        async fn create(&self, id: &LinkId) -> vitae_core::Result<ShareLink> {
            Ok(ShareLink::new(id.clone()))
        }

        async fn append_view(
            &self,
            _id: &LinkId,
            _event: &ViewEvent,
        ) -> vitae_core::Result<AppendOutcome> {
            Err(vitae_core::Error::Database(
                "attempt to write a readonly database".into(),
            ))
        }
    }

    #[tokio::test]
    async fn record_view_appends_event() {
        let (router, store) = app_with_link("abc123").await;
        let body = json!({ "timestamp": "2024-05-01T10:15:00Z", "referrer": "email" });

        let request = post_view("/links/abc123/view", body.to_string());
        let (status, response) = send(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response, json!({ "success": true }));
        let link = store.get(&link_id("abc123")).await.unwrap().unwrap();
        assert_eq!(link.view_count(), 1);
        assert_eq!(link.views[0].attributes["referrer"], json!("email"));
        assert_eq!(
            link.last_viewed,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn record_view_unknown_link_is_404() {
        let (router, store) = app_with_link("other").await;
        let body = json!({ "timestamp": "2024-05-01T10:15:00Z" });

        let request = post_view("/links/abc123/view", body.to_string());
        let (status, response) = send(router, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(response, json!({ "error": "Link not found" }));
        assert!(store.get(&link_id("abc123")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_view_blank_link_is_404() {
        let (router, _store) = app_with_link("abc").await;
        let body = json!({ "timestamp": "2024-05-01T10:15:00Z" });

        let request = post_view("/links/%20/view", body.to_string());
        let (status, response) = send(router, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(response, json!({ "error": "Link not found" }));
    }

    #[tokio::test]
    async fn record_view_rejects_malformed_bodies() {
        let cases = [
            "{not json".to_string(),
            json!(["2024-05-01T10:15:00Z"]).to_string(),
            json!({ "referrer": "no timestamp" }).to_string(),
            json!({ "timestamp": "last tuesday" }).to_string(),
            json!({ "timestamp": "2024-05-01T10:15:00Z", "padding": "x".repeat(1024) })
                .to_string(),
        ];

        for body in cases {
            let (router, store) = app_with_link("abc").await;
            let (status, response) = send(router, post_view("/links/abc/view", body)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response, json!({ "error": "Invalid view payload" }));
            let link = store.get(&link_id("abc")).await.unwrap().unwrap();
            assert!(link.views.is_empty());
        }
    }

    #[tokio::test]
    async fn record_view_undecodable_link_is_404_json() {
        let (router, _store) = app_with_link("abc").await;
        let body = json!({ "timestamp": "2024-05-01T10:15:00Z" });

        let request = post_view("/links/%FF%FE/view", body.to_string());
        let (status, response) = send(router, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(response, json!({ "error": "Link not found" }));
    }

    #[tokio::test]
    async fn record_view_rejects_timestamp_past_year_9999() {
        let (router, store) = app_with_link("abc").await;
        let first = json!({ "timestamp": "2024-05-01T10:15:00Z" });
        let request = post_view("/links/abc/view", first.to_string());
        let (status, _) = send(router.clone(), request).await;
        assert_eq!(status, StatusCode::OK);

        let far = json!({ "timestamp": 253_402_300_800_000_i64 });
        let request = post_view("/links/abc/view", far.to_string());
        let (status, response) = send(router.clone(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({ "error": "Invalid view payload" }));
        let link = store.get(&link_id("abc")).await.unwrap().unwrap();
        assert_eq!(link.view_count(), 1);
        assert_eq!(link.version, 1);

        let request = Request::builder()
            .uri("/links/abc/views")
            .body(Body::empty())
            .unwrap();
        let (status, response) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["viewCount"], json!(1));
    }

    #[tokio::test]
    async fn record_view_storage_failure_is_500() {
        let router = app_router(AppState::with_store(test_config(), Arc::new(ReadOnlyStore)));
        let body = json!({ "timestamp": "2024-05-01T10:15:00Z" });

        let request = post_view("/links/abc/view", body.to_string());
        let (status, response) = send(router, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response, json!({ "error": "Failed to record view" }));
    }

    #[tokio::test]
    async fn view_history_lists_recorded_views() {
        let (router, _store) = app_with_link("abc").await;
        for timestamp in ["2024-05-01T10:15:00Z", "2024-05-02T08:00:00Z"] {
            let body = json!({ "timestamp": timestamp, "device": "desktop" });
            let request = post_view("/links/abc/view", body.to_string());
            let (status, _) = send(router.clone(), request).await;
            assert_eq!(status, StatusCode::OK);
        }

        let request = Request::builder()
            .uri("/links/abc/views")
            .body(Body::empty())
            .unwrap();
        let (status, response) = send(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["linkId"], json!("abc"));
        assert_eq!(response["viewCount"], json!(2));
        assert_eq!(response["lastViewed"], json!("2024-05-02T08:00:00Z"));
        assert_eq!(response["views"][0]["device"], json!("desktop"));
        assert_eq!(response["views"][1]["timestamp"], json!("2024-05-02T08:00:00Z"));
    }

    #[tokio::test]
    async fn view_history_unknown_link_is_404() {
        let (router, _store) = app_with_link("abc").await;
        let request = Request::builder()
            .uri("/links/missing/views")
            .body(Body::empty())
            .unwrap();

        let (status, response) = send(router, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(response, json!({ "error": "Link not found" }));
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let (router, _store) = app_with_link("abc").await;
        let request = Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();

        let (status, response) = send(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["status"], json!("ok"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn state_from_config_opens_libsql_store() {
        let state = AppState::from_config(test_config()).await.unwrap();
        let router = app_router(state);
        let body = json!({ "timestamp": "2024-05-01T10:15:00Z" });

        let request = post_view("/links/abc/view", body.to_string());
        let (status, _) = send(router, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
