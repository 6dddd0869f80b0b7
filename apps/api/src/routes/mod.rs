pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::chat::handlers as chat;
use crate::errors::panic_response;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Chat
        .route("/chat", post(chat::handle_chat))
        .route("/chat/stream", post(chat::handle_chat_stream))
        // Jobs
        .route("/jobs/search", post(jobs::handle_search))
        .route("/jobs/recommend-with-resume", post(jobs::handle_recommend))
        .route(
            "/jobs/recommend-with-resume/upload",
            post(jobs::handle_recommend_upload),
        )
        .route("/jobs/initial", get(jobs::handle_initial))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::build_router;
    use crate::assistant::discovery::testing::StaticSource;
    use crate::assistant::enrich::testing::CannedFetcher;
    use crate::assistant::pipeline::testing::assistant;
    use crate::assistant::enrich::Enricher;
    use crate::assistant::pipeline::Assistant;
    use crate::assistant::router::RouterStrategy;
    use crate::llm_client::testing::ScriptedModel;
    use crate::llm_client::{ChatModel, LlmError};
    use crate::state::testing::app_state;

    struct PanickingModel;

    #[async_trait]
    impl ChatModel for PanickingModel {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            panic!("model adapter bug");
        }
    }

    fn app() -> axum::Router {
        build_router(app_state(assistant(
            Arc::new(ScriptedModel::new()),
            StaticSource::new("linkedin", &[]),
            StaticSource::new("indeed", &[]),
            CannedFetcher::default(),
        )))
    }

    #[tokio::test]
    async fn test_health_reports_service() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "jobpilot");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = app()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handler_panic_returns_json_error() {
        let model: Arc<dyn ChatModel> = Arc::new(PanickingModel);
        let pages = Arc::new(CannedFetcher::default());
        let app = build_router(app_state(Assistant::new(
            model.clone(),
            model,
            Arc::new(StaticSource::new("linkedin", &[])),
            Arc::new(StaticSource::new("indeed", &[])),
            Enricher::new(pages.clone(), pages, Duration::ZERO),
            RouterStrategy::Keyword,
        )));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"query": "hello there"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(
            body["error"]["message"],
            "request handler panicked: model adapter bug"
        );
    }
}
