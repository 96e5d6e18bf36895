//! API routes and handlers

mod chat;
mod generate;
mod health;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use restyle_ai::Deployment;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the API router. Only the endpoint of the deployed variant is mounted.
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let routes = match state.transformer.deployment() {
        Deployment::Local => Router::new().route("/generate_text", post(generate::generate_text)),
        Deployment::Remote => Router::new().route("/api/chat", post(chat::chat)),
    };

    routes
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Restrict to the configured origins; any method and header from those.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use restyle_ai::Transformer;
    use restyle_core::interfaces::LoadState;
    use restyle_core::{ChatPrompt, GenerationBackend, GenerationError};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    const ORIGINS: [&str; 1] = ["http://localhost:3000"];

    /// Fails the first `failures` calls, then answers `reply`.
    struct Flaky {
        reply: &'static str,
        failures: usize,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn ok(reply: &'static str) -> Arc<Self> {
            Self::failing_first(reply, 0)
        }

        fn failing_first(reply: &'static str, failures: usize) -> Arc<Self> {
            Arc::new(Self {
                reply,
                failures,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn generate(&self, _: &ChatPrompt) -> Result<String, GenerationError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(GenerationError::Backend("CUDA error: out of memory".into()));
            }
            Ok(self.reply.to_string())
        }
    }

    struct StillLoading;

    #[async_trait]
    impl GenerationBackend for StillLoading {
        fn name(&self) -> &'static str {
            "local"
        }

        fn state(&self) -> LoadState {
            LoadState::Loading
        }

        async fn generate(&self, _: &ChatPrompt) -> Result<String, GenerationError> {
            Err(GenerationError::NotReady)
        }
    }

    fn app(transformer: Transformer) -> Router {
        let origins: Vec<String> = ORIGINS.iter().map(|o| o.to_string()).collect();
        create_router(AppState::new(transformer), &origins)
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn local_polite_request_returns_generated_text() {
        let app = app(Transformer::local(Flaky::ok(" 식사하셨사옵니까? ")));
        let (status, body) = post_json(
            &app,
            "/generate_text",
            json!({"text": "밥 먹었어?", "style": "polite"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let text = body["generated_text"].as_str().unwrap();
        assert!(!text.is_empty());
        assert_ne!(text, "밥 먹었어?");
    }

    #[tokio::test]
    async fn remote_unknown_style_returns_error_payload() {
        let app = app(Transformer::remote(Flaky::ok("fabricated")));
        let (status, body) = post_json(
            &app,
            "/api/chat",
            json!({"message": "안녕", "style": "unknown_style"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("unknown_style"));
        assert!(body.get("response").is_none());
    }

    #[tokio::test]
    async fn remote_success_uses_response_key() {
        let app = app(Transformer::remote(Flaky::ok("안녕하세요")));
        let (status, body) =
            post_json(&app, "/api/chat", json!({"message": "안녕", "style": "formal"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"response": "안녕하세요"}));
    }

    #[tokio::test]
    async fn backend_failure_is_500_and_server_keeps_serving() {
        let app = app(Transformer::local(Flaky::failing_first("괜찮아", 1)));
        let req = json!({"text": "밥 먹었어?", "style": "casual"});

        let (status, body) = post_json(&app, "/generate_text", req.clone()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("out of memory"));

        let (status, body) = post_json(&app, "/generate_text", req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generated_text"], "괜찮아");
    }

    #[tokio::test]
    async fn blank_generation_is_500_not_empty_text() {
        let app = app(Transformer::local(Flaky::ok("  \n ")));
        let (status, body) = post_json(
            &app,
            "/generate_text",
            json!({"text": "밥 먹었어?", "style": "polite"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("no text"));
        assert!(body.get("generated_text").is_none());
    }

    #[tokio::test]
    async fn unparseable_bodies_get_json_errors() {
        let send = |uri: &'static str, body: &'static str| {
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap()
        };
        let read = |response: axum::response::Response| async move {
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (status, serde_json::from_slice::<Value>(&bytes).unwrap())
        };

        let local = app(Transformer::local(Flaky::ok("x")));
        let response = local.oneshot(send("/generate_text", "{not json")).await.unwrap();
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        let remote = app(Transformer::remote(Flaky::ok("x")));
        let response = remote
            .oneshot(send("/api/chat", r#"{"style":"formal"}"#))
            .await
            .unwrap();
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("message"));
    }

    #[tokio::test]
    async fn remote_backend_failure_is_500_with_error_key() {
        let app = app(Transformer::remote(Flaky::failing_first("", 1)));
        let (status, body) =
            post_json(&app, "/api/chat", json!({"message": "안녕", "style": "cute"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("out of memory"));
    }

    #[tokio::test]
    async fn requests_before_ready_get_not_ready_detail() {
        let app = app(Transformer::local(Arc::new(StillLoading)));
        let (status, body) = post_json(
            &app,
            "/generate_text",
            json!({"text": "밥 먹었어?", "style": "formal"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Model is not ready yet");
    }

    #[tokio::test]
    async fn health_reports_load_state() {
        let app = app(Transformer::local(Arc::new(StillLoading)));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"status": "unavailable", "backend": "local", "state": "loading"}));
    }

    #[tokio::test]
    async fn only_the_deployed_endpoint_is_mounted() {
        let app = app(Transformer::local(Flaky::ok("x")));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"message": "a", "style": "formal"}).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_only() {
        let preflight = |origin: &'static str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/generate_text")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap()
        };
        let app = app(Transformer::local(Flaky::ok("x")));

        let allowed = app.clone().oneshot(preflight("http://localhost:3000")).await.unwrap();
        assert_eq!(
            allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            allowed.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );

        let denied = app.oneshot(preflight("http://evil.example")).await.unwrap();
        assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
