//! HTTP API gateway for Parley.
//!
//! Exposes session lifecycle, chat, history, feedback, and configuration
//! reload endpoints in front of a shared [`ChatPipeline`].
//!
//! Built on Axum for high performance async HTTP.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use parley_agent::{ChatPipeline, TurnOutcome};
use parley_core::session::{SessionId, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub pipeline: Arc<ChatPipeline>,
}

type SharedState = Arc<GatewayState>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS restricted to `gateway.allowed_origins`
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let gateway = state.pipeline.snapshot().config.gateway.clone();

    let origins: Vec<HeaderValue> = gateway
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600));

    let mut router = Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/chat/start", post(start_chat_handler))
        .route("/chat/{session_id}", post(chat_handler))
        .route("/chat_history/{session_id}", get(history_handler))
        .route("/submit_feedback", post(feedback_handler))
        .route("/reload_config", post(reload_config_handler))
        .with_state(state);

    if let Some(dir) = gateway.static_dir {
        info!(dir = %dir.display(), "Serving static files under /static");
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// `port_override` takes precedence over `gateway.port`.
pub async fn start(
    pipeline: Arc<ChatPipeline>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = pipeline.snapshot().config.gateway.clone();
    let port = port_override.unwrap_or(gateway.port);
    let addr = format!("{}:{port}", gateway.host);

    let app = build_router(Arc::new(GatewayState { pipeline }));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Request / response bodies ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartChatResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub history: Vec<Turn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub session_id: String,
    pub feedback: String,
    #[serde(default = "anonymous")]
    pub user: String,
}

fn anonymous() -> String {
    "anonymous".into()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: e.to_string() }),
    )
}

// --- Handlers ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

async fn start_chat_handler(State(state): State<SharedState>) -> ApiResult<StartChatResponse> {
    let id = state.pipeline.start_session().await.map_err(|e| {
        error!(error = %e, "Failed to start session");
        internal_error(e)
    })?;

    Ok(Json(StartChatResponse {
        session_id: id.to_string(),
    }))
}

async fn chat_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> ApiResult<TurnOutcome> {
    info!(
        session_id = %session_id,
        message_len = payload.user_message.len(),
        "Chat message received"
    );

    let outcome = state
        .pipeline
        .handle_turn(&SessionId::from(&session_id), &payload.user_message)
        .await
        .map_err(|e| {
            error!(session_id = %session_id, error = %e, "Turn failed");
            internal_error(e)
        })?;

    Ok(Json(outcome))
}

async fn history_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> ApiResult<HistoryResponse> {
    let session = state
        .pipeline
        .history(&SessionId::from(&session_id))
        .await
        .map_err(internal_error)?;

    Ok(Json(HistoryResponse {
        session_id,
        history: session.history,
    }))
}

async fn feedback_handler(
    State(state): State<SharedState>,
    Json(payload): Json<FeedbackRequest>,
) -> Json<FeedbackResponse> {
    state
        .pipeline
        .record_feedback(&payload.session_id, &payload.user, &payload.feedback);

    Json(FeedbackResponse {
        status: "success".into(),
        message: "Feedback received".into(),
    })
}

async fn reload_config_handler(State(state): State<SharedState>) -> ApiResult<MessageResponse> {
    state.pipeline.reload_config().map_err(|e| {
        error!(error = %e, "Configuration reload rejected");
        internal_error(e)
    })?;

    Ok(Json(MessageResponse {
        message: "Configuration reloaded".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use parley_agent::{ContextRetriever, TurnStatus, WordListLexicon};
    use parley_config::{AppConfig, ConfigHandle};
    use parley_core::document::{DocumentHandle, DocumentStore};
    use parley_core::error::{DocumentError, ProviderError};
    use parley_core::provider::{Embedder, GenerationRequest, GenerationResponse, Generator};
    use parley_memory::{InMemorySessionStore, InMemoryVectorIndex};
    use tower::ServiceExt;

    /// Lightweight mock generator for gateway tests.
    struct MockGenerator {
        response_text: String,
    }

    #[async_trait]
    impl Generator for MockGenerator {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
            Ok(GenerationResponse {
                text: self.response_text.clone(),
                model: request.model,
                usage: None,
            })
        }
    }

    struct ZeroEmbedder;

    #[async_trait]
    impl Embedder for ZeroEmbedder {
        fn model(&self) -> &str {
            "zero"
        }

        async fn embed_text(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![0.0; 4])
        }
    }

    struct EmptyDocs;

    #[async_trait]
    impl DocumentStore for EmptyDocs {
        async fn fetch_cached(
            &self,
            _project: &str,
            file_name: &str,
            _folder: Option<&str>,
        ) -> Result<DocumentHandle, DocumentError> {
            Err(DocumentError::Fetch {
                file_name: file_name.into(),
                status: 404,
            })
        }

        async fn extract_text(&self, _handle: &DocumentHandle, _pages: Option<&[usize]>) -> Result<String, DocumentError> {
            Ok(String::new())
        }

        fn file_url(&self, file_name: &str, _folder: Option<&str>) -> String {
            format!("https://files.test/{file_name}")
        }
    }

    fn pipeline_with(config: ConfigHandle) -> Arc<ChatPipeline> {
        let retriever = ContextRetriever::new(
            Arc::new(InMemoryVectorIndex::new()),
            Arc::new(ZeroEmbedder),
            Arc::new(EmptyDocs),
        );
        Arc::new(ChatPipeline::new(
            Arc::new(config),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(MockGenerator {
                response_text: "Mock response from Harper".into(),
            }),
            retriever,
            Arc::new(WordListLexicon::from_words(["hello", "there", "tell", "about", "team"])),
        ))
    }

    fn app() -> Router {
        let config = ConfigHandle::from_config(AppConfig::default()).unwrap();
        build_router(Arc::new(GatewayState {
            pipeline: pipeline_with(config),
        }))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        for uri in ["/", "/health"] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app().oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let json: HealthResponse = json_body(response).await;
            assert_eq!(json.status, "ok");
        }
    }

    #[tokio::test]
    async fn start_chat_returns_uuid() {
        let req = Request::builder()
            .method("POST")
            .uri("/chat/start")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: StartChatResponse = json_body(response).await;
        assert_eq!(json.session_id.len(), 36);
    }

    #[tokio::test]
    async fn chat_then_history() {
        let app = app();

        let response = app
            .clone()
            .oneshot(post_json("/chat/s-1", serde_json::json!({ "user_message": "hello there" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let outcome: TurnOutcome = json_body(response).await;
        assert_eq!(outcome.session_id, "s-1");
        assert_eq!(outcome.status, TurnStatus::Answered);
        assert_eq!(outcome.bot_response, "Mock response from Harper");
        assert_eq!(outcome.history.len(), 1);

        let req = Request::builder()
            .uri("/chat_history/s-1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: HistoryResponse = json_body(response).await;
        assert_eq!(json.history, vec![Turn::new("hello there", "Mock response from Harper")]);
    }

    #[tokio::test]
    async fn gibberish_gets_canned_reply() {
        let response = app()
            .oneshot(post_json("/chat/s-2", serde_json::json!({ "user_message": "asdfghjkl qwertyuiop" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = json_body(response).await;
        assert_eq!(json["status"], "gibberish");
        assert!(json["mode"].is_null());
        assert_eq!(json["bot_response"], AppConfig::default().responses.gibberish);
    }

    #[tokio::test]
    async fn unknown_session_history_is_empty() {
        let req = Request::builder()
            .uri("/chat_history/missing")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: HistoryResponse = json_body(response).await;
        assert!(json.history.is_empty());
    }

    #[tokio::test]
    async fn chat_without_body_is_rejected() {
        let response = app()
            .oneshot(post_json("/chat/s-3", serde_json::json!({ "message": "wrong field" })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn feedback_is_acknowledged() {
        let response = app()
            .oneshot(post_json(
                "/submit_feedback",
                serde_json::json!({ "session_id": "s-1", "feedback": "Helpful", "user": "tester" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: FeedbackResponse = json_body(response).await;
        assert_eq!(json.status, "success");
    }

    #[tokio::test]
    async fn reload_config_succeeds_and_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bot]\nname = \"Harper\"\n").unwrap();

        let app = build_router(Arc::new(GatewayState {
            pipeline: pipeline_with(ConfigHandle::load(&path).unwrap()),
        }));

        let response = app
            .clone()
            .oneshot(post_json("/reload_config", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        std::fs::write(&path, "[gibberish]\nratio = 5.0\n").unwrap();
        let response = app
            .oneshot(post_json("/reload_config", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json: ErrorResponse = json_body(response).await;
        assert!(json.error.contains("gibberish.ratio"));
    }
}
