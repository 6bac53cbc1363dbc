//! HTTP handlers
//!
//! Thin wrappers mapping HTTP requests onto the dialogue controller.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Html,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tr_core::DialogueError;

use crate::error::{ApiError, Result};
use crate::page::render_index;
use crate::server::AppState;
use crate::session::resolve_session;

// ============================================================================
// Request/Response types
// ============================================================================

/// Chat request payload
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// User message
    #[serde(default)]
    pub message: String,
}

/// Chat response payload
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Assistant reply
    pub response: String,
}

/// Clear response payload
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

/// Session info response
#[derive(Debug, Serialize)]
pub struct SessionInfoResponse {
    pub session_id: String,
    pub message_count: usize,
    /// Completed user/assistant exchanges
    pub turns: usize,
    pub domain: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub domain: String,
    pub provider_configured: bool,
    pub sessions: usize,
}

// ============================================================================
// Handler functions
// ============================================================================

/// Chat page; creates the session if needed
pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Result<(CookieJar, Html<String>)> {
    let (jar, session_id) = resolve_session(jar, state.cookie_name());
    let context = state.controller.start_session(&session_id).await?;
    Ok((jar, Html(render_index(&context.domain))))
}

/// Send a message and return the assistant reply
pub async fn chat(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<ChatResponse>)> {
    // A missing credential wins over a bad body
    if !state.controller.is_configured() {
        return Err(DialogueError::NotConfigured.into());
    }

    let Json(req) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let (jar, session_id) = resolve_session(jar, state.cookie_name());
    debug!("Chat request for session {}: {} chars", session_id, req.message.len());

    let response = state.controller.send_message(&session_id, &req.message).await?;
    Ok((jar, Json(ChatResponse { response })))
}

/// Reset the conversation to its system seed
pub async fn clear_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ClearResponse>)> {
    let (jar, session_id) = resolve_session(jar, state.cookie_name());
    state.controller.clear_session(&session_id).await?;
    Ok((
        jar,
        Json(ClearResponse {
            message: "Conversation history cleared".to_string(),
        }),
    ))
}

/// Current session info
pub async fn session_info(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionInfoResponse>)> {
    let (jar, session_id) = resolve_session(jar, state.cookie_name());
    let (message_count, turns) = state
        .controller
        .history(&session_id)
        .await?
        .map(|h| (h.len(), h.turns()))
        .unwrap_or((0, 0));

    Ok((
        jar,
        Json(SessionInfoResponse {
            session_id,
            message_count,
            turns,
            domain: state.controller.domain().to_string(),
        }),
    ))
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok",
        domain: state.controller.domain().to_string(),
        provider_configured: state.controller.is_configured(),
        sessions: state.controller.session_count().await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use http::{Request, StatusCode, header};
    use serde_json::Value;
    use tower::ServiceExt;

    use tr_core::{Config, DialogueController, DomainPrompt, Error, MemorySessionStore, TextGenerator};

    use crate::server::build_router;

    const COOKIE: &str = "topic_relay_session=test-session";

    struct StubGenerator {
        reply: std::result::Result<String, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, _prompt: &str) -> tr_core::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().map_err(Error::Provider)
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn app(reply: Option<std::result::Result<&str, &str>>) -> (Router, AppState, Option<Arc<StubGenerator>>) {
        let prompt = DomainPrompt::new("Python programming help");
        let store = Arc::new(MemorySessionStore::new(prompt.instruction()));
        let stub = reply.map(|r| {
            Arc::new(StubGenerator {
                reply: r.map(str::to_string).map_err(str::to_string),
                calls: AtomicUsize::new(0),
            })
        });
        let generator: Option<Arc<dyn TextGenerator>> =
            stub.clone().map(|s| s as Arc<dyn TextGenerator>);
        let state = AppState::new(Config::default(), DialogueController::new(prompt, store, generator));
        (build_router(state.clone()), state, stub)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::COOKIE, COOKIE)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::COOKIE, COOKIE)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn history_len(state: &AppState) -> usize {
        state
            .controller
            .history("test-session")
            .await
            .unwrap()
            .map(|h| h.len())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_index_starts_session_and_sets_cookie() {
        let (router, state, _) = app(None);

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("topic_relay_session="));
        assert!(set_cookie.contains("HttpOnly"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Python programming help"));
        assert_eq!(state.controller.session_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_index_reuses_existing_cookie() {
        let (router, state, _) = app(None);

        let response = router.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(history_len(&state).await, 1);
    }

    #[tokio::test]
    async fn test_chat_success() {
        let (router, state, stub) = app(Some(Ok("It's a concise way to build lists.")));

        let response = router
            .oneshot(post_json("/chat", r#"{"message": "What is a list comprehension?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"response": "It's a concise way to build lists."})
        );
        assert_eq!(history_len(&state).await, 3);
        assert_eq!(stub.unwrap().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chat_blank_message_is_400() {
        let (router, state, stub) = app(Some(Ok("unused")));
        router.clone().oneshot(get("/")).await.unwrap();

        let response = router
            .oneshot(post_json("/chat", r#"{"message": "  "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
        assert_eq!(history_len(&state).await, 1);
        assert_eq!(stub.unwrap().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chat_missing_field_and_malformed_json_are_400() {
        let (router, _, _) = app(Some(Ok("unused")));

        let response = router.clone().oneshot(post_json("/chat", "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router.oneshot(post_json("/chat", "{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_chat_not_configured_is_500() {
        let (router, state, _) = app(None);

        let response = router
            .oneshot(post_json("/chat", r#"{"message": "hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("not configured"));
        assert_eq!(history_len(&state).await, 0);
    }

    #[tokio::test]
    async fn test_chat_not_configured_wins_over_bad_input() {
        let (router, state, _) = app(None);

        let response = router
            .clone()
            .oneshot(post_json("/chat", r#"{"message": "   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json_body(response).await["error"].as_str().unwrap().contains("not configured"));

        let response = router.oneshot(post_json("/chat", "{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(history_len(&state).await, 0);
    }

    #[tokio::test]
    async fn test_chat_provider_error_is_500_and_not_persisted() {
        let (router, state, _) = app(Some(Err("503 Service Unavailable: overloaded")));
        router.clone().oneshot(get("/")).await.unwrap();

        let response = router
            .oneshot(post_json("/chat", r#"{"message": "hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Provider error: 503 Service Unavailable: overloaded");
        assert_eq!(history_len(&state).await, 1);
    }

    #[tokio::test]
    async fn test_clear_resets_history() {
        let (router, state, _) = app(Some(Ok("ok")));
        router.clone().oneshot(post_json("/chat", r#"{"message": "one"}"#)).await.unwrap();
        router.clone().oneshot(post_json("/chat", r#"{"message": "two"}"#)).await.unwrap();
        assert_eq!(history_len(&state).await, 5);

        let response = router.oneshot(post_json("/clear", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"message": "Conversation history cleared"})
        );
        assert_eq!(history_len(&state).await, 1);
    }

    #[tokio::test]
    async fn test_session_info_and_health() {
        let (router, _, _) = app(Some(Ok("ok")));
        router.clone().oneshot(post_json("/chat", r#"{"message": "hi"}"#)).await.unwrap();

        let response = router.clone().oneshot(get("/api/session")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["session_id"], "test-session");
        assert_eq!(body["message_count"], 3);
        assert_eq!(body["turns"], 1);
        assert_eq!(body["domain"], "Python programming help");

        let response = router.oneshot(get("/health")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider_configured"], true);
        assert_eq!(body["sessions"], 1);
    }
}
