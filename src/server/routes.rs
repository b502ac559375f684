//! HTTP route handlers for the Bloom chat API.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router, middleware};
use serde::{Deserialize, Serialize};
use tower_cookies::CookieManagerLayer;

use crate::chat::core::errors::ChatError;
use crate::chat::core::types::{Conversation, Message};
use crate::chat::engine::SendChatRequest;

use super::error::ApiError;
use super::identity::{OwnerId, resolve_owner};
use super::locale::Locale;
use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/get-chat-by-id/{conversation_id}", get(get_chat_by_id))
        .route("/get-chat-list", get(get_chat_list))
        .route("/send-chat", post(send_chat))
        .route("/get-all-msgs-by-id/{conversation_id}", get(get_all_msgs_by_id))
        .route("/delete-chat/{conversation_id}", delete(delete_chat))
        .route("/delete-all-chat", delete(delete_all_chat))
        .route("/edit-chat", post(edit_chat))
        .layer(middleware::from_fn(resolve_owner))
        .layer(CookieManagerLayer::new())
        .route("/healthz", get(health_check))
        .with_state(state)
}

/// Liveness probe.
async fn health_check() -> &'static str {
    "OK"
}

fn body_or_validation<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ChatError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ChatError::Validation(rejection.body_text()))
}

/// Single conversation response.
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    /// Always true.
    pub success: bool,
    /// Human-readable status.
    pub message: String,
    /// The conversation.
    pub conversation: Conversation,
}

async fn get_chat_by_id(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    locale: Locale,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation = state
        .conversations
        .get_by_id(&conversation_id)
        .await
        .map_err(ApiError::localized(locale))?;

    Ok(Json(ConversationResponse {
        success: true,
        message: format!("Conversation with ID {conversation_id} found"),
        conversation,
    }))
}

/// Conversation list response.
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    /// False when the owner has no conversation.
    pub success: bool,
    /// Human-readable status.
    pub message: String,
    /// Conversations, newest first.
    pub conversations: Vec<Conversation>,
}

async fn get_chat_list(
    State(state): State<Arc<AppState>>,
    Extension(OwnerId(owner)): Extension<OwnerId>,
    locale: Locale,
) -> Result<Json<ConversationListResponse>, ApiError> {
    let conversations = state
        .conversations
        .list_by_owner(&owner)
        .await
        .map_err(ApiError::localized(locale))?;

    let found = !conversations.is_empty();
    Ok(Json(ConversationListResponse {
        success: found,
        message: if found {
            "Conversations found".to_string()
        } else {
            "Conversations not found".to_string()
        },
        conversations,
    }))
}

/// Send-chat request body.
#[derive(Debug, Deserialize)]
pub struct SendChatBody {
    /// Sender role.
    pub role: String,
    /// Message text.
    pub content: String,
    /// Existing conversation to continue.
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Model override.
    #[serde(default)]
    pub model: Option<String>,
}

/// Send-chat response.
#[derive(Debug, Serialize)]
pub struct SendChatResponse {
    /// Always true.
    pub success: bool,
    /// Conversation the turn landed in.
    pub conversation_id: String,
    /// Reply role.
    pub role: String,
    /// Reply text.
    pub content: String,
    /// Upstream creation time.
    pub created: i64,
    /// Present when the conversation was auto-named by this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_name: Option<String>,
}

async fn send_chat(
    State(state): State<Arc<AppState>>,
    Extension(OwnerId(owner)): Extension<OwnerId>,
    locale: Locale,
    payload: Result<Json<SendChatBody>, JsonRejection>,
) -> Result<Json<SendChatResponse>, ApiError> {
    let body = body_or_validation(payload).map_err(ApiError::localized(locale))?;
    let request = SendChatRequest {
        role: body.role,
        content: body.content,
        conversation_id: body.conversation_id,
        model: body.model,
    };

    let outcome = state
        .orchestrator
        .send_chat(&owner, request)
        .await
        .map_err(ApiError::localized(locale))?;

    Ok(Json(SendChatResponse {
        success: true,
        conversation_id: outcome.conversation_id,
        role: outcome.role,
        content: outcome.content,
        created: outcome.created,
        conversation_name: outcome.conversation_name,
    }))
}

async fn get_all_msgs_by_id(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    locale: Locale,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state
        .messages
        .list_by_conversation(&conversation_id)
        .await
        .map_err(ApiError::localized(locale))?;
    Ok(Json(messages))
}

/// Deletion status response.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Always true.
    pub success: bool,
    /// Human-readable status.
    pub message: String,
}

async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    locale: Locale,
) -> Result<Json<DeleteResponse>, ApiError> {
    state
        .conversations
        .delete_by_id(&conversation_id)
        .await
        .map_err(ApiError::localized(locale))?;

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Conversation with ID {conversation_id} deleted successfully"),
    }))
}

async fn delete_all_chat(
    State(state): State<Arc<AppState>>,
    Extension(OwnerId(owner)): Extension<OwnerId>,
    locale: Locale,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state
        .conversations
        .delete_all_by_owner(&owner)
        .await
        .map_err(ApiError::localized(locale))?;

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Deleted {deleted} conversations and their messages for user ID {owner}"),
    }))
}

/// Rename request body.
#[derive(Debug, Deserialize)]
pub struct EditChatBody {
    /// Conversation to rename.
    pub conversation_id: String,
    /// New display name.
    pub new_name: String,
}

/// Rename response.
#[derive(Debug, Serialize)]
pub struct EditChatResponse {
    /// Renamed conversation id.
    pub id: String,
    /// Name now stored.
    pub conversation_name: String,
}

async fn edit_chat(
    State(state): State<Arc<AppState>>,
    Extension(OwnerId(owner)): Extension<OwnerId>,
    locale: Locale,
    payload: Result<Json<EditChatBody>, JsonRejection>,
) -> Result<Json<EditChatResponse>, ApiError> {
    let body = body_or_validation(payload).map_err(ApiError::localized(locale))?;
    let conversation = state
        .conversations
        .rename(&body.conversation_id, &owner, &body.new_name)
        .await
        .map_err(ApiError::localized(locale))?;

    Ok(Json(EditChatResponse {
        id: conversation.id,
        conversation_name: conversation.name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::chat::core::config::{AppConfig, CompletionConfig};
    use crate::chat::storage::open_in_memory;
    use crate::llm::testing::{STUB_CREATED, STUB_TITLE, StubMode, StubUpstream, spawn_stub};

    async fn test_app(mode: StubMode) -> (Router, StubUpstream) {
        let stub = spawn_stub(mode).await;
        let config = AppConfig {
            completion: CompletionConfig {
                endpoint: stub.endpoint.clone(),
                api_key: "sk-test".to_string(),
                ..CompletionConfig::default()
            },
            ..AppConfig::default()
        };
        let conn = open_in_memory().await.unwrap();
        let state = AppState::new(config, conn).unwrap();
        (create_router(state), stub)
    }

    fn json_request(method: &str, uri: &str, owner: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("user-id", owner)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str, owner: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("user-id", owner)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(app: &Router, owner: &str, content: &str, conversation_id: Option<&str>) -> Value {
        let mut body = json!({ "role": "user", "content": content });
        if let Some(id) = conversation_id {
            body["conversation_id"] = json!(id);
        }
        let response = app
            .clone()
            .oneshot(json_request("POST", "/send-chat", owner, &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await
    }

    #[tokio::test]
    async fn test_healthz() {
        let (app, _stub) = test_app(StubMode::Echo).await;
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_send_chat_on_empty_store_creates_conversation_one() {
        let (app, _stub) = test_app(StubMode::Echo).await;

        let body = send(&app, "alice", "Hi", None).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["conversation_id"], "1");
        assert_eq!(body["role"], "assistant");
        assert_eq!(body["content"], "echo: Hi");
        assert_eq!(body["created"], STUB_CREATED);
        assert!(body.get("conversation_name").is_none());

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/get-all-msgs-by-id/1", "alice"))
            .await
            .unwrap();
        let messages = json_body(response).await;
        let messages = messages.as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["content"], "echo: Hi");
    }

    #[tokio::test]
    async fn test_send_chat_without_identity_sets_cookie() {
        let (app, _stub) = test_app(StubMode::Echo).await;
        let request = Request::builder()
            .method("POST")
            .uri("/send-chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"role": "user", "content": "Hi"}).to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(set_cookie.starts_with("user_id="));
    }

    #[tokio::test]
    async fn test_second_exchange_returns_conversation_name() {
        let (app, _stub) = test_app(StubMode::Echo).await;

        send(&app, "alice", "Hi", None).await;
        let body = send(&app, "alice", "How are you?", Some("1")).await;
        assert_eq!(body["conversation_name"], STUB_TITLE);

        let response = app
            .oneshot(empty_request("GET", "/get-chat-by-id/1", "alice"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Conversation with ID 1 found");
        assert_eq!(body["conversation"]["conversationName"], STUB_TITLE);
        assert_eq!(body["conversation"]["userID"], "alice");
    }

    #[tokio::test]
    async fn test_chat_list_is_scoped_to_owner() {
        let (app, _stub) = test_app(StubMode::Echo).await;
        send(&app, "alice", "first", None).await;
        send(&app, "alice", "second", None).await;

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/get-chat-list", "alice"))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        let ids: Vec<&str> = body["conversations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["2", "1"]);

        let response = app
            .oneshot(empty_request("GET", "/get-chat-list", "bob"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Conversations not found");
        assert_eq!(body["conversations"], json!([]));
    }

    #[tokio::test]
    async fn test_malformed_body_is_localized_bad_request() {
        let (app, stub) = test_app(StubMode::Echo).await;

        let response = app
            .clone()
            .oneshot(json_request("POST", "/send-chat", "alice", &json!({"content": "Hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "bad request");
        assert!(body["trace_id"].is_string());

        let mut request = json_request("POST", "/send-chat", "alice", &json!({"role": "user"}));
        request
            .headers_mut()
            .insert(header::ACCEPT_LANGUAGE, "vi-VN".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "không thể thực hiện yêu cầu");

        assert!(stub.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let (app, _stub) = test_app(StubMode::ServerError).await;
        let response = app
            .oneshot(json_request(
                "POST",
                "/send-chat",
                "alice",
                &json!({"role": "user", "content": "Hi"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_missing_conversation_is_not_found() {
        let (app, _stub) = test_app(StubMode::Echo).await;
        let response = app
            .oneshot(empty_request("GET", "/get-chat-by-id/42", "alice"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_chat_removes_messages() {
        let (app, _stub) = test_app(StubMode::Echo).await;
        send(&app, "alice", "Hi", None).await;

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", "/delete-chat/1", "alice"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Conversation with ID 1 deleted successfully");

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/get-all-msgs-by-id/1", "alice"))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, json!([]));

        let response = app
            .oneshot(empty_request("DELETE", "/delete-chat/1", "alice"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_all_chat() {
        let (app, _stub) = test_app(StubMode::Echo).await;
        send(&app, "alice", "one", None).await;
        send(&app, "alice", "two", None).await;
        send(&app, "bob", "three", None).await;

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", "/delete-all-chat", "alice"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body["message"],
            "Deleted 2 conversations and their messages for user ID alice"
        );

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", "/delete-all-chat", "alice"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(empty_request("GET", "/get-chat-by-id/3", "bob"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_edit_chat_checks_owner() {
        let (app, _stub) = test_app(StubMode::Echo).await;
        send(&app, "alice", "Hi", None).await;

        let rename = json!({"conversation_id": "1", "new_name": "  Trip plans "});
        let response = app
            .clone()
            .oneshot(json_request("POST", "/edit-chat", "alice", &rename))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body, json!({"id": "1", "conversation_name": "Trip plans"}));

        let response = app
            .clone()
            .oneshot(json_request("POST", "/edit-chat", "bob", &rename))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let blank = json!({"conversation_id": "1", "new_name": "  "});
        let response = app
            .oneshot(json_request("POST", "/edit-chat", "alice", &blank))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
