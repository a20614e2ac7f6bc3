use crate::chat::{self, ChatTurn};
use crate::companion::{self, CompanionProfile, NewCompanion, Tone, Visibility};
use crate::error::StoreError;
use crate::reply::Message;
use crate::store::{CompanionStore, UserAccount};
use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

use super::AppState;
use super::session::{clear_session_cookie, session_cookie, session_user_id};

/// Upper bound for `GET /api/conversations`.
pub(super) const CONVERSATION_LIST_LIMIT: usize = 50;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SessionBody {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CompanionBody {
    pub name: Option<String>,
    pub archetype: Option<String>,
    pub tone: Option<Tone>,
    pub boundaries: Option<Vec<String>>,
    pub bio: Option<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChatBody {
    pub companion_id: Option<String>,
    pub companion_name: Option<String>,
    pub conversation_id: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({"error": message}))).into_response()
}

fn internal_error(action: &str, error: &StoreError) -> Response {
    tracing::error!(%error, "{action}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": action, "details": error.to_string()})),
    )
        .into_response()
}

fn invalid_json(rejection: &JsonRejection) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        &format!("Invalid JSON: {rejection}"),
    )
}

/// Resolve the session cookie to a stored account.
async fn current_user(
    store: &dyn CompanionStore,
    headers: &HeaderMap,
) -> Result<Option<UserAccount>, StoreError> {
    let Some(user_id) = session_user_id(headers) else {
        return Ok(None);
    };
    store.get_user(&user_id).await
}

/// GET /health — always public.
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "persistence": state.persistence(),
    }))
}

/// GET /api/auth/session
pub(super) async fn handle_session_get(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let Some(store) = &state.store else {
        return Json(serde_json::json!({
            "success": true,
            "persistence": "in-memory",
            "user": null,
        }))
        .into_response();
    };

    match current_user(store.as_ref(), &headers).await {
        Ok(user) => Json(serde_json::json!({
            "success": true,
            "persistence": "postgres",
            "user": user,
        }))
        .into_response(),
        Err(error) => internal_error("failed to fetch session", &error),
    }
}

/// POST /api/auth/session — upsert the account, set the session cookie.
pub(super) async fn handle_session_create(
    State(state): State<AppState>,
    body: Result<Json<SessionBody>, JsonRejection>,
) -> Response {
    let Some(store) = &state.store else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "session auth requires a configured database",
                "persistence": "in-memory",
            })),
        )
            .into_response();
    };

    let Json(session_body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_json(&e),
    };

    let Some(email) = session_body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
    else {
        return error_response(StatusCode::BAD_REQUEST, "email is required");
    };
    let email = email.to_lowercase();

    let display_name = session_body
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    match store.upsert_user(&email, display_name).await {
        Ok(user) => {
            tracing::info!(email, "session established");
            let cookie = session_cookie(&user.id);
            (
                StatusCode::OK,
                [(header::SET_COOKIE, cookie)],
                Json(serde_json::json!({
                    "success": true,
                    "persistence": "postgres",
                    "user": user,
                })),
            )
                .into_response()
        }
        Err(error) => internal_error("failed to create session", &error),
    }
}

/// DELETE /api/auth/session — clear the session cookie.
pub(super) async fn handle_session_delete() -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(serde_json::json!({"success": true})),
    )
        .into_response()
}

/// GET /api/companions
pub(super) async fn handle_companions_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let Some(store) = &state.store else {
        return sample_companions_response("in-memory");
    };

    let user = match current_user(store.as_ref(), &headers).await {
        Ok(user) => user,
        Err(error) => return internal_error("failed to fetch companions", &error),
    };

    let Some(user) = user else {
        return sample_companions_response("postgres");
    };

    match store.list_companions(&user.id).await {
        // Users without companions of their own still get the samples.
        Ok(companions) if companions.is_empty() => sample_companions_response("postgres"),
        Ok(companions) => companions_response("postgres", &companions),
        Err(error) => internal_error("failed to fetch companions", &error),
    }
}

fn sample_companions_response(persistence: &str) -> Response {
    companions_response(persistence, &companion::sample_companions())
}

fn companions_response(persistence: &str, companions: &[CompanionProfile]) -> Response {
    Json(serde_json::json!({
        "success": true,
        "persistence": persistence,
        "total": companions.len(),
        "companions": companions,
    }))
    .into_response()
}

/// POST /api/companions
pub(super) async fn handle_companion_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CompanionBody>, JsonRejection>,
) -> Response {
    let Json(companion_body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_json(&e),
    };

    let (Some(name), Some(archetype), Some(tone)) = (
        companion_body.name.as_deref().filter(|n| !n.is_empty()),
        companion_body.archetype.as_deref().filter(|a| !a.is_empty()),
        companion_body.tone,
    ) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "name, archetype, and tone are required",
        );
    };

    let new = NewCompanion {
        name: name.to_string(),
        archetype: archetype.to_string(),
        tone,
        boundaries: companion_body
            .boundaries
            .unwrap_or_else(|| vec!["No harmful content".into()]),
        bio: companion_body
            .bio
            .unwrap_or_else(|| "Custom companion profile".into()),
        visibility: companion_body.visibility.unwrap_or(Visibility::Private),
    };

    let Some(store) = &state.store else {
        let profile = CompanionProfile::create(new);
        return Json(serde_json::json!({
            "success": true,
            "persistence": "in-memory",
            "companion": profile,
        }))
        .into_response();
    };

    let user = match current_user(store.as_ref(), &headers).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_response(StatusCode::UNAUTHORIZED, "unauthorized"),
        Err(error) => return internal_error("failed to create companion", &error),
    };

    match store.create_companion(&user.id, new).await {
        Ok(profile) => Json(serde_json::json!({
            "success": true,
            "persistence": "postgres",
            "companion": profile,
        }))
        .into_response(),
        Err(error) => internal_error("failed to create companion", &error),
    }
}

/// POST /api/chat
pub(super) async fn handle_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Response {
    let Json(chat_body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_json(&e),
    };

    let Some(store) = &state.store else {
        return stateless_chat(&state, chat_body).await;
    };

    let user = match current_user(store.as_ref(), &headers).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_response(StatusCode::UNAUTHORIZED, "unauthorized"),
        Err(error) => return internal_error("failed to generate response", &error),
    };

    let Some(message) = chat_body
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
    else {
        return error_response(StatusCode::BAD_REQUEST, "message is required");
    };

    let turn = ChatTurn {
        companion_id: chat_body.companion_id,
        companion_name: chat_body.companion_name,
        conversation_id: chat_body.conversation_id,
        message: message.to_string(),
    };

    match chat::run_persistent_turn(store.as_ref(), &state.generator, &user, turn).await {
        Ok(outcome) => Json(serde_json::json!({
            "success": true,
            "persistence": "postgres",
            "conversationId": outcome.conversation.id,
            "response": {
                "role": "assistant",
                "content": outcome.reply.content,
            },
            "model": outcome.reply.model,
        }))
        .into_response(),
        Err(error) => internal_error("failed to generate response", &error),
    }
}

/// Stateless chat: context comes entirely from the request body.
async fn stateless_chat(state: &AppState, chat_body: ChatBody) -> Response {
    let effective = chat::effective_messages(chat_body.messages, chat_body.message.as_deref());
    if effective.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "messages are required");
    }

    let profile = companion::resolve_sample(
        chat_body.companion_id.as_deref(),
        chat_body.companion_name.as_deref(),
    );
    let reply = state.generator.reply(&profile, &effective).await;

    Json(serde_json::json!({
        "success": true,
        "persistence": "in-memory",
        "response": {
            "role": "assistant",
            "content": reply.content,
        },
        "model": reply.model,
    }))
    .into_response()
}

/// GET /api/conversations
pub(super) async fn handle_conversations_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let Some(store) = &state.store else {
        return Json(serde_json::json!({
            "success": true,
            "persistence": "in-memory",
            "conversations": [],
        }))
        .into_response();
    };

    let user = match current_user(store.as_ref(), &headers).await {
        Ok(user) => user,
        Err(error) => return internal_error("failed to fetch conversations", &error),
    };

    let Some(user) = user else {
        return Json(serde_json::json!({
            "success": true,
            "persistence": "postgres",
            "conversations": [],
        }))
        .into_response();
    };

    match store
        .list_conversations(&user.id, CONVERSATION_LIST_LIMIT)
        .await
    {
        Ok(conversations) => Json(serde_json::json!({
            "success": true,
            "persistence": "postgres",
            "conversations": conversations,
        }))
        .into_response(),
        Err(error) => internal_error("failed to fetch conversations", &error),
    }
}

/// GET /api/conversations/{conversationId}/messages
pub(super) async fn handle_conversation_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Response {
    let Some(store) = &state.store else {
        return Json(serde_json::json!({
            "success": true,
            "persistence": "in-memory",
            "messages": [],
        }))
        .into_response();
    };

    let user = match current_user(store.as_ref(), &headers).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_response(StatusCode::UNAUTHORIZED, "unauthorized"),
        Err(error) => return internal_error("failed to fetch conversation messages", &error),
    };

    let conversation = match store.get_conversation(&user.id, &conversation_id).await {
        Ok(Some(conversation)) => conversation,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "conversation not found"),
        Err(error) => return internal_error("failed to fetch conversation messages", &error),
    };

    match store.list_messages(&conversation.id).await {
        Ok(messages) => Json(serde_json::json!({
            "success": true,
            "persistence": "postgres",
            "conversationId": conversation.id,
            "messages": messages,
        }))
        .into_response(),
        Err(error) => internal_error("failed to fetch conversation messages", &error),
    }
}
