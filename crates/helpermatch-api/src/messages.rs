use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use helpermatch_types::api::SendMessageRequest;
use helpermatch_types::models::{ConversationSummary, Message};

use crate::error::ApiResult;
use crate::messaging;
use crate::middleware::AuthUser;
use crate::state::{AppState, run_db};

pub async fn list_conversations(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let conversations = run_db(&state, move |s| messaging::list_conversations(&s.db, claims.sub)).await?;
    Ok(Json(conversations))
}

pub async fn get_messages(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = run_db(&state, move |s| {
        messaging::fetch_messages(&s.db, conversation_id, claims.sub)
    })
    .await?;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = run_db(&state, move |s| {
        messaging::send_message(&s.db, claims.sub, req.receiver_id, &req.content)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
