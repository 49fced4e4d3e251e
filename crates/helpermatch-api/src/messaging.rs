//! Direct messages between two users.
//!
//! A conversation is identified by its unordered pair of participants; the
//! storage layer keys it on the canonical pair, so sends from either side and
//! concurrent first contacts all land in the same conversation.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use helpermatch_db::{Database, NewMessage};
use helpermatch_types::models::{ConversationSummary, Message};

use crate::error::{ApiError, ApiResult};
use crate::validation::validate_message;

pub fn send_message(db: &Database, sender_id: Uuid, receiver_id: Uuid, content: &str) -> ApiResult<Message> {
    validate_message(content).map_err(ApiError::Validation)?;
    if sender_id == receiver_id {
        return Err(ApiError::Validation("Cannot send a message to yourself".to_string()));
    }
    if db.get_user_by_id(receiver_id)?.is_none() {
        return Err(ApiError::NotFound("User"));
    }

    let message = db.send_message(&NewMessage {
        message_id: Uuid::new_v4(),
        conversation_id: Uuid::new_v4(),
        sender_id,
        receiver_id,
        content,
        sent_at: Utc::now(),
    })?;

    debug!("{} -> {} in {}", sender_id, receiver_id, message.conversation_id);
    Ok(message)
}

pub fn list_conversations(db: &Database, user_id: Uuid) -> ApiResult<Vec<ConversationSummary>> {
    Ok(db.list_conversations(user_id)?)
}

/// Messages of a conversation, oldest first. Marks the other side's messages
/// read. A missing conversation is reported the same way as a foreign one.
pub fn fetch_messages(db: &Database, conversation_id: Uuid, requester_id: Uuid) -> ApiResult<Vec<Message>> {
    let conversation = db.get_conversation(conversation_id)?;
    if !conversation.is_some_and(|c| c.has_participant(requester_id)) {
        debug!("{} denied access to conversation {}", requester_id, conversation_id);
        return Err(ApiError::AccessDenied);
    }

    Ok(db.read_conversation(conversation_id, requester_id)?)
}
