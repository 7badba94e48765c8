use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde_json::{Value, json};
use uuid::Uuid;

use jobber_types::api::{Claims, ConversationQuery, UnseenCountEntry};
use jobber_types::events::GatewayEvent;
use jobber_types::models::Message;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /messages/unseen: per-counterpart unseen message counts.
pub async fn unseen_counts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UnseenCountEntry>>, ApiError> {
    let counts = state.messages.unseen_counts(claims.sub).await?;
    Ok(Json(counts))
}

/// POST /messages/{counterpart_id}/seen: mark every message from the
/// counterpart as seen, then tell the counterpart's live channels so open
/// threads can flip their read receipts.
pub async fn mark_seen(
    State(state): State<AppState>,
    Path(counterpart_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let marked = state.messages.mark_seen(claims.sub, counterpart_id).await?;

    state
        .dispatcher
        .deliver_to(counterpart_id, GatewayEvent::MessagesSeen { user_id: claims.sub })
        .await;

    Ok(Json(json!({ "marked_seen": marked })))
}

/// DELETE /conversations/{counterpart_id}: hide the whole thread for the
/// caller only; the counterpart's view is untouched.
pub async fn hide_conversation(
    State(state): State<AppState>,
    Path(counterpart_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let hidden = state
        .messages
        .hide_conversation(claims.sub, counterpart_id)
        .await?;
    Ok(Json(json!({ "hidden": hidden })))
}

/// GET /conversations/{counterpart_id}/messages?limit=&before=: a page of
/// the thread, ascending by time.
pub async fn conversation(
    State(state): State<AppState>,
    Path(counterpart_id): Path<Uuid>,
    Query(query): Query<ConversationQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state
        .messages
        .conversation(claims.sub, counterpart_id, query.limit, query.before)
        .await?;
    Ok(Json(messages))
}
