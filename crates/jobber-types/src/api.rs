use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Notification, NotificationKind};

// -- JWT Claims --

/// JWT claims shared across jobber-api (REST middleware) and jobber-server
/// (WebSocket upgrade). Canonical definition lives here in jobber-types to
/// eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnseenCountEntry {
    pub counterpart_id: Uuid,
    pub count: u32,
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination: pass the `created_at` timestamp of the
    /// oldest message from the previous page to fetch older messages.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    50
}

// -- Connections --

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionResponse {
    pub id: Uuid,
    pub counterpart_id: Uuid,
    pub counterpart_username: String,
    pub is_pending: bool,
    pub last_message: Option<Message>,
    pub unseen_count: u32,
    /// max(last message time, connection creation time); listing is sorted
    /// by this, descending
    pub activity_at: DateTime<Utc>,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyRequest {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    #[serde(default)]
    pub post_id: Option<Uuid>,
    #[serde(default)]
    pub bid_id: Option<Uuid>,
    #[serde(default)]
    pub comment_id: Option<Uuid>,
    #[serde(default)]
    pub reply_id: Option<Uuid>,
    pub snippet: String,
}

/// A notification enriched at read time from its source content. Enrichment
/// fields are absent when the source was deleted.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResponse {
    #[serde(flatten)]
    pub notification: Notification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_amount: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UnseenNotificationsResponse {
    pub count: u64,
}
