//! Database row types, mapped directly from SQLite rows. Distinct from the
//! jobber-types API models to keep the storage layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub notify_bids: bool,
    pub notify_comments: bool,
    pub created_at: String,
}

pub struct ConnectionRow {
    pub id: String,
    pub owner_id: String,
    pub counterpart_id: String,
    pub is_pending: bool,
    pub last_message_id: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub kind: String,
    pub text: Option<String>,
    pub url: Option<String>,
    pub post_id: Option<String>,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub owner_id: String,
    pub kind: String,
    pub post_id: Option<String>,
    pub bid_id: Option<String>,
    pub comment_id: Option<String>,
    pub reply_id: Option<String>,
    pub sender_id: String,
    pub snippet: String,
    pub seen: bool,
    pub created_at: String,
}

pub struct UnseenCountRow {
    pub sender_id: String,
    pub count: u32,
}

pub struct BidRow {
    pub id: String,
    pub post_id: String,
    pub bidder_id: String,
    pub amount: i64,
    pub pitch: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub body: String,
}

pub struct ReplyRow {
    pub id: String,
    pub comment_id: String,
    pub author_id: String,
    pub body: String,
}
