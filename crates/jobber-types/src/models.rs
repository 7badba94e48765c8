use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminant for the message payload. Exactly one payload field is
/// populated per kind: `text` for Text, `url` for Link/Image/Media,
/// `post_id` for Post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Link,
    Post,
    Image,
    Media,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Link => "link",
            Self::Post => "post",
            Self::Image => "image",
            Self::Media => "media",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "link" => Some(Self::Link),
            "post" => Some(Self::Post),
            "image" => Some(Self::Image),
            "media" => Some(Self::Media),
            _ => None,
        }
    }
}

/// A direct message between two users. Immutable once created except for the
/// per-viewer `seen`/`hidden` sets, which live in the store and are surfaced
/// here only as flags resolved for the requesting viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub kind: MessageKind,
    pub text: Option<String>,
    pub url: Option<String>,
    pub post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Per-user notification preferences. `connection` and `message`
/// notifications are never gated by these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Preferences {
    pub bids: bool,
    pub comments: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Bid,
    Comment,
    Reply,
    Hired,
    Connection,
    Message,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bid => "bid",
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Hired => "hired",
            Self::Connection => "connection",
            Self::Message => "message",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bid" => Some(Self::Bid),
            "comment" => Some(Self::Comment),
            "reply" => Some(Self::Reply),
            "hired" => Some(Self::Hired),
            "connection" => Some(Self::Connection),
            "message" => Some(Self::Message),
            _ => None,
        }
    }

    /// Whether a notification of this kind passes the recipient's preference
    /// gate. Gated kinds are muted for both live push and the badge count.
    pub fn passes_gate(&self, prefs: &Preferences) -> bool {
        match self {
            Self::Bid | Self::Hired => prefs.bids,
            Self::Comment | Self::Reply => prefs.comments,
            Self::Connection | Self::Message => true,
        }
    }
}

/// A persisted activity notification. Exactly one source ref is populated,
/// consistent with the kind; `connection`/`message` kinds carry none (the
/// sender is the source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: NotificationKind,
    pub post_id: Option<Uuid>,
    pub bid_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub reply_id: Option<Uuid>,
    pub sender_id: Uuid,
    pub snippet: String,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_covers_every_kind() {
        let muted = Preferences { bids: false, comments: false };
        let open = Preferences { bids: true, comments: true };

        for kind in [
            NotificationKind::Bid,
            NotificationKind::Hired,
            NotificationKind::Comment,
            NotificationKind::Reply,
        ] {
            assert!(!kind.passes_gate(&muted));
            assert!(kind.passes_gate(&open));
        }

        // Never gated
        assert!(NotificationKind::Connection.passes_gate(&muted));
        assert!(NotificationKind::Message.passes_gate(&muted));
    }

    #[test]
    fn kind_strings_round_trip() {
        for s in ["text", "link", "post", "image", "media"] {
            assert_eq!(MessageKind::parse(s).unwrap().as_str(), s);
        }
        assert!(MessageKind::parse("gif").is_none());
        assert!(NotificationKind::parse("poke").is_none());
    }
}
