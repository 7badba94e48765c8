use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, MessageKind, Notification};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, username: String },

    /// A new direct message addressed to this user
    ReceiveMessage { message: Message },

    /// A send attempt from this channel failed; delivered only to the
    /// originating channel, never broadcast
    MessageError { error: String },

    /// A notification was created for this user and passed its gate
    ReceiveNotification { notification: Notification },

    /// The given user has marked this user's messages as seen
    MessagesSeen { user_id: Uuid },

    /// Another of this user's devices marked all notifications seen
    NotificationsMarkedSeen,

    /// Advisory relay: somebody placed a bid. Carries the originating user
    /// id so clients can ignore their own echo.
    ReceiveNewBid {
        user_id: Uuid,
        payload: serde_json::Value,
    },

    /// Advisory relay: a new comment was posted
    ReceiveNewComment {
        user_id: Uuid,
        payload: serde_json::Value,
    },

    /// Advisory relay: a new reply was posted
    ReceiveNewReply {
        user_id: Uuid,
        payload: serde_json::Value,
    },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Request subscription to a delivery room. Only the channel's own
    /// authenticated identity is accepted; anything else is refused.
    Join { room_id: Uuid },

    /// Send a direct message to another user
    SendMessage {
        receiver_id: Uuid,
        kind: MessageKind,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        post_id: Option<Uuid>,
    },

    /// Relay a new-bid hint to all connected clients
    NewBid { payload: serde_json::Value },

    /// Relay a new-comment hint to all connected clients
    NewComment { payload: serde_json::Value },

    /// Relay a new-reply hint to all connected clients
    NewReply { payload: serde_json::Value },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_decode_from_tagged_json() {
        let cmd: GatewayCommand = serde_json::from_str(
            r#"{"type":"SendMessage","data":{"receiver_id":"00000000-0000-0000-0000-000000000002","kind":"text","text":"hi"}}"#,
        )
        .unwrap();
        match cmd {
            GatewayCommand::SendMessage { kind, text, url, post_id, .. } => {
                assert_eq!(kind, MessageKind::Text);
                assert_eq!(text.as_deref(), Some("hi"));
                assert!(url.is_none() && post_id.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
