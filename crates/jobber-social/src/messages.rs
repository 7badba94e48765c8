use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use jobber_db::models::MessageRow;
use jobber_db::{Database, now_ts, parse_ts};
use jobber_types::api::UnseenCountEntry;
use jobber_types::models::{Message, MessageKind};

use crate::error::{Result, SocialError};
use crate::pair_lock::PairLocks;
use crate::run_blocking;

/// Append-only conversation log with per-viewer visibility.
#[derive(Clone)]
pub struct MessageStore {
    db: Arc<Database>,
    locks: PairLocks,
}

/// What a successful send produced, beyond the message itself. The gateway
/// uses the flags to decide what to push and whether a connection
/// notification is due.
#[derive(Debug)]
pub struct SendOutcome {
    pub message: Message,
    /// Block in effect at send time: the message was recorded but is hidden
    /// for the receiver. Silent drop; the sender still sees success.
    pub hidden_for_receiver: bool,
    /// The receiver's connection entry was created by this send (a new
    /// pending request).
    pub receiver_connection_created: bool,
}

impl MessageStore {
    pub fn new(db: Arc<Database>, locks: PairLocks) -> Self {
        Self { db, locks }
    }

    /// Create a message. Runs entirely inside the pair critical section:
    /// validate, insert, ensure both connection rows, update both
    /// `last_message` pointers.
    pub async fn send(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        kind: MessageKind,
        text: Option<String>,
        url: Option<String>,
        post_id: Option<Uuid>,
    ) -> Result<SendOutcome> {
        validate_payload(kind, &text, &url, &post_id)?;

        let _guard = self.locks.lock(sender_id, receiver_id).await;

        let db = self.db.clone();
        let (row, hidden, receiver_created) = run_blocking(move || {
            let sender = sender_id.to_string();
            let receiver = receiver_id.to_string();

            if db.get_user_by_id(&sender)?.is_none() {
                return Err(SocialError::not_found("sender"));
            }
            if db.get_user_by_id(&receiver)?.is_none() {
                return Err(SocialError::not_found("receiver"));
            }

            let blocked = db.is_blocked_either(&sender, &receiver)?;

            let row = MessageRow {
                id: Uuid::new_v4().to_string(),
                sender_id: sender.clone(),
                receiver_id: receiver.clone(),
                kind: kind.as_str().to_string(),
                text,
                url,
                post_id: post_id.map(|p| p.to_string()),
                created_at: now_ts(),
            };
            db.insert_message(&row)?;

            // Sender's own entry: created on first contact, and a reply
            // proves any pending request from the counterpart was accepted.
            db.upsert_connection(&Uuid::new_v4().to_string(), &sender, &receiver, false, true)?;
            db.set_last_message(&sender, &receiver, &row.id)?;

            if blocked {
                // Silent drop: hidden for the receiver, and the receiver's
                // side of the graph is left untouched so nothing surfaces.
                db.hide_message_for(&row.id, &receiver)?;
                return Ok((row, true, false));
            }

            let created = db.upsert_connection(
                &Uuid::new_v4().to_string(),
                &receiver,
                &sender,
                true,
                false,
            )?;
            db.set_last_message(&receiver, &sender, &row.id)?;

            Ok((row, false, created))
        })
        .await?;

        Ok(SendOutcome {
            message: message_from_row(&row),
            hidden_for_receiver: hidden,
            receiver_connection_created: receiver_created,
        })
    }

    /// Mark every message from `counterpart_id` to `viewer_id` as seen.
    /// Idempotent; returns the number of newly seen messages.
    pub async fn mark_seen(&self, viewer_id: Uuid, counterpart_id: Uuid) -> Result<usize> {
        let db = self.db.clone();
        run_blocking(move || {
            let counterpart = counterpart_id.to_string();
            if db.get_user_by_id(&counterpart)?.is_none() {
                return Err(SocialError::not_found("counterpart"));
            }
            Ok(db.mark_conversation_seen(&viewer_id.to_string(), &counterpart)?)
        })
        .await
    }

    /// Soft-delete the whole conversation for the viewer only. Idempotent.
    pub async fn hide_conversation(&self, viewer_id: Uuid, counterpart_id: Uuid) -> Result<usize> {
        let db = self.db.clone();
        run_blocking(move || {
            let counterpart = counterpart_id.to_string();
            if db.get_user_by_id(&counterpart)?.is_none() {
                return Err(SocialError::not_found("counterpart"));
            }
            Ok(db.hide_conversation_for(&viewer_id.to_string(), &counterpart)?)
        })
        .await
    }

    /// Unseen-message counts grouped by counterpart.
    pub async fn unseen_counts(&self, viewer_id: Uuid) -> Result<Vec<UnseenCountEntry>> {
        let db = self.db.clone();
        let rows = run_blocking(move || Ok(db.unseen_counts(&viewer_id.to_string())?)).await?;

        Ok(rows
            .into_iter()
            .map(|r| UnseenCountEntry {
                counterpart_id: parse_uuid(&r.sender_id, "sender_id"),
                count: r.count,
            })
            .collect())
    }

    /// One page of history as visible to the viewer, creation time
    /// ascending (ties by id) so replay is deterministic. `before` pages
    /// backwards through older messages.
    pub async fn conversation(
        &self,
        viewer_id: Uuid,
        counterpart_id: Uuid,
        limit: u32,
        before: Option<String>,
    ) -> Result<Vec<Message>> {
        let db = self.db.clone();
        let limit = limit.min(200);
        let mut rows = run_blocking(move || {
            let counterpart = counterpart_id.to_string();
            if db.get_user_by_id(&counterpart)?.is_none() {
                return Err(SocialError::not_found("counterpart"));
            }
            Ok(db.get_conversation(
                &viewer_id.to_string(),
                &counterpart,
                limit,
                before.as_deref(),
            )?)
        })
        .await?;

        // Fetched newest-first for the LIMIT; present oldest-first.
        rows.reverse();
        Ok(rows.iter().map(message_from_row).collect())
    }
}

fn validate_payload(
    kind: MessageKind,
    text: &Option<String>,
    url: &Option<String>,
    post_id: &Option<Uuid>,
) -> Result<()> {
    let (want_text, want_url, want_post) = match kind {
        MessageKind::Text => (true, false, false),
        MessageKind::Link | MessageKind::Image | MessageKind::Media => (false, true, false),
        MessageKind::Post => (false, false, true),
    };

    if want_text && text.as_deref().map_or(true, |t| t.is_empty()) {
        return Err(SocialError::validation("text message requires text"));
    }
    if want_url && url.as_deref().map_or(true, |u| u.is_empty()) {
        return Err(SocialError::validation("link/image/media message requires url"));
    }
    if want_post && post_id.is_none() {
        return Err(SocialError::validation("post message requires post_id"));
    }

    if (!want_text && text.is_some())
        || (!want_url && url.is_some())
        || (!want_post && post_id.is_some())
    {
        return Err(SocialError::Validation(format!(
            "exactly one payload field may be populated for kind {}",
            kind.as_str()
        )));
    }

    Ok(())
}

pub(crate) fn message_from_row(row: &MessageRow) -> Message {
    Message {
        id: parse_uuid(&row.id, "message id"),
        sender_id: parse_uuid(&row.sender_id, "sender_id"),
        receiver_id: parse_uuid(&row.receiver_id, "receiver_id"),
        kind: MessageKind::parse(&row.kind).unwrap_or_else(|| {
            warn!("Corrupt message kind '{}' on message '{}'", row.kind, row.id);
            MessageKind::Text
        }),
        text: row.text.clone(),
        url: row.url.clone(),
        post_id: row.post_id.as_deref().map(|p| parse_uuid(p, "post_id")),
        created_at: parse_created_at(&row.created_at, &row.id),
    }
}

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_created_at(raw: &str, id: &str) -> chrono::DateTime<chrono::Utc> {
    parse_ts(raw).unwrap_or_else(|| {
        warn!("Corrupt created_at '{}' on '{}'", raw, id);
        chrono::DateTime::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (MessageStore, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        (MessageStore::new(db.clone(), PairLocks::new()), db)
    }

    fn seed_user(db: &Database, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        db.create_user(&id.to_string(), name, true, true).unwrap();
        id
    }

    async fn send_text(store: &MessageStore, from: Uuid, to: Uuid, body: &str) -> SendOutcome {
        store
            .send(from, to, MessageKind::Text, Some(body.into()), None, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unseen_until_marked_then_zero_and_idempotent() {
        let (store, db) = store();
        let a = seed_user(&db, "ana");
        let b = seed_user(&db, "bo");

        send_text(&store, a, b, "hi").await;
        send_text(&store, a, b, "there").await;

        let counts = store.unseen_counts(b).await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].counterpart_id, a);
        assert_eq!(counts[0].count, 2);

        store.mark_seen(b, a).await.unwrap();
        assert!(store.unseen_counts(b).await.unwrap().is_empty());

        // Repeated mark_seen: no error, count stays zero
        store.mark_seen(b, a).await.unwrap();
        assert!(store.unseen_counts(b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hidden_conversation_invisible_only_to_viewer() {
        let (store, db) = store();
        let a = seed_user(&db, "ana");
        let b = seed_user(&db, "bo");

        send_text(&store, a, b, "one").await;
        send_text(&store, b, a, "two").await;

        store.hide_conversation(b, a).await.unwrap();

        assert!(store.conversation(b, a, 50, None).await.unwrap().is_empty());
        assert_eq!(store.conversation(a, b, 50, None).await.unwrap().len(), 2);
        // Hidden also means it no longer counts as unseen
        assert!(store.unseen_counts(b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blocked_send_is_recorded_but_silently_dropped() {
        let (store, db) = store();
        let a = seed_user(&db, "ana");
        let b = seed_user(&db, "bo");
        db.block_user(&a.to_string(), &b.to_string()).unwrap();

        let out = send_text(&store, b, a, "let me in").await;
        assert!(out.hidden_for_receiver);
        assert!(!out.receiver_connection_created);

        // Persisted for audit, hidden for the receiver
        assert!(
            db.get_message(&out.message.id.to_string())
                .unwrap()
                .is_some()
        );
        assert!(
            db.is_hidden_for(&out.message.id.to_string(), &a.to_string())
                .unwrap()
        );
        assert!(store.unseen_counts(a).await.unwrap().is_empty());
        assert!(store.conversation(a, b, 50, None).await.unwrap().is_empty());
        // Sender's own view is unaffected
        assert_eq!(store.conversation(b, a, 50, None).await.unwrap().len(), 1);
        // Receiver's side of the graph untouched
        assert!(
            db.get_connection(&a.to_string(), &b.to_string())
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn first_contact_creates_pending_entry_reply_clears_it() {
        let (store, db) = store();
        let a = seed_user(&db, "ana");
        let b = seed_user(&db, "bo");

        let out = send_text(&store, a, b, "hello").await;
        assert!(out.receiver_connection_created);

        let theirs = db
            .get_connection(&b.to_string(), &a.to_string())
            .unwrap()
            .unwrap();
        assert!(theirs.is_pending);

        // bo replies: request accepted
        send_text(&store, b, a, "hello back").await;
        let theirs = db
            .get_connection(&b.to_string(), &a.to_string())
            .unwrap()
            .unwrap();
        assert!(!theirs.is_pending);
    }

    #[tokio::test]
    async fn concurrent_sends_create_no_duplicates_and_agree_on_pointer() {
        let (store, db) = store();
        let a = seed_user(&db, "ana");
        let b = seed_user(&db, "bo");

        let (r1, r2) = tokio::join!(
            store.send(a, b, MessageKind::Text, Some("x".into()), None, None),
            store.send(a, b, MessageKind::Text, Some("y".into()), None, None),
        );
        let (m1, m2) = (r1.unwrap().message, r2.unwrap().message);

        assert_eq!(db.list_connections(&a.to_string()).unwrap().len(), 1);
        assert_eq!(db.list_connections(&b.to_string()).unwrap().len(), 1);

        let ours = db
            .get_connection(&a.to_string(), &b.to_string())
            .unwrap()
            .unwrap();
        let theirs = db
            .get_connection(&b.to_string(), &a.to_string())
            .unwrap()
            .unwrap();
        // Both sides point at the same, later-persisted message
        assert_eq!(ours.last_message_id, theirs.last_message_id);
        let pointer = ours.last_message_id.unwrap();
        assert!(pointer == m1.id.to_string() || pointer == m2.id.to_string());
        let later = db
            .get_conversation(&a.to_string(), &b.to_string(), 1, None)
            .unwrap()
            .remove(0);
        assert_eq!(pointer, later.id);
    }

    #[tokio::test]
    async fn payload_must_match_kind() {
        let (store, db) = store();
        let a = seed_user(&db, "ana");
        let b = seed_user(&db, "bo");

        // Missing required field
        let err = store
            .send(a, b, MessageKind::Text, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::Validation(_)));

        // Stray extra field
        let err = store
            .send(
                a,
                b,
                MessageKind::Link,
                Some("hi".into()),
                Some("https://example.com".into()),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::Validation(_)));

        // Unknown receiver: rejected, no partial write
        let err = store
            .send(a, Uuid::new_v4(), MessageKind::Text, Some("hi".into()), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::NotFound(_)));
        assert!(store.conversation(a, b, 50, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_is_ascending_with_before_cursor() {
        let (store, db) = store();
        let a = seed_user(&db, "ana");
        let b = seed_user(&db, "bo");

        for body in ["first", "second", "third"] {
            send_text(&store, a, b, body).await;
        }

        let page = store.conversation(b, a, 50, None).await.unwrap();
        let bodies: Vec<_> = page.iter().map(|m| m.text.clone().unwrap()).collect();
        assert_eq!(bodies, ["first", "second", "third"]);

        // Page of size 2 returns the newest two, ascending; `before` the
        // older of them pages back to the first.
        let newest = store.conversation(b, a, 2, None).await.unwrap();
        assert_eq!(newest[0].text.as_deref(), Some("second"));
        assert_eq!(newest[1].text.as_deref(), Some("third"));

        let cursor = jobber_db::format_ts(newest[0].created_at);
        let older = store.conversation(b, a, 2, Some(cursor)).await.unwrap();
        assert_eq!(older.len(), 1);
        assert_eq!(older[0].text.as_deref(), Some("first"));
    }
}
