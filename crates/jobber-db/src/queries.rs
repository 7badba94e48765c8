use crate::models::{
    BidRow, CommentRow, ConnectionRow, MessageRow, NotificationRow, ReplyRow, UnseenCountRow,
    UserRow,
};
use crate::{Database, now_ts};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// Collaborator-facing seam: user CRUD belongs to the profile service,
    /// which writes through this.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        notify_bids: bool,
        notify_comments: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, notify_bids, notify_comments, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, username, notify_bids, notify_comments, now_ts()],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn block_user(&self, user_id: &str, blocked_user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO blocked_users (user_id, blocked_user_id) VALUES (?1, ?2)",
                [user_id, blocked_user_id],
            )?;
            Ok(())
        })
    }

    /// True if either side has blocked the other.
    pub fn is_blocked_either(&self, a: &str, b: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM blocked_users
                     WHERE (user_id = ?1 AND blocked_user_id = ?2)
                        OR (user_id = ?2 AND blocked_user_id = ?1)",
                    [a, b],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(exists.is_some())
        })
    }

    // -- Connections --

    /// Idempotent per (owner, counterpart): creates the entry with the given
    /// pending flag, or leaves an existing one alone unless `clear_pending`
    /// asks for the request to be marked accepted.
    /// Returns true if a new row was created.
    pub fn upsert_connection(
        &self,
        id: &str,
        owner_id: &str,
        counterpart_id: &str,
        pending_if_created: bool,
        clear_pending: bool,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO connections (id, owner_id, counterpart_id, is_pending, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(owner_id, counterpart_id) DO NOTHING",
                rusqlite::params![id, owner_id, counterpart_id, pending_if_created, now_ts()],
            )?;

            if inserted == 0 && clear_pending {
                conn.execute(
                    "UPDATE connections SET is_pending = 0
                     WHERE owner_id = ?1 AND counterpart_id = ?2",
                    [owner_id, counterpart_id],
                )?;
            }

            Ok(inserted > 0)
        })
    }

    /// No-op when no entry exists yet; the pointer is a recomputable cache.
    pub fn set_last_message(
        &self,
        owner_id: &str,
        counterpart_id: &str,
        message_id: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE connections SET last_message_id = ?3
                 WHERE owner_id = ?1 AND counterpart_id = ?2",
                [owner_id, counterpart_id, message_id],
            )?;
            Ok(())
        })
    }

    pub fn get_connection(
        &self,
        owner_id: &str,
        counterpart_id: &str,
    ) -> Result<Option<ConnectionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, counterpart_id, is_pending, last_message_id, created_at
                 FROM connections WHERE owner_id = ?1 AND counterpart_id = ?2",
            )?;
            let row = stmt
                .query_row([owner_id, counterpart_id], map_connection_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_connections(&self, owner_id: &str) -> Result<Vec<ConnectionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, counterpart_id, is_pending, last_message_id, created_at
                 FROM connections WHERE owner_id = ?1",
            )?;
            let rows = stmt
                .query_map([owner_id], map_connection_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, row: &MessageRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, kind, text, url, post_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    row.id,
                    row.sender_id,
                    row.receiver_id,
                    row.kind,
                    row.text,
                    row.url,
                    row.post_id,
                    row.created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, kind, text, url, post_id, created_at
                 FROM messages WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_message_row).optional()?;
            Ok(row)
        })
    }

    /// Add `user_id` to the hidden set of a single message (used for the
    /// blocked-sender silent drop).
    pub fn hide_message_for(&self, message_id: &str, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO message_hidden (message_id, user_id) VALUES (?1, ?2)",
                [message_id, user_id],
            )?;
            Ok(())
        })
    }

    /// Add `viewer_id` to the seen set of every message counterpart→viewer.
    /// Idempotent; returns the number of newly seen messages.
    pub fn mark_conversation_seen(&self, viewer_id: &str, counterpart_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO message_seen (message_id, user_id)
                 SELECT id, ?1 FROM messages
                 WHERE sender_id = ?2 AND receiver_id = ?1",
                [viewer_id, counterpart_id],
            )?;
            Ok(n)
        })
    }

    /// Add `viewer_id` to the hidden set of every message in the pair, both
    /// directions. Idempotent; the counterpart's view is unaffected.
    pub fn hide_conversation_for(&self, viewer_id: &str, counterpart_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO message_hidden (message_id, user_id)
                 SELECT id, ?1 FROM messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)",
                [viewer_id, counterpart_id],
            )?;
            Ok(n)
        })
    }

    /// Messages addressed to the viewer, not yet seen, not hidden, grouped
    /// by sender.
    pub fn unseen_counts(&self, viewer_id: &str) -> Result<Vec<UnseenCountRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.sender_id, COUNT(*) FROM messages m
                 WHERE m.receiver_id = ?1
                   AND NOT EXISTS (SELECT 1 FROM message_seen s
                                   WHERE s.message_id = m.id AND s.user_id = ?1)
                   AND NOT EXISTS (SELECT 1 FROM message_hidden h
                                   WHERE h.message_id = m.id AND h.user_id = ?1)
                 GROUP BY m.sender_id",
            )?;
            let rows = stmt
                .query_map([viewer_id], |row| {
                    Ok(UnseenCountRow {
                        sender_id: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// One page of the pair's history as visible to the viewer, newest
    /// first; callers reverse for ascending replay. Ties break on id so
    /// pagination is deterministic.
    pub fn get_conversation(
        &self,
        viewer_id: &str,
        counterpart_id: &str,
        limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.sender_id, m.receiver_id, m.kind, m.text, m.url, m.post_id, m.created_at
                 FROM messages m
                 WHERE ((m.sender_id = ?1 AND m.receiver_id = ?2)
                     OR (m.sender_id = ?2 AND m.receiver_id = ?1))
                   AND NOT EXISTS (SELECT 1 FROM message_hidden h
                                   WHERE h.message_id = m.id AND h.user_id = ?1)
                   AND (?3 IS NULL OR m.created_at < ?3)
                 ORDER BY m.created_at DESC, m.id DESC
                 LIMIT ?4",
            )?;
            let rows = stmt
                .query_map(
                    rusqlite::params![viewer_id, counterpart_id, before, limit],
                    map_message_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn is_hidden_for(&self, message_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM message_hidden WHERE message_id = ?1 AND user_id = ?2",
                    [message_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(exists.is_some())
        })
    }

    // -- Notifications --

    pub fn insert_notification(&self, row: &NotificationRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO notifications
                 (id, owner_id, kind, post_id, bid_id, comment_id, reply_id, sender_id, snippet, seen, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    row.id,
                    row.owner_id,
                    row.kind,
                    row.post_id,
                    row.bid_id,
                    row.comment_id,
                    row.reply_id,
                    row.sender_id,
                    row.snippet,
                    row.seen,
                    row.created_at
                ],
            )?;
            Ok(())
        })
    }

    /// Most recent first, ties by id.
    pub fn list_notifications(&self, owner_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, kind, post_id, bid_id, comment_id, reply_id,
                        sender_id, snippet, seen, created_at
                 FROM notifications WHERE owner_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([owner_id], map_notification_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn mark_all_notifications_seen(&self, owner_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET seen = 1 WHERE owner_id = ?1 AND seen = 0",
                [owner_id],
            )?;
            Ok(n)
        })
    }

    /// Badge count: unseen rows whose kind passes the preference gate.
    /// A muted category never inflates the count, even retroactively.
    pub fn unseen_notification_count(
        &self,
        owner_id: &str,
        bids: bool,
        comments: bool,
    ) -> Result<u64> {
        self.with_conn(|conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications
                 WHERE owner_id = ?1 AND seen = 0
                   AND (kind IN ('connection', 'message')
                        OR (kind IN ('bid', 'hired') AND ?2)
                        OR (kind IN ('comment', 'reply') AND ?3))",
                rusqlite::params![owner_id, bids, comments],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Retention sweep: only seen notifications age out; unseen rows are
    /// never purged regardless of age.
    pub fn purge_seen_notifications_before(&self, cutoff: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM notifications WHERE seen = 1 AND created_at < ?1",
                [cutoff],
            )?;
            Ok(n)
        })
    }

    // -- Marketplace content (enrichment reads + collaborator write seams) --

    pub fn insert_post(&self, id: &str, author_id: &str, title: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, title) VALUES (?1, ?2, ?3)",
                [id, author_id, title],
            )?;
            Ok(())
        })
    }

    pub fn insert_bid(
        &self,
        id: &str,
        post_id: &str,
        bidder_id: &str,
        amount: i64,
        pitch: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO bids (id, post_id, bidder_id, amount, pitch) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, post_id, bidder_id, amount, pitch],
            )?;
            Ok(())
        })
    }

    pub fn insert_comment(&self, id: &str, post_id: &str, author_id: &str, body: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author_id, body) VALUES (?1, ?2, ?3, ?4)",
                [id, post_id, author_id, body],
            )?;
            Ok(())
        })
    }

    pub fn insert_reply(&self, id: &str, comment_id: &str, author_id: &str, body: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO replies (id, comment_id, author_id, body) VALUES (?1, ?2, ?3, ?4)",
                [id, comment_id, author_id, body],
            )?;
            Ok(())
        })
    }

    pub fn get_bid(&self, id: &str) -> Result<Option<BidRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, post_id, bidder_id, amount, pitch FROM bids WHERE id = ?1")?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(BidRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        bidder_id: row.get(2)?,
                        amount: row.get(3)?,
                        pitch: row.get(4)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, post_id, author_id, body FROM comments WHERE id = ?1")?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        author_id: row.get(2)?,
                        body: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_reply(&self, id: &str) -> Result<Option<ReplyRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, comment_id, author_id, body FROM replies WHERE id = ?1")?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(ReplyRow {
                        id: row.get(0)?,
                        comment_id: row.get(1)?,
                        author_id: row.get(2)?,
                        body: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, notify_bids, notify_comments, created_at FROM users WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                notify_bids: row.get(2)?,
                notify_comments: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn map_connection_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConnectionRow> {
    Ok(ConnectionRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        counterpart_id: row.get(2)?,
        is_pending: row.get(3)?,
        last_message_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        kind: row.get(3)?,
        text: row.get(4)?,
        url: row.get(5)?,
        post_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_notification_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind: row.get(2)?,
        post_id: row.get(3)?,
        bid_id: row.get(4)?,
        comment_id: row.get(5)?,
        reply_id: row.get(6)?,
        sender_id: row.get(7)?,
        snippet: row.get(8)?,
        seen: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::now_ts;

    fn db_with_users(users: &[&str]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for (i, name) in users.iter().enumerate() {
            db.create_user(&format!("u{}", i + 1), name, true, true)
                .unwrap();
        }
        db
    }

    fn message(id: &str, sender: &str, receiver: &str, text: &str) -> MessageRow {
        MessageRow {
            id: id.into(),
            sender_id: sender.into(),
            receiver_id: receiver.into(),
            kind: "text".into(),
            text: Some(text.into()),
            url: None,
            post_id: None,
            created_at: now_ts(),
        }
    }

    #[test]
    fn connection_upsert_is_idempotent() {
        let db = db_with_users(&["ana", "bo"]);

        assert!(db.upsert_connection("c1", "u1", "u2", false, false).unwrap());
        // Second attempt with a different candidate id: no duplicate row
        assert!(!db.upsert_connection("c9", "u1", "u2", false, false).unwrap());

        let rows = db.list_connections("u1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "c1");
    }

    #[test]
    fn upsert_clears_pending_on_reply() {
        let db = db_with_users(&["ana", "bo"]);

        db.upsert_connection("c1", "u2", "u1", true, false).unwrap();
        assert!(db.get_connection("u2", "u1").unwrap().unwrap().is_pending);

        // bo replies: the request is accepted
        db.upsert_connection("c2", "u2", "u1", false, true).unwrap();
        assert!(!db.get_connection("u2", "u1").unwrap().unwrap().is_pending);
    }

    #[test]
    fn last_message_pointer_noop_without_entry() {
        let db = db_with_users(&["ana", "bo"]);
        db.insert_message(&message("m1", "u1", "u2", "hey")).unwrap();

        // No connection row yet: must not fail, must not create one
        db.set_last_message("u1", "u2", "m1").unwrap();
        assert!(db.get_connection("u1", "u2").unwrap().is_none());

        db.upsert_connection("c1", "u1", "u2", false, false).unwrap();
        db.set_last_message("u1", "u2", "m1").unwrap();
        let row = db.get_connection("u1", "u2").unwrap().unwrap();
        assert_eq!(row.last_message_id.as_deref(), Some("m1"));
    }

    #[test]
    fn seen_and_hidden_sets_are_idempotent() {
        let db = db_with_users(&["ana", "bo"]);
        db.insert_message(&message("m1", "u1", "u2", "one")).unwrap();
        db.insert_message(&message("m2", "u1", "u2", "two")).unwrap();

        assert_eq!(db.mark_conversation_seen("u2", "u1").unwrap(), 2);
        assert_eq!(db.mark_conversation_seen("u2", "u1").unwrap(), 0);

        assert_eq!(db.hide_conversation_for("u2", "u1").unwrap(), 2);
        assert_eq!(db.hide_conversation_for("u2", "u1").unwrap(), 0);
        // Other participant's view untouched
        assert!(!db.is_hidden_for("m1", "u1").unwrap());
    }

    #[test]
    fn unseen_counts_exclude_seen_and_hidden() {
        let db = db_with_users(&["ana", "bo", "cy"]);
        db.insert_message(&message("m1", "u1", "u3", "a")).unwrap();
        db.insert_message(&message("m2", "u1", "u3", "b")).unwrap();
        db.insert_message(&message("m3", "u2", "u3", "c")).unwrap();
        db.hide_message_for("m2", "u3").unwrap();

        let mut counts = db.unseen_counts("u3").unwrap();
        counts.sort_by(|a, b| a.sender_id.cmp(&b.sender_id));
        assert_eq!(counts.len(), 2);
        assert_eq!((counts[0].sender_id.as_str(), counts[0].count), ("u1", 1));
        assert_eq!((counts[1].sender_id.as_str(), counts[1].count), ("u2", 1));

        db.mark_conversation_seen("u3", "u1").unwrap();
        let counts = db.unseen_counts("u3").unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].sender_id, "u2");
    }

    #[test]
    fn conversation_page_respects_viewer_visibility() {
        let db = db_with_users(&["ana", "bo"]);
        db.insert_message(&message("m1", "u1", "u2", "a")).unwrap();
        db.insert_message(&message("m2", "u2", "u1", "b")).unwrap();
        db.hide_message_for("m1", "u1").unwrap();

        let for_ana = db.get_conversation("u1", "u2", 50, None).unwrap();
        assert_eq!(for_ana.len(), 1);
        assert_eq!(for_ana[0].id, "m2");

        let for_bo = db.get_conversation("u2", "u1", 50, None).unwrap();
        assert_eq!(for_bo.len(), 2);
    }

    #[test]
    fn retention_purges_only_seen_and_old() {
        let db = db_with_users(&["ana", "bo"]);
        let old = "2020-01-01T00:00:00.000000Z".to_string();
        let mk = |id: &str, seen: bool, created_at: &str| NotificationRow {
            id: id.into(),
            owner_id: "u1".into(),
            kind: "bid".into(),
            post_id: None,
            bid_id: None,
            comment_id: None,
            reply_id: None,
            sender_id: "u2".into(),
            snippet: "snippet".into(),
            seen,
            created_at: created_at.into(),
        };
        db.insert_notification(&mk("n1", true, &old)).unwrap();
        db.insert_notification(&mk("n2", false, &old)).unwrap();
        db.insert_notification(&mk("n3", true, &now_ts())).unwrap();

        let purged = db
            .purge_seen_notifications_before("2024-01-01T00:00:00.000000Z")
            .unwrap();
        assert_eq!(purged, 1);

        let left: Vec<String> = db
            .list_notifications("u1")
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert!(left.contains(&"n2".to_string()));
        assert!(left.contains(&"n3".to_string()));
        assert!(!left.contains(&"n1".to_string()));
    }

    #[test]
    fn gated_badge_count() {
        let db = db_with_users(&["ana", "bo"]);
        let mk = |id: &str, kind: &str| NotificationRow {
            id: id.into(),
            owner_id: "u1".into(),
            kind: kind.into(),
            post_id: None,
            bid_id: None,
            comment_id: None,
            reply_id: None,
            sender_id: "u2".into(),
            snippet: String::new(),
            seen: false,
            created_at: now_ts(),
        };
        db.insert_notification(&mk("n1", "bid")).unwrap();
        db.insert_notification(&mk("n2", "comment")).unwrap();
        db.insert_notification(&mk("n3", "connection")).unwrap();

        assert_eq!(db.unseen_notification_count("u1", true, true).unwrap(), 3);
        assert_eq!(db.unseen_notification_count("u1", false, true).unwrap(), 2);
        assert_eq!(db.unseen_notification_count("u1", false, false).unwrap(), 1);
    }
}
