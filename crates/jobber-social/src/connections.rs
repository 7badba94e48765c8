use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use jobber_db::Database;
use jobber_types::api::ConnectionResponse;

use crate::error::{Result, SocialError};
use crate::messages::{message_from_row, parse_created_at, parse_uuid};
use crate::run_blocking;

/// The bidirectional, possibly asymmetric-pending relationship graph.
/// Entries are created lazily on first message; the send path drives the
/// writes, this service owns maintenance and the enriched read side.
#[derive(Clone)]
pub struct ConnectionGraph {
    db: Arc<Database>,
}

impl ConnectionGraph {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Idempotent per (owner, counterpart) pair: creates the entry with the
    /// given pending flag, or leaves an existing one alone unless
    /// `clear_pending` marks the request accepted. Returns true when a new
    /// entry was created.
    pub async fn ensure(
        &self,
        owner_id: Uuid,
        counterpart_id: Uuid,
        pending_if_created: bool,
        clear_pending: bool,
    ) -> Result<bool> {
        let db = self.db.clone();
        run_blocking(move || {
            let counterpart = counterpart_id.to_string();
            if db.get_user_by_id(&counterpart)?.is_none() {
                return Err(SocialError::not_found("counterpart"));
            }
            Ok(db.upsert_connection(
                &Uuid::new_v4().to_string(),
                &owner_id.to_string(),
                &counterpart,
                pending_if_created,
                clear_pending,
            )?)
        })
        .await
    }

    /// Update the owner's last-message pointer. No-op when the entry does
    /// not exist yet; the pointer is a recomputable cache.
    pub async fn record_last_message(
        &self,
        owner_id: Uuid,
        counterpart_id: Uuid,
        message_id: Uuid,
    ) -> Result<()> {
        let db = self.db.clone();
        run_blocking(move || {
            db.set_last_message(
                &owner_id.to_string(),
                &counterpart_id.to_string(),
                &message_id.to_string(),
            )?;
            Ok(())
        })
        .await
    }

    /// The owner's connections enriched with counterpart username, last
    /// message and unseen count, sorted by most-recent activity descending.
    /// Activity time is max(last message time, connection creation time);
    /// ties break on connection id for determinism.
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<ConnectionResponse>> {
        let db = self.db.clone();
        run_blocking(move || {
            let owner = owner_id.to_string();
            let rows = db.list_connections(&owner)?;

            let unseen: HashMap<String, u32> = db
                .unseen_counts(&owner)?
                .into_iter()
                .map(|r| (r.sender_id, r.count))
                .collect();

            let mut out = Vec::with_capacity(rows.len());
            for row in rows {
                let username = db
                    .get_user_by_id(&row.counterpart_id)?
                    .map(|u| u.username)
                    .unwrap_or_else(|| "unknown".to_string());

                let last_message = match &row.last_message_id {
                    Some(id) => db.get_message(id)?.map(|m| message_from_row(&m)),
                    None => None,
                };

                let created_at = parse_created_at(&row.created_at, &row.id);
                let activity_at = last_message
                    .as_ref()
                    .map(|m| m.created_at.max(created_at))
                    .unwrap_or(created_at);

                out.push(ConnectionResponse {
                    id: parse_uuid(&row.id, "connection id"),
                    counterpart_id: parse_uuid(&row.counterpart_id, "counterpart_id"),
                    counterpart_username: username,
                    is_pending: row.is_pending,
                    unseen_count: unseen.get(&row.counterpart_id).copied().unwrap_or(0),
                    last_message,
                    activity_at,
                });
            }

            out.sort_by(|a, b| b.activity_at.cmp(&a.activity_at).then(a.id.cmp(&b.id)));
            Ok(out)
        })
        .await
    }
}
