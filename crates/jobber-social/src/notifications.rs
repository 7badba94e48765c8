use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use jobber_db::models::NotificationRow;
use jobber_db::{Database, format_ts, now_ts};
use jobber_types::api::NotificationResponse;
use jobber_types::models::{Notification, NotificationKind, Preferences};

use crate::error::{Result, SocialError};
use crate::messages::{parse_created_at, parse_uuid};
use crate::run_blocking;

/// Seen notifications older than this are swept; unseen ones never are.
pub const RETENTION_DAYS: i64 = 30;

/// Persists activity notifications and decides, per recipient, whether they
/// are pushed live. Persistence is unconditional; the preference gate only
/// controls push and the badge count.
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<Database>,
}

/// Reference to the originating content. Exactly one id is populated,
/// consistent with the notification kind; `connection`/`message` carry none.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRef {
    pub post_id: Option<Uuid>,
    pub bid_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub reply_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct NotifyOutcome {
    pub notification: Notification,
    /// The recipient's preference gate allows a live push.
    pub push: bool,
}

impl NotificationService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn notify(
        &self,
        recipient_id: Uuid,
        kind: NotificationKind,
        source: SourceRef,
        sender_id: Uuid,
        snippet: String,
    ) -> Result<NotifyOutcome> {
        validate_source(kind, &source)?;

        let db = self.db.clone();
        let (row, push) = run_blocking(move || {
            let recipient = recipient_id.to_string();
            let recipient_row = db
                .get_user_by_id(&recipient)?
                .ok_or_else(|| SocialError::not_found("recipient"))?;
            if db.get_user_by_id(&sender_id.to_string())?.is_none() {
                return Err(SocialError::not_found("sender"));
            }

            let row = NotificationRow {
                id: Uuid::new_v4().to_string(),
                owner_id: recipient,
                kind: kind.as_str().to_string(),
                post_id: source.post_id.map(|v| v.to_string()),
                bid_id: source.bid_id.map(|v| v.to_string()),
                comment_id: source.comment_id.map(|v| v.to_string()),
                reply_id: source.reply_id.map(|v| v.to_string()),
                sender_id: sender_id.to_string(),
                snippet,
                seen: false,
                created_at: now_ts(),
            };
            db.insert_notification(&row)?;

            let prefs = Preferences {
                bids: recipient_row.notify_bids,
                comments: recipient_row.notify_comments,
            };
            Ok((row, kind.passes_gate(&prefs)))
        })
        .await?;

        Ok(NotifyOutcome {
            notification: notification_from_row(&row),
            push,
        })
    }

    /// The owner's notifications, newest first, enriched at read time.
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<NotificationResponse>> {
        let db = self.db.clone();
        run_blocking(move || {
            let rows = db.list_notifications(&owner_id.to_string())?;
            rows.iter()
                .map(|row| enrich_one(&db, notification_from_row(row)))
                .collect()
        })
        .await
    }

    /// Resolve current source content for bid/comment/reply notifications.
    /// Editing the source is reflected here; a dangling reference degrades
    /// gracefully: the notification is returned with enrichment absent.
    pub async fn enrich(&self, notifications: Vec<Notification>) -> Result<Vec<NotificationResponse>> {
        let db = self.db.clone();
        run_blocking(move || {
            notifications
                .into_iter()
                .map(|n| enrich_one(&db, n))
                .collect()
        })
        .await
    }

    /// Badge count: unseen notifications passing the recipient's gate.
    pub async fn unseen_count(&self, owner_id: Uuid) -> Result<u64> {
        let db = self.db.clone();
        run_blocking(move || {
            let owner = owner_id.to_string();
            let user = db
                .get_user_by_id(&owner)?
                .ok_or_else(|| SocialError::not_found("user"))?;
            Ok(db.unseen_notification_count(&owner, user.notify_bids, user.notify_comments)?)
        })
        .await
    }

    /// Flip every unseen notification to seen. Returns how many flipped.
    pub async fn mark_all_seen(&self, owner_id: Uuid) -> Result<usize> {
        let db = self.db.clone();
        run_blocking(move || Ok(db.mark_all_notifications_seen(&owner_id.to_string())?)).await
    }

    /// Retention sweep: purge seen notifications older than the retention
    /// window. Returns the number purged.
    pub async fn sweep(&self) -> Result<usize> {
        let db = self.db.clone();
        run_blocking(move || {
            let cutoff = format_ts(Utc::now() - Duration::days(RETENTION_DAYS));
            Ok(db.purge_seen_notifications_before(&cutoff)?)
        })
        .await
    }
}

fn validate_source(kind: NotificationKind, source: &SourceRef) -> Result<()> {
    let want = match kind {
        NotificationKind::Bid => (false, true, false, false),
        NotificationKind::Comment => (false, false, true, false),
        NotificationKind::Reply => (false, false, false, true),
        NotificationKind::Hired => (true, false, false, false),
        NotificationKind::Connection | NotificationKind::Message => (false, false, false, false),
    };
    let got = (
        source.post_id.is_some(),
        source.bid_id.is_some(),
        source.comment_id.is_some(),
        source.reply_id.is_some(),
    );
    if want != got {
        return Err(SocialError::Validation(format!(
            "source reference inconsistent with kind {}",
            kind.as_str()
        )));
    }
    Ok(())
}

fn enrich_one(db: &Database, n: Notification) -> Result<NotificationResponse> {
    let (source_body, source_amount) = match n.kind {
        NotificationKind::Bid => match n.bid_id.map(|id| db.get_bid(&id.to_string())).transpose()? {
            Some(Some(bid)) => (Some(bid.pitch), Some(bid.amount)),
            _ => (None, None),
        },
        NotificationKind::Comment => {
            match n
                .comment_id
                .map(|id| db.get_comment(&id.to_string()))
                .transpose()?
            {
                Some(Some(c)) => (Some(c.body), None),
                _ => (None, None),
            }
        }
        NotificationKind::Reply => {
            match n
                .reply_id
                .map(|id| db.get_reply(&id.to_string()))
                .transpose()?
            {
                Some(Some(r)) => (Some(r.body), None),
                _ => (None, None),
            }
        }
        _ => (None, None),
    };

    Ok(NotificationResponse {
        notification: n,
        source_body,
        source_amount,
    })
}

fn notification_from_row(row: &NotificationRow) -> Notification {
    Notification {
        id: parse_uuid(&row.id, "notification id"),
        owner_id: parse_uuid(&row.owner_id, "owner_id"),
        kind: NotificationKind::parse(&row.kind).unwrap_or_else(|| {
            warn!("Corrupt notification kind '{}' on '{}'", row.kind, row.id);
            NotificationKind::Message
        }),
        post_id: row.post_id.as_deref().map(|v| parse_uuid(v, "post_id")),
        bid_id: row.bid_id.as_deref().map(|v| parse_uuid(v, "bid_id")),
        comment_id: row.comment_id.as_deref().map(|v| parse_uuid(v, "comment_id")),
        reply_id: row.reply_id.as_deref().map(|v| parse_uuid(v, "reply_id")),
        sender_id: parse_uuid(&row.sender_id, "sender_id"),
        snippet: row.snippet.clone(),
        seen: row.seen,
        created_at: parse_created_at(&row.created_at, &row.id),
    }
}
