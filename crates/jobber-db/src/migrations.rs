use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            notify_bids     INTEGER NOT NULL DEFAULT 1,
            notify_comments INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS blocked_users (
            user_id         TEXT NOT NULL REFERENCES users(id),
            blocked_user_id TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (user_id, blocked_user_id)
        );

        -- Per-owner relationship records. One row per direction; the upsert
        -- key makes concurrent first contact idempotent.
        CREATE TABLE IF NOT EXISTS connections (
            id              TEXT PRIMARY KEY,
            owner_id        TEXT NOT NULL REFERENCES users(id),
            counterpart_id  TEXT NOT NULL REFERENCES users(id),
            is_pending      INTEGER NOT NULL DEFAULT 0,
            last_message_id TEXT REFERENCES messages(id),
            created_at      TEXT NOT NULL,
            UNIQUE(owner_id, counterpart_id)
        );

        CREATE INDEX IF NOT EXISTS idx_connections_owner
            ON connections(owner_id);

        -- Append-only conversation log. Exactly one of text/url/post_id is
        -- populated, per kind.
        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            sender_id   TEXT NOT NULL REFERENCES users(id),
            receiver_id TEXT NOT NULL REFERENCES users(id),
            kind        TEXT NOT NULL,
            text        TEXT,
            url         TEXT,
            post_id     TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_receiver
            ON messages(receiver_id, sender_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_sender
            ON messages(sender_id, receiver_id, created_at);

        -- Visibility sets. Membership tables so seen/hidden checks are set
        -- lookups and repeated inserts are no-ops.
        CREATE TABLE IF NOT EXISTS message_seen (
            message_id  TEXT NOT NULL REFERENCES messages(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (message_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS message_hidden (
            message_id  TEXT NOT NULL REFERENCES messages(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (message_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            kind        TEXT NOT NULL,
            post_id     TEXT,
            bid_id      TEXT,
            comment_id  TEXT,
            reply_id    TEXT,
            sender_id   TEXT NOT NULL REFERENCES users(id),
            snippet     TEXT NOT NULL,
            seen        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_owner
            ON notifications(owner_id, created_at);

        -- Marketplace content owned by the posting/bidding collaborator.
        -- Present here only as the read surface notification enrichment
        -- resolves against.
        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL REFERENCES users(id),
            title       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bids (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id),
            bidder_id   TEXT NOT NULL REFERENCES users(id),
            amount      INTEGER NOT NULL,
            pitch       TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id),
            author_id   TEXT NOT NULL REFERENCES users(id),
            body        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS replies (
            id          TEXT PRIMARY KEY,
            comment_id  TEXT NOT NULL REFERENCES comments(id),
            author_id   TEXT NOT NULL REFERENCES users(id),
            body        TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
