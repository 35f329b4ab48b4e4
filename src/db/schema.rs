//! Versioned schema migrations for postgate.
//!
//! Each entry is one migration; the index + 1 is the schema version.
//! Applied migrations are recorded in the `schema_version` table and
//! never re-run.

/// All schema migrations, oldest first.
pub const MIGRATIONS: &[&str] = &[
    // v1: address directory and delivery log
    r#"
    CREATE TABLE addresses (
        alias         TEXT PRIMARY KEY,
        chat_id       INTEGER NOT NULL,
        muted         INTEGER NOT NULL DEFAULT 0,
        next_delivery INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX idx_addresses_chat_id ON addresses(chat_id);

    CREATE TABLE delivery_log (
        chat_id    INTEGER NOT NULL,
        message_id TEXT NOT NULL,
        PRIMARY KEY (chat_id, message_id)
    );
    "#,
];
