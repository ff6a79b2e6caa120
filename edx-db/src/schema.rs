//! SQL schema for the conversation log.
//!
//! Messages are append-only: triggers reject any UPDATE or DELETE on the
//! `messages` table.

/// Returns the full SQL schema as a single batch string.
///
/// - `chats` - one row per conversation, named after its first query
/// - `messages` - user and assistant turns, in insertion order
pub fn create_schema() -> &'static str {
    r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS chats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id INTEGER NOT NULL REFERENCES chats(id),
        role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id);

    CREATE TRIGGER IF NOT EXISTS messages_no_update
    BEFORE UPDATE ON messages
    BEGIN
        SELECT RAISE(ABORT, 'messages are append-only');
    END;

    CREATE TRIGGER IF NOT EXISTS messages_no_delete
    BEFORE DELETE ON messages
    BEGIN
        SELECT RAISE(ABORT, 'messages are append-only');
    END;
    "#
}
