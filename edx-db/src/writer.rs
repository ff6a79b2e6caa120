//! The only write paths into the log: new chats and appended messages.

use crate::models::{ChatInfo, Role};
use crate::{Database, CHAT_NAME_CHARS};
use edx_utils::text::truncate_chars;
use rusqlite::{params, OptionalExtension};

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Database {
    /// Start a chat named after the opening query.
    ///
    /// The name is the first 50 characters of the query. When that name is
    /// taken, `_<n>` is appended where `n` is the number of existing chats.
    pub fn create_chat(&self, first_query: &str) -> anyhow::Result<ChatInfo> {
        let conn = self.conn.borrow();
        let base = truncate_chars(first_query.trim(), CHAT_NAME_CHARS).to_string();
        let existing: i64 = conn.query_row("SELECT COUNT(*) FROM chats", [], |row| row.get(0))?;

        let mut name = base.clone();
        let mut suffix = existing;
        while conn
            .query_row("SELECT id FROM chats WHERE name = ?1", params![name], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?
            .is_some()
        {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        let created_at = now();
        conn.execute(
            "INSERT INTO chats (name, created_at) VALUES (?1, ?2)",
            params![name, created_at],
        )?;
        let id = conn.last_insert_rowid();
        log::info!("Created chat {} ({})", id, name);
        Ok(ChatInfo { id, name, created_at })
    }

    /// Append a message to a chat. Returns the message id.
    pub fn append_message(&self, chat_id: i64, role: Role, content: &str) -> anyhow::Result<i64> {
        let conn = self.conn.borrow();
        conn.execute(
            "INSERT INTO messages (chat_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![chat_id, role.as_str(), content, now()],
        )?;
        let id = conn.last_insert_rowid();
        log::debug!("Appended {} message {} to chat {}", role, id, chat_id);
        Ok(id)
    }
}
