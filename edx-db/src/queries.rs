//! Read-side queries over the conversation log.

use crate::models::{ChatInfo, Message, Role};
use crate::Database;
use rusqlite::params;

impl Database {
    /// All chats, oldest first.
    pub fn query_chats(&self) -> anyhow::Result<Vec<ChatInfo>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM chats ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ChatInfo {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("query_chats returned {} records", rows.len());
        Ok(rows)
    }

    /// Messages of one chat in the order they were appended.
    pub fn query_messages(&self, chat_id: i64) -> anyhow::Result<Vec<Message>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, role, content, created_at
             FROM messages
             WHERE chat_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![chat_id], |row| {
                let role: String = row.get(2)?;
                Ok(Message {
                    id: row.get(0)?,
                    chat_id: row.get(1)?,
                    role: Role::parse(&role).unwrap_or(Role::Assistant),
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("query_messages({}) returned {} records", chat_id, rows.len());
        Ok(rows)
    }
}
