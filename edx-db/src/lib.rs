//! In-memory SQLite conversation log.
//!
//! Holds the chats of one process and their messages. Nothing is written to
//! disk; the log lives as long as the [`Database`] does.
//!
//! # Usage
//!
//! ```rust
//! use edx_db::models::Role;
//! use edx_db::Database;
//!
//! let db = Database::new().unwrap();
//! let chat = db.create_chat("Land cover for Kerala 2023").unwrap();
//! db.append_message(chat.id, Role::User, "Land cover for Kerala 2023").unwrap();
//! assert_eq!(db.query_messages(chat.id).unwrap().len(), 1);
//! ```

pub mod models;
mod queries;
pub mod schema;
mod writer;

use rusqlite::Connection;
use std::cell::RefCell;
use std::rc::Rc;

/// Longest chat name taken from the opening query, in characters.
pub const CHAT_NAME_CHARS: usize = 50;

/// Conversation log backed by an in-memory SQLite database.
///
/// Cheaply cloneable; clones share the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Rc<RefCell<Connection>>,
}

impl Database {
    /// Create a new in-memory database with the schema applied.
    pub fn new() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Rc::new(RefCell::new(conn)),
        })
    }
}
