use anyhow::{Result, anyhow};
use rusqlite::Connection;
use rusqlite::types::Value;

use leafcare_types::api::NewMessage;
use leafcare_types::models::{Chat, ChatMessage, ChatSummary};

use super::{Conditions, OptionalExt};
use crate::models::{AuthorRow, ChatRow, ChatSummaryRow, MessageRow, now_timestamp};
use crate::{Database, DbError};

impl Database {
    /// Inserts a chat with its single seed message in one transaction.
    pub fn create_chat(
        &self,
        id: &str,
        author_id: &str,
        title: &str,
        seed: &NewMessage,
    ) -> Result<Chat> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_timestamp();

            tx.execute(
                "INSERT INTO chats (id, author_id, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![id, author_id, title, now],
            )?;
            insert_message(&tx, id, seed, &now)?;

            let chat = load_chat(&tx, id)?.ok_or_else(|| anyhow!("Failed to create chat"))?;
            tx.commit()?;
            Ok(chat)
        })
    }

    /// Appends a message to a chat owned by `user_id`. Dropping the
    /// transaction on any early return rolls the write back.
    pub fn append_message(&self, chat_id: &str, user_id: &str, message: &NewMessage) -> Result<Chat> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let author_id: String = tx
                .query_row("SELECT author_id FROM chats WHERE id = ?1", [chat_id], |row| row.get(0))
                .optional()?
                .ok_or(DbError::NotFound("Chat"))?;

            if author_id != user_id {
                return Err(DbError::Forbidden(
                    "Unauthorized: You can only add messages to your own chats".to_string(),
                )
                .into());
            }

            let now = now_timestamp();
            insert_message(&tx, chat_id, message, &now)?;
            tx.execute("UPDATE chats SET updated_at = ?1 WHERE id = ?2", rusqlite::params![now, chat_id])?;

            let chat = load_chat(&tx, chat_id)?.ok_or(DbError::NotFound("Chat"))?;
            tx.commit()?;
            Ok(chat)
        })
    }

    pub fn get_chat(&self, id: &str) -> Result<Option<Chat>> {
        self.with_conn(|conn| load_chat(conn, id))
    }

    /// Messages of one of `user_id`'s chats in insertion order.
    pub fn get_chat_messages(&self, chat_id: &str, user_id: &str) -> Result<Vec<ChatMessage>> {
        self.with_conn(|conn| {
            let author_id: String = conn
                .query_row("SELECT author_id FROM chats WHERE id = ?1", [chat_id], |row| row.get(0))
                .optional()?
                .ok_or(DbError::NotFound("Chat"))?;
            if author_id != user_id {
                return Err(DbError::Forbidden("Unauthorized: You can only view your own chats".to_string()).into());
            }
            let messages = query_messages(conn, chat_id)?;
            Ok(messages.into_iter().map(ChatMessage::from).collect())
        })
    }

    /// One page of the author's chats, newest first, plus the total match count.
    pub fn list_chats(
        &self,
        author_id: &str,
        keyword: Option<&str>,
        skip: u32,
        limit: u32,
    ) -> Result<(Vec<ChatSummary>, u64)> {
        let mut conditions = Conditions::default();
        conditions.push("c.author_id = ?", [Value::Text(author_id.to_string())]);
        if let Some(keyword) = keyword {
            conditions.keyword(&["c.title"], keyword);
        }

        self.with_conn(|conn| {
            let where_sql = conditions.sql();

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM chats c {}", where_sql),
                rusqlite::params_from_iter(conditions.args.iter()),
                |r| r.get(0),
            )?;

            let mut args = conditions.args.clone();
            args.push(Value::Integer(i64::from(limit)));
            args.push(Value::Integer(i64::from(skip)));

            let mut stmt = conn.prepare(&format!(
                "SELECT c.id, c.title,
                        (SELECT COUNT(*) FROM chat_messages m WHERE m.chat_id = c.id),
                        c.created_at, c.updated_at
                 FROM chats c
                 {}
                 ORDER BY c.created_at DESC, c.rowid DESC
                 LIMIT ? OFFSET ?",
                where_sql
            ))?;

            let rows = stmt
                .query_map(rusqlite::params_from_iter(args.iter()), |row| {
                    Ok(ChatSummaryRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        message_count: row.get(2)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows.into_iter().map(ChatSummary::from).collect(), total as u64))
        })
    }
}

fn insert_message(conn: &Connection, chat_id: &str, message: &NewMessage, timestamp: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO chat_messages (chat_id, sender, content, image_url, detected_disease, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            chat_id,
            message.sender.as_str(),
            message.content,
            message.image_url,
            message.detected_disease,
            timestamp,
        ],
    )?;
    Ok(())
}

fn load_chat(conn: &Connection, id: &str) -> Result<Option<Chat>> {
    // JOIN users to populate the author in the same query
    let row = conn
        .query_row(
            "SELECT c.id, c.author_id, u.name, u.image, c.title, c.created_at, c.updated_at
             FROM chats c
             LEFT JOIN users u ON c.author_id = u.id
             WHERE c.id = ?1",
            [id],
            |row| {
                Ok(ChatRow {
                    id: row.get(0)?,
                    author: AuthorRow {
                        id: row.get(1)?,
                        name: row.get(2)?,
                        image: row.get(3)?,
                    },
                    title: row.get(4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            },
        )
        .optional()?;

    match row {
        Some(row) => {
            let messages = query_messages(conn, id)?;
            Ok(Some(row.into_chat(messages)))
        }
        None => Ok(None),
    }
}

fn query_messages(conn: &Connection, chat_id: &str) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT sender, content, image_url, detected_disease, timestamp
         FROM chat_messages
         WHERE chat_id = ?1
         ORDER BY id ASC",
    )?;

    let rows = stmt
        .query_map([chat_id], |row| {
            Ok(MessageRow {
                sender: row.get(0)?,
                content: row.get(1)?,
                image_url: row.get(2)?,
                detected_disease: row.get(3)?,
                timestamp: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
