//! Raw SQLite rows with ids and timestamps still as text. The `From` impls
//! turn them into the typed read models from `leafcare-types`.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

use leafcare_types::models::{Answer, Author, Chat, ChatMessage, ChatSummary, Question, Sender, User};

pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub image: Option<&'a str>,
    pub password_hash: &'a str,
}

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub image: Option<String>,
    pub password: String,
    pub created_at: String,
}

pub struct AuthorRow {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

pub struct ChatRow {
    pub id: String,
    pub author: AuthorRow,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub sender: String,
    pub content: String,
    pub image_url: Option<String>,
    pub detected_disease: Option<String>,
    pub timestamp: String,
}

pub struct ChatSummaryRow {
    pub id: String,
    pub title: String,
    pub message_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

pub struct QuestionRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: AuthorRow,
    pub views: i64,
    pub answers: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub image_url: Option<String>,
    pub crop: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct AnswerRow {
    pub id: String,
    pub question_id: String,
    pub author: AuthorRow,
    pub content: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Current time in the fixed-width form every table stores, so that
/// lexical order on the column equals chronological order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone suffix.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

fn parse_id(kind: &str, raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", kind, raw, e);
        Uuid::default()
    })
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Author {
            id: parse_id("author", &row.id),
            name: row.name.unwrap_or_else(|| "unknown".to_string()),
            image: row.image,
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: parse_id("user", &row.id),
            name: row.name,
            username: row.username,
            email: row.email,
            image: row.image,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            sender: row.sender.parse().unwrap_or_else(|e| {
                warn!("Corrupt sender on chat message: {}", e);
                Sender::User
            }),
            content: row.content,
            timestamp: parse_timestamp(&row.timestamp),
            image_url: row.image_url,
            detected_disease: row.detected_disease,
        }
    }
}

impl ChatRow {
    pub fn into_chat(self, messages: Vec<MessageRow>) -> Chat {
        Chat {
            id: parse_id("chat", &self.id),
            author: self.author.into(),
            title: self.title,
            messages: messages.into_iter().map(ChatMessage::from).collect(),
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        }
    }
}

impl From<ChatSummaryRow> for ChatSummary {
    fn from(row: ChatSummaryRow) -> Self {
        ChatSummary {
            id: parse_id("chat", &row.id),
            title: row.title,
            message_count: row.message_count,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: parse_id("question", &row.id),
            title: row.title,
            content: row.content,
            author: row.author.into(),
            views: row.views,
            answers: row.answers,
            upvotes: row.upvotes,
            downvotes: row.downvotes,
            image_url: row.image_url,
            crop: row.crop,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Answer {
            id: parse_id("answer", &row.id),
            question_id: parse_id("question", &row.question_id),
            author: row.author.into(),
            content: row.content,
            upvotes: row.upvotes,
            downvotes: row.downvotes,
            image_url: row.image_url,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_forms() {
        let rfc = parse_timestamp("2024-03-01T10:20:30.123456Z");
        assert_eq!(rfc.to_rfc3339_opts(SecondsFormat::Micros, true), "2024-03-01T10:20:30.123456Z");

        let sqlite = parse_timestamp("2024-03-01 10:20:30");
        assert_eq!(sqlite.to_rfc3339_opts(SecondsFormat::Secs, true), "2024-03-01T10:20:30Z");

        assert_eq!(parse_timestamp("garbage"), DateTime::<Utc>::default());
    }

    #[test]
    fn stored_timestamps_sort_lexically() {
        let a = now_timestamp();
        let b = now_timestamp();
        assert_eq!(a.len(), b.len());
        assert!(a <= b);
    }
}
