use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::HistoryGroup;
use crate::models::{Answer, ChatSummary, Question, Sender, TargetType, VoteType};

// -- JWT Claims --

/// Session claims carried by the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub name: String,
    pub exp: usize,
}

// -- Envelopes --

/// Per-field validation messages, keyed by request field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Serialize, Deserialize)]
pub struct Success<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Success<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
    pub status: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
    pub token: String,
}

// -- Pagination --

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub query: Option<String>,
    pub filter: Option<String>,
}

impl PaginatedQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn skip(&self) -> u32 {
        (self.page() - 1).saturating_mul(self.page_size())
    }

    /// Search keyword with surrounding whitespace removed; blank means none.
    pub fn keyword(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }
}

/// Whether more rows exist past the page that was just returned.
pub fn is_next(total: u64, skip: u32, returned: usize) -> bool {
    total > u64::from(skip) + returned as u64
}

// -- Chats --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub sender: Sender,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub detected_disease: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub message: NewMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMessageRequest {
    pub message: NewMessage,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPage {
    pub chats: Vec<ChatSummary>,
    pub is_next: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryPage {
    pub groups: Vec<HistoryGroup>,
    pub is_next: bool,
}

// -- Questions --

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub crop: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPage {
    pub questions: Vec<Question>,
    pub is_next: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewCount {
    pub views: i64,
}

// -- Answers --

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerInput {
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPage {
    pub answers: Vec<Answer>,
    pub is_next: bool,
    pub total_answers: u64,
}

// -- Votes --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateVoteRequest {
    pub target_id: Uuid,
    pub target_type: TargetType,
    pub vote_type: VoteType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasVotedQuery {
    pub target_id: Uuid,
    pub target_type: TargetType,
}

// -- AI / detection / uploads --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnswerRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub detected_disease: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub category: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub success: bool,
    pub category: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        let q = PaginatedQuery::default();
        assert_eq!((q.page(), q.page_size(), q.skip()), (1, 10, 0));

        let q = PaginatedQuery { page: Some(0), page_size: Some(500), ..Default::default() };
        assert_eq!((q.page(), q.page_size(), q.skip()), (1, MAX_PAGE_SIZE, 0));

        let q = PaginatedQuery { page: Some(3), page_size: Some(5), ..Default::default() };
        assert_eq!(q.skip(), 10);
    }

    #[test]
    fn blank_keyword_is_ignored() {
        let q = PaginatedQuery { query: Some("   ".into()), ..Default::default() };
        assert_eq!(q.keyword(), None);
        let q = PaginatedQuery { query: Some(" blight ".into()), ..Default::default() };
        assert_eq!(q.keyword(), Some("blight"));
    }

    #[test]
    fn is_next_compares_total_with_consumed_rows() {
        assert!(is_next(25, 10, 10));
        assert!(!is_next(20, 10, 10));
        assert!(!is_next(3, 0, 3));
        assert!(!is_next(0, 0, 0));
    }

    #[test]
    fn new_message_accepts_client_timestamp_field() {
        let msg: NewMessage = serde_json::from_str(
            r#"{"sender":"user","content":"Tomato","imageUrl":"http://x/y.png","timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(msg.sender, Sender::User);
        assert_eq!(msg.image_url.as_deref(), Some("http://x/y.png"));
        assert!(msg.detected_disease.is_none());
    }
}
