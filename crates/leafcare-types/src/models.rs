use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Crops the detection flow knows how to classify.
pub const CROPS: &[&str] = &["Rice", "Wheat", "Potato", "Cauliflower", "Tomato"];

/// Returns the canonical crop label for a case-insensitive match.
pub fn canonical_crop(input: &str) -> Option<&'static str> {
    let input = input.trim();
    CROPS.iter().copied().find(|c| c.eq_ignore_ascii_case(input))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Question,
    Answer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Upvote,
    Downvote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

// Enums are stored in SQLite as their lowercase names. `parse` also
// derives `FromStr` for columns that are read back into the enum.
macro_rules! text_enum {
    (parse $ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        text_enum!($ty { $($variant => $text),+ });

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }
    };
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(parse Sender { User => "user", Ai => "ai" });
text_enum!(TargetType { Question => "question", Answer => "answer" });
text_enum!(parse VoteType { Upvote => "upvote", Downvote => "downvote" });

impl TargetType {
    /// Table holding the vote counters for this target.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Question => "questions",
            Self::Answer => "answers",
        }
    }
}

impl VoteType {
    /// Counter column bumped by this vote.
    pub fn counter_column(&self) -> &'static str {
        match self {
            Self::Upvote => "upvotes",
            Self::Downvote => "downvotes",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Upvote => Self::Downvote,
            Self::Downvote => Self::Upvote,
        }
    }
}

/// Sort/filter applied to the community question list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionFilter {
    #[default]
    Newest,
    Unanswered,
    Popular,
    Recommended,
}

impl QuestionFilter {
    /// Unknown or empty filters fall back to newest-first.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("unanswered") => Self::Unanswered,
            Some("popular") => Self::Popular,
            Some("recommended") => Self::Recommended,
            _ => Self::Newest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerFilter {
    #[default]
    Latest,
    Oldest,
    Popular,
}

impl AnswerFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("oldest") => Self::Oldest,
            Some("popular") => Self::Popular,
            _ => Self::Latest,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Author reference embedded in read models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_disease: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub author: Author,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chat without its message bodies, as returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: Uuid,
    pub title: String,
    pub message_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: Author,
    pub views: i64,
    pub answers: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub author: Author,
    pub content: String,
    pub upvotes: i64,
    pub downvotes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasVoted {
    pub has_upvoted: bool,
    pub has_downvoted: bool,
}

/// What a vote request did to the caller's existing vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Added,
    Removed,
    Switched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub action: VoteAction,
    pub upvotes: i64,
    pub downvotes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_parse_their_own_names() {
        assert_eq!("ai".parse::<Sender>().unwrap(), Sender::Ai);
        assert_eq!(TargetType::Answer.to_string(), "answer");
        assert_eq!(VoteType::Downvote.as_str(), "downvote");
        assert!("Upvote".parse::<VoteType>().is_err());
    }

    #[test]
    fn filters_fall_back_to_defaults() {
        assert_eq!(QuestionFilter::parse(None), QuestionFilter::Newest);
        assert_eq!(QuestionFilter::parse(Some("bogus")), QuestionFilter::Newest);
        assert_eq!(QuestionFilter::parse(Some("unanswered")), QuestionFilter::Unanswered);
        assert_eq!(AnswerFilter::parse(Some("oldest")), AnswerFilter::Oldest);
        assert_eq!(AnswerFilter::parse(Some("")), AnswerFilter::Latest);
    }

    #[test]
    fn crop_lookup_is_case_insensitive() {
        assert_eq!(canonical_crop("tomato"), Some("Tomato"));
        assert_eq!(canonical_crop(" RICE "), Some("Rice"));
        assert_eq!(canonical_crop("banana"), None);
    }

    #[test]
    fn message_omits_absent_optionals() {
        let msg = ChatMessage {
            sender: Sender::User,
            content: "Tomato".into(),
            timestamp: DateTime::<Utc>::default(),
            image_url: None,
            detected_disease: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sender"], "user");
        assert!(json.get("imageUrl").is_none());
        assert!(json.get("detectedDisease").is_none());
    }
}
