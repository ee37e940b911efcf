use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content change notifications pushed to subscribed clients so they can
/// refresh any cached copy of the affected page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ContentEvent {
    /// A chat was created or received a new message
    ChatChanged { chat_id: Uuid, path: String },

    /// A question was created or edited
    QuestionChanged { question_id: Uuid, path: String },

    /// A new answer was posted under a question
    AnswerPosted {
        question_id: Uuid,
        answer_id: Uuid,
        path: String,
    },
}

impl ContentEvent {
    /// Page path whose cached rendering is now stale.
    pub fn path(&self) -> &str {
        match self {
            Self::ChatChanged { path, .. } => path,
            Self::QuestionChanged { path, .. } => path,
            Self::AnswerPosted { path, .. } => path,
        }
    }

    /// SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChatChanged { .. } => "chatChanged",
            Self::QuestionChanged { .. } => "questionChanged",
            Self::AnswerPosted { .. } => "answerPosted",
        }
    }
}

pub fn chat_path(lng: &str, chat_id: Uuid) -> String {
    format!("/{}/chat/{}", lng, chat_id)
}

pub fn question_path(lng: &str, question_id: Uuid) -> String {
    format!("/{}/questions/{}", lng, question_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let id = Uuid::nil();
        let event = ContentEvent::ChatChanged { chat_id: id, path: chat_path("en", id) };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "chatChanged");
        assert_eq!(json["data"]["path"], format!("/en/chat/{}", id));
        assert_eq!(event.path(), format!("/en/chat/{}", id));
    }
}
