use leafcare_types::api::{
    AiAnswerRequest, AnswerInput, CreateChatRequest, FieldErrors, LoginRequest, NewMessage,
    QuestionInput, RegisterRequest,
};
use leafcare_types::models::canonical_crop;

use crate::error::ApiError;

pub const TITLE_MAX: usize = 100;
pub const CHAT_TITLE_MAX: usize = 100;
pub const MESSAGE_MAX: usize = 20_000;
pub const AI_QUESTION_MAX: usize = 1000;

/// Collects per-field messages, then fails once with all of them.
#[derive(Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors
                .entry(field.to_string())
                .or_default()
                .push(message.to_string());
        }
        self
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

fn chars(s: &str) -> usize {
    s.trim().chars().count()
}

fn optional_url_ok(url: &Option<String>) -> bool {
    url.as_deref().is_none_or(|u| !u.trim().is_empty())
}

pub fn register(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut v = Validator::default();
    v.check(chars(&req.name) >= 1, "name", "Name is required.")
        .check(chars(&req.name) <= 50, "name", "Name cannot exceed 50 characters.")
        .check(
            (3..=32).contains(&req.username.len()),
            "username",
            "Username must be between 3 and 32 characters.",
        )
        .check(
            req.username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "username",
            "Username can only contain letters, numbers, and underscores.",
        )
        .check(looks_like_email(&req.email), "email", "Please provide a valid email address.")
        .check(req.password.len() >= 8, "password", "Password must be at least 8 characters long.");
    v.finish()
}

pub fn login(req: &LoginRequest) -> Result<(), ApiError> {
    let mut v = Validator::default();
    v.check(looks_like_email(&req.email), "email", "Please provide a valid email address.")
        .check(!req.password.is_empty(), "password", "Password is required.");
    v.finish()
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

pub fn message(msg: &NewMessage) -> Result<(), ApiError> {
    let mut v = Validator::default();
    message_fields(&mut v, msg);
    v.finish()
}

fn message_fields(v: &mut Validator, msg: &NewMessage) {
    v.check(!msg.content.trim().is_empty(), "message.content", "Message content is required.")
        .check(
            msg.content.chars().count() <= MESSAGE_MAX,
            "message.content",
            "Message content is too long.",
        )
        .check(optional_url_ok(&msg.image_url), "message.imageUrl", "Image URL cannot be blank.");
}

pub fn create_chat(req: &CreateChatRequest) -> Result<(), ApiError> {
    let mut v = Validator::default();
    if let Some(title) = &req.title {
        v.check(
            title.chars().count() <= CHAT_TITLE_MAX,
            "title",
            "Title cannot exceed 100 characters.",
        );
    }
    message_fields(&mut v, &req.message);
    v.finish()
}

pub fn question(input: &QuestionInput) -> Result<(), ApiError> {
    let mut v = Validator::default();
    v.check(chars(&input.title) >= 5, "title", "Title must be at least 5 characters.")
        .check(
            chars(&input.title) <= TITLE_MAX,
            "title",
            "Title cannot exceed 100 characters.",
        )
        .check(chars(&input.content) >= 1, "content", "Body is required.")
        .check(optional_url_ok(&input.image_url), "imageUrl", "Image URL cannot be blank.");
    if let Some(crop) = input.crop.as_deref().filter(|c| !c.trim().is_empty()) {
        v.check(canonical_crop(crop).is_some(), "crop", "Unknown crop.");
    }
    v.finish()
}

pub fn answer(input: &AnswerInput) -> Result<(), ApiError> {
    let mut v = Validator::default();
    v.check(chars(&input.content) >= 1, "content", "Answer is required.")
        .check(optional_url_ok(&input.image_url), "imageUrl", "Image URL cannot be blank.");
    v.finish()
}

/// Disease-driven requests may omit the question entirely.
pub fn ai_answer(req: &AiAnswerRequest) -> Result<(), ApiError> {
    let has_disease = req
        .detected_disease
        .as_deref()
        .is_some_and(|d| !d.trim().is_empty());
    let mut v = Validator::default();
    if !has_disease {
        v.check(chars(&req.question) >= 5, "question", "Question must be at least 5 characters.");
    }
    v.check(
        req.question.chars().count() <= AI_QUESTION_MAX,
        "question",
        "Question cannot exceed 1000 characters.",
    );
    v.finish()
}
