use axum::{Json, extract::State};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use leafcare_types::api::{AiAnswerRequest, Success};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;
use crate::validation;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const SYSTEM_PROMPT: &str = "You are a specialized plant disease assistant that provides expert \
information on plant diseases, treatments, and care. Only answer questions related to plants and \
gardening. If asked about unrelated topics, politely redirect the conversation to plants. Use \
markdown formatting for clear, well-structured responses with appropriate headings, lists, and \
emphasis. Include scientific names where relevant and practical advice that gardeners can implement.";

/// Client for the hosted text model (Gemini `generateContent`).
pub struct TextModel {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

// -- Wire format --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default()
    }
}

impl TextModel {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Sends `prompt` with the plant-assistant persona and returns the
    /// model's markdown answer.
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ApiError::Upstream("AI service is not configured".into()))?;

        let body = GenerateRequest {
            system_instruction: Content { role: None, parts: [Part { text: SYSTEM_PROMPT }] },
            contents: [Content { role: Some("user"), parts: [Part { text: prompt }] }],
        };

        debug!("Sending generateContent request");
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "AI request failed");
                ApiError::Upstream("AI service unavailable".into())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "AI service returned error");
            return Err(ApiError::Upstream(format!("AI service returned {}", status.as_u16())));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse AI response");
            ApiError::Upstream("Malformed AI response".into())
        })?;

        let text = parsed.into_text();
        if text.trim().is_empty() {
            return Err(ApiError::Upstream("AI service returned an empty answer".into()));
        }
        Ok(text)
    }
}

pub fn build_prompt(question: &str, content: &str, detected_disease: Option<&str>) -> String {
    match detected_disease.map(str::trim).filter(|d| !d.is_empty()) {
        Some(disease) => format!(
            "Generate a comprehensive markdown-formatted response about the plant disease: \"{disease}\".\n\n\
             The user has uploaded an image of a plant with this disease. Please provide:\n\
             1. A brief description of the disease\n\
             2. Common symptoms and how to identify it\n\
             3. What causes this disease\n\
             4. Recommended treatments and remedies\n\
             5. Prevention methods\n\n\
             If the user has asked a specific question: \"{question}\", address it in the context of this plant disease.\n\n\
             Additional context: {content}\n\n\
             Provide the final answer in markdown format with appropriate headings and structure."
        ),
        None => format!(
            "Generate a markdown-formatted response to the following question about plants: \"{question}\".\n\n\
             Consider the provided context:\n\
             **Context:** {content}\n\n\
             Focus only on plant-related information, particularly plant diseases, care, and remedies. \
             If the question is not related to plants, politely inform the user that you can only \
             provide information about plants and their diseases.\n\n\
             Provide the final answer in markdown format with appropriate headings and structure."
        ),
    }
}

/// POST /api/ai/answers
pub async fn generate_answer(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AiAnswerRequest>,
) -> Result<Json<Success<String>>, ApiError> {
    validation::ai_answer(&req)?;

    let prompt = build_prompt(&req.question, &req.content, req.detected_disease.as_deref());
    let text = state.model.generate(&prompt).await?;

    Ok(Json(Success::new(text)))
}
