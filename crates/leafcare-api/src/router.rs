use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::storage::OBJECT_PREFIX;
use crate::uploads::MAX_IMAGE_BYTES;
use crate::{ai, answers, auth, chats, detection, events, questions, uploads, votes};

/// Headroom over the image limit for multipart framing and text fields.
const BODY_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let uploads_dir = ServeDir::new(state.storage.dir());

    Router::new()
        .route("/health", get(health))
        .route("/events", get(events::stream_events))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Chats
        .route("/chats", post(chats::create_chat).get(chats::get_chats))
        .route("/chats/history", get(chats::get_chat_history))
        .route("/chats/{chat_id}", get(chats::get_chat))
        .route(
            "/chats/{chat_id}/messages",
            get(chats::get_messages).post(chats::add_message),
        )
        // Questions and answers
        .route(
            "/questions",
            get(questions::get_questions).post(questions::create_question),
        )
        .route(
            "/questions/{id}",
            get(questions::get_question).put(questions::edit_question),
        )
        .route("/questions/{id}/views", post(questions::increment_views))
        .route(
            "/questions/{id}/answers",
            get(answers::get_answers).post(answers::create_answer),
        )
        // Votes
        .route("/votes", post(votes::create_vote))
        .route("/votes/status", get(votes::has_voted))
        // AI, detection and uploads
        .route("/api/ai/answers", post(ai::generate_answer))
        .route("/api/detect-disease", post(detection::detect_disease))
        .route("/api/upload-image", post(uploads::upload_image))
        .nest_service(&format!("/{}", OBJECT_PREFIX), uploads_dir)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
