use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use leafcare_types::api::{
    AddMessageRequest, ChatHistoryPage, ChatPage, CreateChatRequest, PaginatedQuery, Success, is_next,
};
use leafcare_types::events::{ContentEvent, chat_path};
use leafcare_types::history::group_by_recency;
use leafcare_types::models::ChatSummary;

use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::lang;
use crate::session::Session;
use crate::state::AppState;
use crate::validation;

pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

fn chat_changed(state: &AppState, headers: &HeaderMap, chat_id: Uuid) {
    state.revalidator.publish(ContentEvent::ChatChanged {
        chat_id,
        path: chat_path(lang::language(headers), chat_id),
    });
}

pub async fn create_chat(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    JsonBody(req): JsonBody<CreateChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::create_chat(&req)?;

    let chat_id = Uuid::new_v4();
    let author_id = session.user_id().to_string();
    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_CHAT_TITLE)
        .to_string();

    let chat = state
        .db(move |db| db.create_chat(&chat_id.to_string(), &author_id, &title, &req.message))
        .await?;

    info!("User {} created chat {}", session.0.username, chat.id);
    chat_changed(&state, &headers, chat.id);

    Ok((StatusCode::CREATED, Json(Success::new(chat))))
}

pub async fn add_message(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    PathParam(chat_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<AddMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::message(&req.message)?;

    let user_id = session.user_id().to_string();
    let chat = state
        .db(move |db| db.append_message(&chat_id.to_string(), &user_id, &req.message))
        .await?;

    chat_changed(&state, &headers, chat.id);
    Ok(Json(Success::new(chat)))
}

pub async fn get_chat(
    State(state): State<AppState>,
    session: Session,
    PathParam(chat_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state
        .db(move |db| db.get_chat(&chat_id.to_string()))
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".into()))?;

    if chat.author.id != session.user_id() {
        return Err(ApiError::Forbidden("Unauthorized: You can only view your own chats".into()));
    }

    Ok(Json(Success::new(chat)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    session: Session,
    PathParam(chat_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = session.user_id().to_string();
    let messages = state
        .db(move |db| db.get_chat_messages(&chat_id.to_string(), &user_id))
        .await?;

    Ok(Json(Success::new(messages)))
}

async fn chat_page(
    state: &AppState,
    session: &Session,
    query: &PaginatedQuery,
) -> Result<(Vec<ChatSummary>, bool), ApiError> {
    if query.filter() == Some("recommended") {
        return Ok((Vec::new(), false));
    }

    let author_id = session.user_id().to_string();
    let keyword = query.keyword().map(str::to_string);
    let (skip, limit) = (query.skip(), query.page_size());

    let (chats, total) = state
        .db(move |db| db.list_chats(&author_id, keyword.as_deref(), skip, limit))
        .await?;

    let next = is_next(total, skip, chats.len());
    Ok((chats, next))
}

pub async fn get_chats(
    State(state): State<AppState>,
    session: Session,
    QueryParams(query): QueryParams<PaginatedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (chats, is_next) = chat_page(&state, &session, &query).await?;
    Ok(Json(Success::new(ChatPage { chats, is_next })))
}

/// Same page as `get_chats`, bucketed Today / Yesterday / Previous 7 days /
/// Previous 30 days / Older.
pub async fn get_chat_history(
    State(state): State<AppState>,
    session: Session,
    QueryParams(query): QueryParams<PaginatedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (chats, is_next) = chat_page(&state, &session, &query).await?;
    let groups = group_by_recency(chats, Utc::now());
    Ok(Json(Success::new(ChatHistoryPage { groups, is_next })))
}
