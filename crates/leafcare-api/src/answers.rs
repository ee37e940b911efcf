use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use leafcare_types::api::{AnswerInput, AnswerPage, PaginatedQuery, Success, is_next};
use leafcare_types::events::{ContentEvent, question_path};
use leafcare_types::models::AnswerFilter;

use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::lang;
use crate::session::Session;
use crate::state::AppState;
use crate::validation;

pub async fn create_answer(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    PathParam(question_id): PathParam<Uuid>,
    JsonBody(mut input): JsonBody<AnswerInput>,
) -> Result<impl IntoResponse, ApiError> {
    validation::answer(&input)?;
    input.content = input.content.trim().to_string();

    let id = Uuid::new_v4();
    let author_id = session.user_id().to_string();
    let answer = state
        .db(move |db| db.create_answer(&id.to_string(), &question_id.to_string(), &author_id, &input))
        .await?;

    info!("User {} answered question {}", session.0.username, question_id);
    state.revalidator.publish(ContentEvent::AnswerPosted {
        question_id,
        answer_id: answer.id,
        path: question_path(lang::language(&headers), question_id),
    });

    Ok((StatusCode::CREATED, Json(Success::new(answer))))
}

pub async fn get_answers(
    State(state): State<AppState>,
    PathParam(question_id): PathParam<Uuid>,
    QueryParams(query): QueryParams<PaginatedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = AnswerFilter::parse(query.filter());
    let (skip, limit) = (query.skip(), query.page_size());

    let (answers, total) = state
        .db(move |db| db.list_answers(&question_id.to_string(), filter, skip, limit))
        .await?;

    let is_next = is_next(total, skip, answers.len());
    Ok(Json(Success::new(AnswerPage {
        answers,
        is_next,
        total_answers: total,
    })))
}
