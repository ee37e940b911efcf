use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use leafcare_types::api::{PaginatedQuery, QuestionInput, QuestionPage, Success, ViewCount, is_next};
use leafcare_types::events::{ContentEvent, question_path};
use leafcare_types::models::{QuestionFilter, canonical_crop};

use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::lang;
use crate::session::Session;
use crate::state::AppState;
use crate::validation;

fn question_changed(state: &AppState, headers: &HeaderMap, question_id: Uuid) {
    state.revalidator.publish(ContentEvent::QuestionChanged {
        question_id,
        path: question_path(lang::language(headers), question_id),
    });
}

/// Trims text fields and folds the crop onto its canonical spelling.
fn normalize(mut input: QuestionInput) -> QuestionInput {
    input.title = input.title.trim().to_string();
    input.content = input.content.trim().to_string();
    input.crop = input
        .crop
        .as_deref()
        .and_then(canonical_crop)
        .map(str::to_string);
    input
}

pub async fn create_question(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    JsonBody(input): JsonBody<QuestionInput>,
) -> Result<impl IntoResponse, ApiError> {
    validation::question(&input)?;
    let input = normalize(input);

    let id = Uuid::new_v4();
    let author_id = session.user_id().to_string();
    let question = state
        .db(move |db| db.create_question(&id.to_string(), &author_id, &input))
        .await?;

    info!("User {} asked question {}", session.0.username, question.id);
    question_changed(&state, &headers, question.id);

    Ok((StatusCode::CREATED, Json(Success::new(question))))
}

pub async fn edit_question(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    PathParam(id): PathParam<Uuid>,
    JsonBody(input): JsonBody<QuestionInput>,
) -> Result<impl IntoResponse, ApiError> {
    validation::question(&input)?;
    let input = normalize(input);

    let user_id = session.user_id().to_string();
    let question = state
        .db(move |db| db.update_question(&id.to_string(), &user_id, &input))
        .await?;

    question_changed(&state, &headers, question.id);
    Ok(Json(Success::new(question)))
}

pub async fn get_question(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let question = state
        .db(move |db| db.get_question(&id.to_string()))
        .await?
        .ok_or_else(|| ApiError::NotFound("Question not found".into()))?;

    Ok(Json(Success::new(question)))
}

pub async fn increment_views(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let views = state
        .db(move |db| db.increment_views(&id.to_string()))
        .await?
        .ok_or_else(|| ApiError::NotFound("Question not found".into()))?;

    Ok(Json(Success::new(ViewCount { views })))
}

pub async fn get_questions(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PaginatedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = QuestionFilter::parse(query.filter());
    let keyword = query.keyword().map(str::to_string);
    let (skip, limit) = (query.skip(), query.page_size());

    let (questions, total) = state
        .db(move |db| db.list_questions(keyword.as_deref(), filter, skip, limit))
        .await?;

    let is_next = is_next(total, skip, questions.len());
    Ok(Json(Success::new(QuestionPage { questions, is_next })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_canonicalizes_crop() {
        let input = normalize(QuestionInput {
            title: "  Yellow rice leaves ".into(),
            content: " help ".into(),
            image_url: None,
            crop: Some("rice".into()),
        });
        assert_eq!(input.title, "Yellow rice leaves");
        assert_eq!(input.content, "help");
        assert_eq!(input.crop.as_deref(), Some("Rice"));
    }
}
