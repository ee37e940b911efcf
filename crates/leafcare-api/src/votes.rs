use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use leafcare_types::api::{CreateVoteRequest, HasVotedQuery, Success};

use crate::error::ApiError;
use crate::extract::{JsonBody, QueryParams};
use crate::session::Session;
use crate::state::AppState;

/// Adds, removes (same type again) or switches the caller's vote.
pub async fn create_vote(
    State(state): State<AppState>,
    session: Session,
    JsonBody(req): JsonBody<CreateVoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let CreateVoteRequest { target_id, target_type, vote_type } = req;
    let id = Uuid::new_v4();
    let user_id = session.user_id().to_string();

    let outcome = state
        .db(move |db| {
            db.cast_vote(&id.to_string(), &user_id, &target_id.to_string(), target_type, vote_type)
        })
        .await?;

    debug!(
        "Vote {:?} by {} on {} {}",
        outcome.action, session.0.username, target_type, target_id
    );
    Ok(Json(Success::new(outcome)))
}

pub async fn has_voted(
    State(state): State<AppState>,
    session: Session,
    QueryParams(query): QueryParams<HasVotedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = session.user_id().to_string();
    let voted = state
        .db(move |db| db.has_voted(&user_id, &query.target_id.to_string(), query.target_type))
        .await?;

    Ok(Json(Success::new(voted)))
}
