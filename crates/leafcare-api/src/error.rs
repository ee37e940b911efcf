use axum::{
    Json,
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use leafcare_db::DbError;
use leafcare_types::api::{ErrorBody, ErrorEnvelope, FieldErrors};

/// Every handler failure. Rendered as
/// `{ success: false, error: { message, details? }, status }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DbError>() {
            Some(DbError::NotFound(what)) => Self::NotFound(format!("{} not found", what)),
            Some(DbError::Forbidden(msg)) => Self::Forbidden(msg.clone()),
            None => Self::Internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => Self::Validation(field_errors(&err.body_text(), "body")),
            other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge(other.body_text()),
            other => Self::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        match rejection {
            QueryRejection::FailedToDeserializeQueryString(err) => {
                Self::Validation(field_errors(&err.body_text(), "query"))
            }
            other => Self::BadRequest(other.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(err) => Self::BadRequest(err.body_text()),
            other => Self::Internal(anyhow::anyhow!(other.body_text())),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Turn a deserializer message such as
/// `Failed to deserialize ...: targetId: UUID parsing failed ... at line 1 column 20`
/// into details keyed by the offending field.
fn field_errors(text: &str, fallback: &str) -> FieldErrors {
    let detail = text.split_once(": ").map_or(text, |(_, rest)| rest);
    let detail = detail.rsplit_once(" at line ").map_or(detail, |(msg, _)| msg);

    let (field, message) = match detail.split_once(": ") {
        Some((path, msg)) if !path.is_empty() && !path.contains(' ') => (path.to_string(), msg),
        _ => {
            let missing = detail
                .strip_prefix("missing field `")
                .and_then(|rest| rest.split_once('`'))
                .map(|(name, _)| name.to_string());
            (missing.unwrap_or_else(|| fallback.to_string()), detail)
        }
    };

    let mut errors = FieldErrors::new();
    errors.insert(field, vec![message.to_string()]);
    errors
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, details) = match self {
            Self::Validation(details) => ("Validation failed".to_string(), Some(details)),
            Self::Internal(err) => {
                error!("Internal error: {:#}", err);
                ("An unexpected error occurred".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorEnvelope {
            success: false,
            error: ErrorBody { message, details },
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_errors_map_to_statuses() {
        let nf: ApiError = anyhow::Error::from(DbError::NotFound("Chat")).into();
        assert_eq!(nf.status(), StatusCode::NOT_FOUND);
        assert_eq!(nf.to_string(), "Chat not found");

        let fb: ApiError = anyhow::Error::from(DbError::Forbidden("nope".into())).into();
        assert_eq!(fb.status(), StatusCode::FORBIDDEN);

        let other: ApiError = anyhow::anyhow!("disk full").into();
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn deserializer_messages_are_keyed_by_field() {
        let errs = field_errors(
            "Failed to deserialize the JSON body into the target type: message.sender: unknown variant `bot`, expected `user` or `ai` at line 1 column 16",
            "body",
        );
        assert_eq!(errs["message.sender"], vec!["unknown variant `bot`, expected `user` or `ai`".to_string()]);

        let errs = field_errors(
            "Failed to deserialize the JSON body into the target type: missing field `message` at line 1 column 2",
            "body",
        );
        assert_eq!(errs["message"], vec!["missing field `message`".to_string()]);

        let errs = field_errors("Failed to deserialize query string: invalid digit found in string", "query");
        assert_eq!(errs["query"], vec!["invalid digit found in string".to_string()]);
    }
}
