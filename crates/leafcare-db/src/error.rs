use thiserror::Error;

/// Domain outcomes the HTTP layer maps to specific status codes.
/// Everything else surfaces as a plain `anyhow::Error`.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),
}
