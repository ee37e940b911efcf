use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use leafcare_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_TTL_DAYS: i64 = 30;

/// Authenticated caller, taken from the `Authorization: Bearer` header.
/// Handlers that take a `Session` reject anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct Session(pub Claims);

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.0.sub
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        extract_claims(&parts.headers, &state.jwt_secret).map(Session)
    }
}

pub fn extract_claims(headers: &HeaderMap, jwt_secret: &str) -> Result<Claims, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    Ok(token_data.claims)
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str, name: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn token_round_trips_through_header() {
        let id = Uuid::new_v4();
        let token = create_token("secret", id, "fern", "Fern").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
        let claims = extract_claims(&headers, "secret").unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "fern");

        assert!(matches!(extract_claims(&headers, "other"), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn missing_or_malformed_header_is_unauthorized() {
        let mut headers = HeaderMap::new();
        assert!(matches!(extract_claims(&headers, "secret"), Err(ApiError::Unauthorized)));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(extract_claims(&headers, "secret"), Err(ApiError::Unauthorized)));
    }
}
