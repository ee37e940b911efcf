use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use leafcare_db::models::NewUser;
use leafcare_types::api::{AuthResponse, LoginRequest, RegisterRequest, Success};
use leafcare_types::models::User;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::session::{Session, create_token};
use crate::state::AppState;
use crate::validation;

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::register(&req)?;

    let email = req.email.trim().to_lowercase();
    let name = req.name.trim().to_string();

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();
    let username = req.username.clone();

    {
        let (email, name, username) = (email.clone(), name.clone(), username.clone());
        let image = req.image.clone();
        state
            .db(move |db| {
                // Check if username or email is taken
                if db.get_user_by_username(&username)?.is_some() {
                    return Ok(Err(ApiError::Conflict("Username already exists".into())));
                }
                if db.get_user_by_email(&email)?.is_some() {
                    return Ok(Err(ApiError::Conflict("Email already exists".into())));
                }
                db.create_user(&NewUser {
                    id: &user_id.to_string(),
                    name: &name,
                    username: &username,
                    email: &email,
                    image: image.as_deref(),
                    password_hash: &password_hash,
                })?;
                Ok(Ok(()))
            })
            .await??;
    }

    let token = create_token(&state.jwt_secret, user_id, &username, &name)?;
    info!("Registered user {} ({})", username, user_id);

    Ok((
        StatusCode::CREATED,
        Json(Success::new(AuthResponse {
            user_id,
            username,
            name,
            token,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::login(&req)?;

    let email = req.email.trim().to_lowercase();
    let user = state
        .db(move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username, &user.name)?;

    Ok(Json(Success::new(AuthResponse {
        user_id,
        username: user.username,
        name: user.name,
        token,
    })))
}

/// Profile of the signed-in user.
pub async fn me(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse, ApiError> {
    let user_id = session.user_id().to_string();
    let user = state
        .db(move |db| db.get_user_by_id(&user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(Success::new(User::from(user))))
}
