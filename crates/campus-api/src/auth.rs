use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use campus_db::Database;
use campus_gateway::relay::ChatRelay;
use campus_social::{SocialError, run_blocking, validate};
use campus_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use campus_types::models::normalize_user_id;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub relay: ChatRelay,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = validate::new_user_id(&req.user_id)?;
    validate::password(&req.password)?;

    // Hash password with Argon2id and insert, both off the async runtime
    let id = user_id.clone();
    let created = run_blocking(&state.db, move |db| {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();
        Ok(db.create_user(&id, &password_hash)?)
    })
    .await?;

    if !created {
        return Err(SocialError::AlreadyExists("User already exists").into());
    }

    let token = create_token(&state, &user_id)?;
    info!("Registered user {}", user_id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".into(),
            user_id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = normalize_user_id(&req.user_id);
    if user_id.is_empty() || req.password.is_empty() {
        return Err(SocialError::InvalidInput("User ID and password are required").into());
    }

    let id = user_id.clone();
    let verified = run_blocking(&state.db, move |db| {
        let Some(user) = db.get_user(&id)? else {
            return Ok(false);
        };

        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored hash for {} is corrupt: {}", id, e))?;

        Ok(Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .is_ok())
    })
    .await?;

    if !verified {
        return Err(ApiError::Unauthenticated("Invalid credentials"));
    }

    let token = create_token(&state, &user_id)?;

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        user_id,
        token,
    }))
}

pub fn create_token(state: &AppStateInner, user_id: &str) -> Result<String, SocialError> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("token encoding failed: {}", e))?;

    Ok(token)
}
