use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use mongodb::bson::doc;
use password_hash::rand_core::OsRng;

use crate::{
    dto::auth::{Claims, LoginRequest, LoginResponse},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn issue_token(secret: &str, user_id: &str, email: &str, ttl_hours: i64) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<LoginResponse> {
    let LoginRequest { email, password } = payload;
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let user = state
        .db
        .users()
        .find_one(doc! { "email": email.as_str() })
        .await?
        .ok_or_else(invalid)?;

    let hash = user.get_str("password").unwrap_or_default();
    if !verify_password(&password, hash) {
        return Err(invalid());
    }

    let user_id = user
        .get_object_id("_id")
        .map(|id| id.to_hex())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    let token = issue_token(
        &state.config.jwt_secret,
        &user_id,
        &email,
        state.config.jwt_ttl_hours,
    )?;
    tracing::info!(user_id = %user_id, "user logged in");

    Ok(LoginResponse { token })
}
