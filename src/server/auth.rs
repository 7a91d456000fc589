use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::AppState;

/// Bearer tokens are valid for 30 days.
const TOKEN_TTL_DAYS: i64 = 30;

/// JWT signing material derived from the configured secret.
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    exp: usize,
}

pub fn generate_token(keys: &AuthKeys, user_id: Uuid) -> ApiResult<String> {
    let exp = (Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize;
    let claims = Claims { sub: user_id, exp };
    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("token creation failed: {e}")))
}

/// Verifies a bearer token and returns the authenticated user id.
/// Expired, malformed, or badly signed tokens are all a plain 401.
pub fn verify_token(keys: &AuthKeys, token: &str) -> ApiResult<Uuid> {
    decode::<Claims>(token, &keys.decoding, &Validation::default())
        .map(|data| data.claims.sub)
        .map_err(|_| ApiError::NotAuthorized)
}

pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// Extractor for the authenticated caller on protected routes.
pub struct AuthUser(pub Uuid);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::NotAuthorized)?;
        let token = header.strip_prefix("Bearer ").ok_or(ApiError::NotAuthorized)?;
        let user_id = verify_token(&state.auth, token)?;
        Ok(AuthUser(user_id))
    }
}
