use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Store, User};

use super::auth::{self, AuthKeys, AuthUser};
use super::error::{ApiError, ApiResult};
use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Registration/login response: identity plus a fresh bearer token.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

pub async fn register(store: &dyn Store, keys: &AuthKeys, req: RegisterRequest) -> ApiResult<AuthResponse> {
    let name = match req.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(ApiError::Validation("Name is required".to_string())),
    };
    let email = match req.email.as_deref().map(str::trim) {
        Some(email) if validator::validate_email(email) => email.to_lowercase(),
        _ => return Err(ApiError::Validation("Invalid email format".to_string())),
    };
    let password = match req.password.as_deref() {
        Some(password) if password.len() >= 6 => password,
        _ => {
            return Err(ApiError::Validation(
                "Password must be at least 6 characters long".to_string(),
            ))
        }
    };

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Validation("User already exists".to_string()));
    }

    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash: auth::hash_password(password)?,
        created_at: Utc::now(),
    };
    let user = store.insert_user(user).await?;
    let token = auth::generate_token(keys, user.id)?;

    Ok(AuthResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        token,
    })
}

pub async fn login(store: &dyn Store, keys: &AuthKeys, req: LoginRequest) -> ApiResult<AuthResponse> {
    let email = match req.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => email,
        _ => return Err(ApiError::Validation("Email is required".to_string())),
    };
    if !validator::validate_email(email) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }
    let Some(password) = req.password.as_deref().filter(|p| !p.is_empty()) else {
        return Err(ApiError::Validation("Password is required".to_string()));
    };

    // A missing account and a bad password are indistinguishable on the
    // wire.
    let user = store.find_user_by_email(email).await?;
    match user {
        Some(user) if auth::verify_password(password, &user.password_hash) => {
            let token = auth::generate_token(keys, user.id)?;
            Ok(AuthResponse {
                id: user.id,
                name: user.name,
                email: user.email,
                token,
            })
        }
        _ => Err(ApiError::NotAuthorized),
    }
}

pub async fn profile(store: &dyn Store, user_id: Uuid) -> ApiResult<ProfileResponse> {
    let user = store
        .find_user_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(ProfileResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        created_at: user.created_at,
    })
}

pub async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let response = register(state.store.as_ref(), &state.auth, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = login(state.store.as_ref(), &state.auth, req).await?;
    Ok(Json(response))
}

pub async fn profile_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let response = profile(state.store.as_ref(), user_id).await?;
    Ok(Json(response))
}
