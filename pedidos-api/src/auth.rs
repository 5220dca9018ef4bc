use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::auth::{Claims, TOKEN_KIND_ACCESS, TOKEN_KIND_REFRESH};
use crate::state::{AppState, AuthConfig};
use pedidos_core::User;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/token/", post(obtain_token))
        .route("/api/token/refresh/", post(refresh_token))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn issue_token(user: &User, auth: &AuthConfig, kind: &str) -> Result<String, AppError> {
    let ttl = if kind == TOKEN_KIND_REFRESH {
        auth.refresh_expiration
    } else {
        auth.access_expiration
    };
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        staff: user.is_staff,
        kind: kind.to_owned(),
        exp: (Utc::now() + Duration::seconds(ttl as i64)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
}

/// POST /api/token/
/// Email + password login, responds with an access/refresh token pair.
async fn obtain_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Debe incluir email y contraseña."));
    }

    let user = state.users.get_user_by_email(req.email.trim()).await?;

    // Same response whether the account is missing or the password is wrong
    let user = user
        .filter(|u| verify_password(&req.password, &u.password_hash))
        .ok_or_else(|| AppError::Authentication("Credenciales inválidas.".to_string()))?;

    Ok(Json(TokenResponse {
        access: issue_token(&user, &state.auth, TOKEN_KIND_ACCESS)?,
        refresh: issue_token(&user, &state.auth, TOKEN_KIND_REFRESH)?,
    }))
}

/// POST /api/token/refresh/
/// Exchange a refresh token for a fresh access token.
async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let token_data = decode::<Claims>(
        &req.refresh,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Authentication(format!("Invalid refresh token: {}", e)))?;

    if token_data.claims.kind != TOKEN_KIND_REFRESH {
        return Err(AppError::Authentication(
            "Not a refresh token".to_string(),
        ));
    }

    // Re-read the account so a revoked or demoted user does not keep
    // minting staff tokens for the refresh window
    let user = state
        .users
        .get_user(token_data.claims.sub)
        .await?
        .ok_or_else(|| AppError::Authentication("Unknown account".to_string()))?;

    Ok(Json(RefreshResponse {
        access: issue_token(&user, &state.auth, TOKEN_KIND_ACCESS)?,
    }))
}
