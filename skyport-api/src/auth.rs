use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skyport_core::identity::{verify_password, User};
use skyport_store::user_repo::{ProfilePayload, RegisterPayload};

use crate::error::AppError;
use crate::middleware::auth::{
    decode_claims, require_user, Claims, MaybeClaims, TOKEN_KIND_ACCESS, TOKEN_KIND_REFRESH,
};
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct TokenPairResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Serialize)]
struct AccessTokenResponse {
    access: String,
}

#[derive(Debug, Deserialize)]
struct CredentialsRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/token", post(obtain_token_pair))
        .route("/v1/auth/token/refresh", post(refresh_token))
        .route("/v1/auth/token/verify", post(verify_token))
        .route("/v1/auth/token/logout", post(logout))
        .route("/v1/auth/me", get(get_profile).put(update_profile))
}

pub fn issue_token(
    user: &User,
    kind: &str,
    secret: &str,
    lifetime_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        staff: user.is_staff,
        kind: kind.to_string(),
        jti: Uuid::new_v4().to_string(),
        exp: (Utc::now() + chrono::Duration::seconds(lifetime_seconds as i64)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

fn issue_pair(state: &AppState, user: &User) -> Result<TokenPairResponse, AppError> {
    Ok(TokenPairResponse {
        access: issue_token(user, TOKEN_KIND_ACCESS, &state.auth.secret, state.auth.access_seconds)?,
        refresh: issue_token(
            user,
            TOKEN_KIND_REFRESH,
            &state.auth.secret,
            state.auth.refresh_seconds,
        )?,
    })
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.users.create(&payload).await?;
    tracing::info!("User registered: {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

async fn obtain_token_pair(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<TokenPairResponse>, AppError> {
    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(invalid_credentials());
    }

    Ok(Json(issue_pair(&state, &user)?))
}

async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let claims = decode_claims(&req.refresh, &state.auth.secret)?;
    if claims.kind != TOKEN_KIND_REFRESH {
        return Err(AppError::AuthenticationError(
            "Refresh endpoint requires a refresh token".to_string(),
        ));
    }
    ensure_not_revoked(&state, &claims).await?;

    let user = state
        .users
        .get(claims.sub)
        .await?
        .ok_or_else(invalid_credentials)?;

    Ok(Json(AccessTokenResponse {
        access: issue_token(&user, TOKEN_KIND_ACCESS, &state.auth.secret, state.auth.access_seconds)?,
    }))
}

async fn verify_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let claims = decode_claims(&req.token, &state.auth.secret)?;
    if claims.kind == TOKEN_KIND_REFRESH {
        ensure_not_revoked(&state, &claims).await?;
    }
    Ok(Json(serde_json::json!({ "valid": true })))
}

async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let claims = decode_claims(&req.refresh, &state.auth.secret)?;
    if claims.kind != TOKEN_KIND_REFRESH {
        return Err(AppError::AuthenticationError(
            "Logout requires a refresh token".to_string(),
        ));
    }

    let remaining = claims.exp as i64 - Utc::now().timestamp();
    state
        .redis
        .deny_token(&claims.jti, remaining.max(1) as u64)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Token revocation failed: {}", e)))?;

    tracing::info!("Refresh token revoked for user {}", claims.sub);
    Ok(Json(serde_json::json!({ "detail": "Token revoked" })))
}

async fn get_profile(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
) -> Result<Json<User>, AppError> {
    let claims = require_user(claims.as_ref())?;
    let user = state
        .users
        .get(claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;
    Ok(Json(user))
}

async fn update_profile(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<ProfilePayload>,
) -> Result<Json<User>, AppError> {
    let claims = require_user(claims.as_ref())?;
    let user = state
        .users
        .update_profile(claims.sub, &payload)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;
    Ok(Json(user))
}

fn invalid_credentials() -> AppError {
    AppError::AuthenticationError("Invalid email or password".to_string())
}

/// Revocation checks fail open on Redis outage, matching the rate limiter:
/// an unreachable cache must not lock every user out.
async fn ensure_not_revoked(state: &AppState, claims: &Claims) -> Result<(), AppError> {
    match state.redis.is_token_denied(&claims.jti).await {
        Ok(true) => Err(AppError::AuthenticationError(
            "Token has been revoked".to_string(),
        )),
        Ok(false) => Ok(()),
        Err(e) => {
            tracing::warn!("Denylist check failed: {}", e);
            Ok(())
        }
    }
}
