use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub const TOKEN_KIND_ACCESS: &str = "access";
pub const TOKEN_KIND_REFRESH: &str = "refresh";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub staff: bool,
    pub kind: String,
    pub jti: String,
    pub exp: usize,
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;
    Ok(data.claims)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Decodes the bearer token when one is present and injects `Claims` into
/// request extensions. Requests without a (valid access) token pass through
/// anonymously; read endpoints are public, so rejection happens per-handler
/// via `require_user` / `require_staff`.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&req) {
        if let Ok(claims) = decode_claims(token, &state.auth.secret) {
            if claims.kind == TOKEN_KIND_ACCESS {
                req.extensions_mut().insert(claims);
            }
        }
    }
    next.run(req).await
}

/// Extractor mirror of the middleware above: yields the decoded claims when
/// the caller authenticated, `None` otherwise. Never rejects.
pub struct MaybeClaims(pub Option<Claims>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeClaims {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        Ok(MaybeClaims(parts.extensions.get::<Claims>().cloned()))
    }
}

pub fn require_user(claims: Option<&Claims>) -> Result<&Claims, AppError> {
    claims.ok_or_else(|| {
        AppError::AuthenticationError("Authentication credentials were not provided".to_string())
    })
}

pub fn require_staff(claims: Option<&Claims>) -> Result<&Claims, AppError> {
    let claims = require_user(claims)?;
    if !claims.staff {
        return Err(AppError::AuthorizationError(
            "Staff privileges are required for this action".to_string(),
        ));
    }
    Ok(claims)
}

/// Order/ticket visibility: staff see everything, users see their own,
/// anonymous callers see nothing.
pub fn user_scope(claims: Option<&Claims>) -> Result<Option<Uuid>, AppError> {
    let claims = require_user(claims)?;
    Ok(if claims.staff { None } else { Some(claims.sub) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(staff: bool) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            email: "pilot@example.com".to_string(),
            staff,
            kind: TOKEN_KIND_ACCESS.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: 0,
        }
    }

    #[test]
    fn anonymous_fails_require_user() {
        assert!(require_user(None).is_err());
    }

    #[test]
    fn non_staff_fails_require_staff() {
        let c = claims(false);
        assert!(require_staff(Some(&c)).is_err());
        let c = claims(true);
        assert!(require_staff(Some(&c)).is_ok());
    }

    #[test]
    fn staff_scope_is_unrestricted() {
        let c = claims(true);
        assert_eq!(user_scope(Some(&c)).unwrap(), None);

        let c = claims(false);
        assert_eq!(user_scope(Some(&c)).unwrap(), Some(c.sub));
    }
}
