//! Tenant JWT authentication for the clinic API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

/// JWT claims for a clinic user
#[derive(Debug, Serialize, Deserialize)]
pub struct TenantClaims {
    /// User ID
    pub sub: String,
    /// Clinic (tenant) the user acts for
    pub tenant_id: String,
    /// Display name, recorded in audit entries
    pub name: String,
    pub role: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated identity extracted from the JWT
#[derive(Debug, Clone)]
pub struct TenantIdentity {
    pub tenant_id: String,
    pub user_id: String,
    pub name: String,
    pub role: String,
}

const JWT_EXPIRY_HOURS: i64 = 12;

/// Create a JWT for a clinic user
pub fn create_token(
    identity: &TenantIdentity,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = TenantClaims {
        sub: identity.user_id.clone(),
        tenant_id: identity.tenant_id.clone(),
        name: identity.name.clone(),
        role: identity.role.clone(),
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a token and build the identity it carries
pub fn verify_token(token: &str, secret: &str) -> Result<TenantIdentity, AppError> {
    let token_data = jsonwebtoken::decode::<TenantClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;

    let claims = token_data.claims;
    if claims.tenant_id.is_empty() {
        return Err(AppError::new(ErrorCode::TenantNotSelected));
    }

    Ok(TenantIdentity {
        tenant_id: claims.tenant_id,
        user_id: claims.sub,
        name: claims.name,
        role: claims.role,
    })
}

/// Middleware that verifies the Bearer token and inserts [`TenantIdentity`]
pub async fn tenant_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::NotAuthenticated, "Missing Authorization header")
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::with_message(ErrorCode::NotAuthenticated, "Invalid Authorization format")
    })?;

    let identity = verify_token(token, &state.config.jwt_secret)?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> TenantIdentity {
        TenantIdentity {
            tenant_id: "clinic-a".into(),
            user_id: "user-1".into(),
            name: "Dr. Grey".into(),
            role: "doctor".into(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let token = create_token(&identity(), "secret").unwrap();
        let verified = verify_token(&token, "secret").unwrap();
        assert_eq!(verified.tenant_id, "clinic-a");
        assert_eq!(verified.user_id, "user-1");
        assert_eq!(verified.name, "Dr. Grey");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(&identity(), "secret").unwrap();
        let err = verify_token(&token, "other").unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = TenantClaims {
            sub: "user-1".into(),
            tenant_id: "clinic-a".into(),
            name: "Dr. Grey".into(),
            role: "doctor".into(),
            exp: 1_000,
            iat: 0,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(
            verify_token(&token, "secret").unwrap_err().code,
            ErrorCode::TokenExpired
        );
    }
}
