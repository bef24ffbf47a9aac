//! JWT bearer auth: the HTTP-facing identity layer that resolves into the
//! core's opaque `Subject` (superuser or a user id). The vault itself knows
//! nothing about tokens; this module is purely the boundary translation the
//! embedder owns.

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::Request;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use cellar_vault::Subject;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

#[derive(Debug, Clone)]
pub struct AuthState {
    secret: Vec<u8>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthState {
    #[must_use]
    pub fn new() -> Self {
        let mut secret = vec![0u8; 32];
        rand::Rng::fill(&mut rand::rng(), &mut secret[..]);
        Self { secret }
    }

    /// # Errors
    ///
    /// Returns an error if the token's timestamps overflow `usize` or token
    /// encoding itself fails.
    pub fn generate_token(&self, user_id: &str, superuser: bool) -> ApiResult<String> {
        let now = OffsetDateTime::now_utc();
        let expiry = now + Duration::hours(1);

        let claims = TokenClaims {
            sub: user_id.to_string(),
            superuser,
            exp: usize::try_from(expiry.unix_timestamp())
                .map_err(|_| ApiError::Internal("token expiry overflow".to_string()))?,
            iat: usize::try_from(now.unix_timestamp())
                .map_err(|_| ApiError::Internal("token issue-time overflow".to_string()))?,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|e| ApiError::Internal(format!("token generation failed: {e}")))
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the token is missing, expired,
    /// or fails signature verification.
    pub fn verify_token(&self, token: &str) -> ApiResult<TokenClaims> {
        decode::<TokenClaims>(token, &DecodingKey::from_secret(&self.secret), &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthorized)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    pub sub: String,
    pub superuser: bool,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
}

impl TokenClaims {
    /// Resolves this token into the core's subject vocabulary.
    #[must_use]
    pub fn subject(&self) -> Subject {
        if self.superuser {
            Subject::Superuser
        } else {
            Subject::User(self.sub.clone())
        }
    }
}

#[derive(Debug)]
pub struct AuthenticatedUser(pub TokenClaims);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(|header| {
                if header.len() >= 7 && header[..7].eq_ignore_ascii_case("bearer ") {
                    Some(&header[7..])
                } else {
                    None
                }
            })
            .ok_or(ApiError::Unauthorized)?;

        let auth_state = parts
            .extensions
            .get::<AuthState>()
            .ok_or_else(|| ApiError::Internal("auth state not found".to_string()))?;

        let claims = auth_state.verify_token(auth_header)?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Attaches `AuthState` to request extensions so `AuthenticatedUser` can
/// extract it downstream, without itself requiring a valid token — the
/// login/health routes run behind this same layer.
pub async fn auth_middleware(State(state): State<Arc<AppState>>, mut request: Request<Body>, next: Next) -> Response {
    request.extensions_mut().insert(state.auth.clone());
    next.run(request).await
}
