//! Bearer-token identity.
//!
//! Tokens are HS256 JWTs whose `sub` claim is the user id. The verified id
//! is handed to handlers through the [`AuthUser`] extractor and passed
//! explicitly into every service call.

use crate::config::AuthConfig;
use crate::error::{RecError, RecResult};
use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            ttl_seconds: config.token_ttl_seconds,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> RecResult<String> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| RecError::Internal(anyhow::anyhow!("failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> RecResult<Uuid> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| RecError::Unauthorized(format!("invalid token: {}", e)))?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| RecError::Unauthorized("token subject is not a user id".to_string()))
    }

    /// Extracts and verifies the token of an `Authorization: Bearer ...` header value.
    pub fn verify_header(&self, header: Option<&str>) -> RecResult<Uuid> {
        let header =
            header.ok_or_else(|| RecError::Unauthorized("missing bearer token".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RecError::Unauthorized("malformed authorization header".to_string()))?;
        self.verify(token)
    }
}

/// The authenticated user of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = RecError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| RecError::Unauthorized("malformed authorization header".to_string()))?,
            ),
            None => None,
        };

        state.tokens.verify_header(header).map(AuthUser)
    }
}
