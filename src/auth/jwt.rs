//! JWT access-token issuance and verification.
//!
//! Tokens are HS256-signed and carry the user id (`sub`) and role. Expiry is
//! enforced by [`TokenIssuer::verify`].

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::models::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i32,
    pub role: Role,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: ttl_hours.max(1) * 3600,
        }
    }

    pub fn issue(&self, user_id: i32, role: Role) -> Result<String, AuthError> {
        let now = jiff::Timestamp::now().as_second();
        let claims = Claims { sub: user_id, role, exp: now + self.ttl_secs, iat: now };
        encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Encode)
    }

    /// Fails on malformed, expired or tampered tokens.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}
