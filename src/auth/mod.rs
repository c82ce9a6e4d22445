//! Token and password capabilities.
//!
//! - [`jwt`] -- HS256 access tokens carrying user id and role.
//! - [`password`] -- Argon2id hashing and verification.

pub mod jwt;
pub mod password;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("token encoding failed: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
}
