//! Request extractors that authenticate the caller.

mod auth;

pub use auth::{AuthUser, RequireAdmin};
