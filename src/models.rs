use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::entities::{movie, review, user};

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Movie {
    pub id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<i32>,
    pub title: String,
    pub year: i32,
    pub description: String,
    pub rating: f64,
}

impl From<movie::Model> for Movie {
    fn from(m: movie::Model) -> Self {
        Self {
            id: m.id,
            tmdb_id: m.tmdb_id,
            title: m.title,
            year: m.year,
            description: m.description,
            rating: m.rating,
        }
    }
}

/// Client input for creating a movie. Any `rating` sent by a client is not
/// part of this type and is therefore ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewMovie {
    pub title: String,
    pub year: i32,
    #[serde(default)]
    pub description: String,
}

/// Row handed to [`crate::store::MovieStore::create`]. The store assigns the
/// identifier and starts the rating at zero.
#[derive(Clone, Debug, Default)]
pub struct NewMovieRecord {
    pub tmdb_id: Option<i32>,
    pub title: String,
    pub year: i32,
    pub description: String,
}

/// Partial update; empty strings and non-positive years leave the field untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MoviePatch {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieSearch {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: i32,
    pub movie_id: i32,
    pub user_id: i32,
    pub score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub created_at: Timestamp,
}

impl From<review::Model> for Review {
    fn from(r: review::Model) -> Self {
        Self {
            id: r.id,
            movie_id: r.movie_id,
            user_id: r.user_id,
            score: r.score,
            text: r.text,
            created_at: from_millis(r.created_at),
        }
    }
}

/// A review as submitted. Identifier and creation time are always assigned
/// by the store.
#[derive(Clone, Debug, Default)]
pub struct NewReview {
    pub user_id: i32,
    pub score: i32,
    pub text: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Stored account. Deliberately not `Serialize`: the password hash must not
/// leave the store/auth boundary. Use [`UserProfile`] for responses.
#[derive(Clone, Debug)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: Timestamp,
}

impl From<user::Model> for User {
    fn from(u: user::Model) -> Self {
        let role = u.role.parse().unwrap_or_else(|err| {
            tracing::warn!(user_id = u.id, error = %err, "falling back to user role");
            Role::User
        });
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            password_hash: u.password_hash,
            role,
            created_at: from_millis(u.created_at),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewUserRecord {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: Timestamp,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self { id: u.id, username: u.username, email: u.email, role: u.role, created_at: u.created_at }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// A movie as described by the external metadata source.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ExternalMovie {
    pub id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub release_date: String,
}

impl ExternalMovie {
    /// Year from the leading `YYYY` of the release date, or 0.
    pub fn release_year(&self) -> i32 {
        self.release_date.get(..4).and_then(|y| y.parse().ok()).unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExternalMovieDetails {
    pub tmdb_id: i32,
    pub title: String,
    pub description: String,
    pub release_date: String,
    pub trailer_url: Option<String>,
}

pub fn now_millis() -> i64 {
    Timestamp::now().as_millisecond()
}

fn from_millis(ms: i64) -> Timestamp {
    Timestamp::from_millisecond(ms).unwrap_or(Timestamp::UNIX_EPOCH)
}
