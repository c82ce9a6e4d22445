use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    auth::{
        jwt::TokenIssuer,
        password::{MIN_PASSWORD_LEN, hash_password, verify_dummy, verify_password},
    },
    config::AdminBootstrap,
    error::{AppError, AppResult, OrNotFound},
    models::{Credentials, NewUserRecord, ProfilePatch, Registration, Role, UserProfile},
    store::{StoreError, UserStore},
};

const MIN_USERNAME_LEN: usize = 3;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenIssuer>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenIssuer>) -> Self {
        Self { users, tokens }
    }

    pub async fn register(&self, input: Registration) -> AppResult<UserProfile> {
        self.create(input, Role::User).await
    }

    /// Returns a signed access token. Unknown email and wrong password fail
    /// with the same error.
    pub async fn login(&self, credentials: Credentials) -> AppResult<String> {
        let email = normalize_email(&credentials.email);
        let user = match self.users.get_by_email(&email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                verify_dummy(&credentials.password);
                return Err(AppError::BadCredentials);
            },
            Err(err) => return Err(err.into()),
        };

        if !verify_password(&credentials.password, &user.password_hash) {
            return Err(AppError::BadCredentials);
        }

        debug!(user_id = user.id, "user logged in");
        self.tokens.issue(user.id, user.role).map_err(|err| AppError::Internal(err.into()))
    }

    pub async fn profile(&self, user_id: i32) -> AppResult<UserProfile> {
        Ok(self.users.get(user_id).await.or_not_found("user")?.into())
    }

    /// Blank fields are left untouched.
    pub async fn update_profile(&self, user_id: i32, patch: ProfilePatch) -> AppResult<UserProfile> {
        let mut user = self.users.get(user_id).await.or_not_found("user")?;

        if let Some(username) = patch.username.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            validate_username(username)?;
            user.username = username.to_string();
        }
        if let Some(email) = patch.email.as_deref().map(normalize_email).filter(|e| !e.is_empty()) {
            validate_email(&email)?;
            user.email = email;
        }

        let updated = self.users.update(&user).await.map_err(email_conflict)?;
        Ok(updated.into())
    }

    pub async fn change_password(&self, user_id: i32, new_password: &str) -> AppResult<()> {
        validate_password(new_password)?;
        let hash = hash_password(new_password).map_err(|err| AppError::Internal(err.into()))?;
        self.users.update_password(user_id, &hash).await.or_not_found("user")?;
        debug!(user_id, "password changed");
        Ok(())
    }

    /// The user's reviews stay behind.
    pub async fn delete_account(&self, user_id: i32) -> AppResult<()> {
        self.users.delete(user_id).await.or_not_found("user")?;
        info!(user_id, "account deleted");
        Ok(())
    }

    /// Creates the bootstrap admin unless the email is already registered.
    pub async fn ensure_admin(&self, admin: &AdminBootstrap) -> AppResult<()> {
        match self.users.get_by_email(&normalize_email(&admin.email)).await {
            Ok(existing) => {
                debug!(user_id = existing.id, "admin account already present");
                return Ok(());
            },
            Err(StoreError::NotFound) => {},
            Err(err) => return Err(err.into()),
        }

        let registration = Registration {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
        };
        let created = self.create(registration, Role::Admin).await?;
        info!(user_id = created.id, "admin account created");
        Ok(())
    }

    async fn create(&self, input: Registration, role: Role) -> AppResult<UserProfile> {
        let username = input.username.trim();
        let email = normalize_email(&input.email);
        validate_username(username)?;
        validate_email(&email)?;
        validate_password(&input.password)?;

        let password_hash =
            hash_password(&input.password).map_err(|err| AppError::Internal(err.into()))?;
        let user = self
            .users
            .create(NewUserRecord { username: username.to_string(), email, password_hash, role })
            .await
            .map_err(email_conflict)?;

        debug!(user_id = user.id, %role, "user registered");
        Ok(user.into())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_username(username: &str) -> AppResult<()> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::bad_input(format!(
            "username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        },
        None => false,
    };
    if !valid {
        return Err(AppError::bad_input("invalid email address"));
    }
    Ok(())
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_input(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn email_conflict(err: StoreError) -> AppError {
    match err {
        StoreError::Conflict => AppError::Conflict("email already registered".into()),
        StoreError::NotFound => AppError::NotFound("user"),
        other => other.into(),
    }
}
