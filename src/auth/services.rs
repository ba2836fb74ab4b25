use lazy_static::lazy_static;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, hash_password_blocking, verify_password_blocking},
        repo::CreateUserError,
        repo_types::{NewUser, Role, User},
    },
    error::{AppError, AppResult, FieldError},
    state::AppState,
};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

lazy_static! {
    // Verified against when the username is unknown so both login failures cost the same.
    static ref DUMMY_HASH: String = hash_password("not-a-real-password").unwrap_or_default();
}

/// A freshly signed token for `user_id`.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub user_id: Uuid,
}

pub(crate) fn validate_registration(username: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if username.is_empty() {
        errors.push(FieldError::new("username", "Please enter a username"));
    } else if username.chars().count() < MIN_USERNAME_LEN {
        errors.push(FieldError::new(
            "username",
            format!("Username must be at least {} characters", MIN_USERNAME_LEN),
        ));
    }
    if password.is_empty() {
        errors.push(FieldError::new("password", "Please enter a password"));
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    errors
}

pub(crate) fn validate_login(username: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if username.is_empty() {
        errors.push(FieldError::new("username", "Please enter a username"));
    }
    if password.is_empty() {
        errors.push(FieldError::new("password", "Please enter a password"));
    }
    errors
}

fn issue(keys: &JwtKeys, user: &User) -> AppResult<IssuedToken> {
    let token = keys.sign(user.id, user.role)?;
    Ok(IssuedToken {
        token,
        user_id: user.id,
    })
}

pub async fn register(st: &AppState, username: &str, password: &str) -> AppResult<IssuedToken> {
    let username = username.trim();
    let errors = validate_registration(username, password);
    if !errors.is_empty() {
        warn!(username, "registration rejected by validation");
        return Err(AppError::invalid_fields(errors));
    }

    let hash = hash_password_blocking(password.to_owned()).await?;

    let user = st
        .users
        .create(NewUser {
            username,
            password_hash: &hash,
            role: Role::User,
        })
        .await
        .map_err(|e| match e {
            CreateUserError::UsernameTaken => {
                warn!(username, "username already registered");
                AppError::Conflict("Username already taken".into())
            }
            CreateUserError::Other(e) => AppError::Internal(e),
        })?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    issue(&st.jwt, &user)
}

pub async fn login(st: &AppState, username: &str, password: &str) -> AppResult<IssuedToken> {
    let username = username.trim();
    let errors = validate_login(username, password);
    if !errors.is_empty() {
        return Err(AppError::invalid_fields(errors));
    }

    let Some(user) = st.users.find_by_username(username).await? else {
        let _ = verify_password_blocking(password.to_owned(), DUMMY_HASH.clone()).await;
        warn!(username, "login unknown username");
        return Err(AppError::Auth(INVALID_CREDENTIALS.into()));
    };

    if !verify_password_blocking(password.to_owned(), user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Auth(INVALID_CREDENTIALS.into()));
    }

    info!(user_id = %user.id, "user logged in");
    issue(&st.jwt, &user)
}

pub async fn current_user(st: &AppState, user_id: Uuid) -> AppResult<User> {
    st.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(%user_id, "token subject no longer exists");
        AppError::NotFound("User not found".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_reports_each_field() {
        let errors = validate_registration("", "");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "username");
        assert_eq!(errors[1].field, "password");

        let errors = validate_registration("al", "12345");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("at least 3"));
        assert!(errors[1].message.contains("at least 6"));
    }

    #[test]
    fn registration_accepts_minimums() {
        assert!(validate_registration("bob", "secret").is_empty());
    }

    #[test]
    fn login_only_requires_presence() {
        assert!(validate_login("al", "x").is_empty());
        assert_eq!(validate_login("", "x").len(), 1);
    }
}
