use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use jwt::{AuthUser, JwtKeys};
pub use repo::{CreateUserError, UserRepo};
pub use repo_types::{NewUser, Role, User};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
