mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use dto::{ImageInput, ReturnResponse, ReturnSubmission};
pub use repo::ReturnRepo;
pub use repo_types::{NewReturn, ReturnImage, ReturnRecord};

pub fn router(max_body_bytes: usize) -> Router<AppState> {
    Router::new().merge(handlers::return_routes(max_body_bytes))
}
