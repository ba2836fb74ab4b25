//! Returns desk: account registration, JWT sessions and product return requests.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod memory;
pub mod returns;
pub mod state;
pub mod storage;

pub use app::build_app;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use state::AppState;
