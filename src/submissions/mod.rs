pub mod handlers;
pub mod remote;
pub mod repo;
pub mod service;
pub mod types;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
