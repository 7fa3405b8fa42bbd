pub mod api;
pub mod config;
pub mod fallback;
pub mod state;
pub mod upstream;

use axum::Router;

pub use config::AppConfig;
pub use state::AppState;

pub fn build_app(state: AppState) -> Router {
    api::router(state)
}
