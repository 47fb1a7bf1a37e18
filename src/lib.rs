pub mod appresult;
pub mod config;
pub mod res;
pub mod rooms;

use std::sync::Arc;

use axum::{Router, extract::FromRef, routing::get};
use tower_http::cors::CorsLayer;

pub use appresult::{AppError, AppResult};
pub use config::Config;

use rooms::{Registry, SignalRouter};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub router: SignalRouter,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            router: SignalRouter::new(Registry::new(config.room_capacity)),
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(res::index))
        .merge(rooms::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
}
