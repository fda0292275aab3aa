pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::{
    config::Config,
    engine::RngSource,
    processing::job::AugmentParams,
    storage::MediaStore,
};

/// Shared by every request. Nothing in here is mutated after startup
/// except the rng counter.
#[derive(Debug)]
pub struct AppState {
    pub store: MediaStore,
    pub params: AugmentParams,
    pub rngs: RngSource,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            store: MediaStore::new(config.media_root.clone(), config.media_url.clone()),
            params: config.params.clone(),
            rngs: RngSource::new(config.seed),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let media_route = format!("{}:filename", state.store.url_prefix());

    Router::new()
        .route("/api/hello", get(handlers::hello))
        .route("/api/hello/", get(handlers::hello))
        .route("/api/upload", post(handlers::upload))
        .route("/api/upload/", post(handlers::upload))
        .route("/download/:filename", get(handlers::download))
        .route(&media_route, get(handlers::media))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .with_state(state)
}
