//! REST surface: user registration/login/profile and owner-gated interview
//! CRUD, JSON over HTTP with bearer-token auth.

pub mod auth;
pub mod error;
pub mod interviews;
pub mod users;

pub use auth::AuthKeys;
pub use error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use log::info;
use tower_http::cors::CorsLayer;

use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: Arc<AuthKeys>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, auth: AuthKeys) -> Self {
        Self {
            store,
            auth: Arc::new(auth),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(users::register_handler))
        .route("/api/users/login", post(users::login_handler))
        .route("/api/users/profile", get(users::profile_handler))
        .route(
            "/api/interviews",
            post(interviews::create_handler).get(interviews::list_handler),
        )
        .route(
            "/api/interviews/{id}",
            get(interviews::get_handler)
                .put(interviews::update_handler)
                .delete(interviews::delete_handler),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves the API until the process is stopped.
pub async fn serve(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on {bind_addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
