//! seqmgr Studio - HTTP surface for the sequence workflow
//!
//! Each session mounts one sequence workflow for an account. Clients post
//! workflow events and render the returned view snapshot:
//! - Sequence listing with consumer counts
//! - Database and table selection
//! - Creation form with field and publication errors

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;
pub mod session;
pub mod state;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Create the Axum router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::api::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
