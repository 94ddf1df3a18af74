//! cangw-api - HTTP layer of the CAN signal gateway
//!
//! Serves the operator command protocol (`/send_can`, `/status`, `/`) and
//! the parameter boundary (`/parameters/...`, SSE on `/parameters/subscribe`).
//!
//! # Usage
//!
//! ```ignore
//! use cangw_api::{create_router, AppState};
//!
//! let state = AppState::new(gateway, parameters);
//! let router = create_router(state);
//! axum::serve(listener, router).await?;
//! ```

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the gateway router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        // Command protocol
        .route("/", get(handlers::page::index))
        .route("/send_can", post(handlers::command::send_can))
        .route("/status", get(handlers::command::status))
        // Parameter boundary
        .route(
            "/parameters",
            get(handlers::parameters::list_parameters).put(handlers::parameters::set_parameters),
        )
        .route(
            "/parameters/bindings",
            get(handlers::parameters::list_bindings).post(handlers::parameters::create_binding),
        )
        .route("/parameters/subscribe", get(handlers::parameters::subscribe))
        .route(
            "/parameters/{name}",
            get(handlers::parameters::get_parameter).put(handlers::parameters::set_parameter),
        )
        .fallback(handlers::command::not_recognized)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
