use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod client;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod rpc;

use domain::CallContext;
use rpc::Server;

#[derive(Clone)]
pub struct AppState {
    pub server: Server<CallContext>,
}

impl AppState {
    pub fn new(server: Server<CallContext>) -> Self {
        Self { server }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/jsonrpc", get(http::handlers::discovery))
        .route("/rpc", post(http::handlers::rpc_endpoint))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
