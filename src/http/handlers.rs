//! Axum HTTP handlers for the web server

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{
    domain::CallContext,
    rpc::envelope::{self, Id, PARSE_ERROR},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub rpc_endpoint: &'static str,
    pub methods: Vec<String>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        rpc_endpoint: "/rpc",
        methods: state.server.methods().into_iter().map(str::to_string).collect(),
    })
}

pub async fn rpc_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = match envelope::parse_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, "rejecting unparsable body");
            return (
                StatusCode::OK,
                Json(envelope::Response::failure(Id::Null, PARSE_ERROR)),
            )
                .into_response();
        }
    };

    let ctx = CallContext {
        caller: headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    };

    match state.server.handle(payload, ctx).await {
        Some(reply) if !reply.is_empty() => (StatusCode::OK, Json(reply)).into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}
