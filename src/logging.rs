use std::time::Instant;

use axum::{
    extract::Request,
    http::{header::CONTENT_LENGTH, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Quiet,
    Normal,
    Rejected,
    Failed,
}

/// Probe traffic is kept at debug; everything else is summarised at info.
fn classify(path: &str, status: StatusCode) -> Severity {
    if status.is_server_error() {
        Severity::Failed
    } else if status.is_client_error() {
        Severity::Rejected
    } else if path == "/health" {
        Severity::Quiet
    } else {
        Severity::Normal
    }
}

pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let body_bytes = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis();

    match classify(&path, status) {
        Severity::Quiet => debug!(path = %path, status = status.as_u16(), "probe answered"),
        Severity::Normal => info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            body_bytes,
            duration_ms = elapsed_ms,
            "request summary"
        ),
        Severity::Rejected => warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = elapsed_ms,
            "request rejected"
        ),
        Severity::Failed => error!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = elapsed_ms,
            "request failed"
        ),
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_probes_are_quiet() {
        assert_eq!(classify("/health", StatusCode::OK), Severity::Quiet);
        assert_eq!(classify("/rpc", StatusCode::NO_CONTENT), Severity::Normal);
    }

    #[test]
    fn error_statuses_escalate() {
        assert_eq!(classify("/rpc", StatusCode::UNSUPPORTED_MEDIA_TYPE), Severity::Rejected);
        assert_eq!(classify("/health", StatusCode::INTERNAL_SERVER_ERROR), Severity::Failed);
    }
}
