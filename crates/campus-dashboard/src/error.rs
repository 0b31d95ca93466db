//! Error types for the dashboard crate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised outside of an action. Action failures are reported as a
/// normalized [`campus_core::ActionResult`] body instead.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Failed to start the server.
    #[error("failed to start dashboard: {0}")]
    StartupFailed(String),

    /// Unknown resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request headers.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DashboardError::StartupFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_statuses() {
        let cases = [
            (DashboardError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DashboardError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                DashboardError::StartupFailed("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
