use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures surfaced by the access layer.
///
/// A denied permission is not an error; it is a `false` or a
/// `RouteAccess { allowed: false, .. }`. These variants cover misuse and
/// misconfiguration, plus `Forbidden` for the HTTP middleware.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Route '{0}' has no entry in the route registry")]
    UnregisteredRoute(String),

    #[error("Path '{path}' is outside the scope of warehouse '{warehouse}'")]
    OutsideWarehouseScope { path: String, warehouse: String },

    #[error("Invalid route registry: {0}")]
    InvalidRegistry(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AccessError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UnregisteredRoute(_)
            | Self::OutsideWarehouseScope { .. }
            | Self::InvalidRegistry(_)
            | Self::Io(_)
            | Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for response bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnregisteredRoute(_) => "ACCESS_UNREGISTERED_ROUTE",
            Self::OutsideWarehouseScope { .. } => "ACCESS_OUTSIDE_WAREHOUSE",
            Self::InvalidRegistry(_) => "ACCESS_INVALID_REGISTRY",
            Self::Forbidden(_) => "ACCESS_FORBIDDEN",
            Self::Io(_) | Self::Serialization(_) => "ACCESS_INTERNAL_ERROR",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Configuration details stay in the logs.
    pub fn response_message(&self) -> String {
        match self {
            Self::Forbidden(_) => self.to_string(),
            _ => "Access configuration error".to_string(),
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.response_message(),
            }
        }));

        (self.status_code(), body).into_response()
    }
}
