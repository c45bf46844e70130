use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::gateway::GatewayError;

#[derive(Debug)]
pub enum AppError {
    InvalidArgument(String),
    NotReady { cause: Option<String> },
    ChannelNotFound(String),
    InvalidChannelType(String),
    PermissionDenied(String),
    /// The library's error text, kept for diagnostics only.
    DispatchFailed(String),
    Internal(String),
    NotFound(String),
    RateLimited { retry_after: u64 },
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "InvalidArgument",
            AppError::NotReady { .. } => "NotReady",
            AppError::ChannelNotFound(_) => "ChannelNotFound",
            AppError::InvalidChannelType(_) => "InvalidChannelType",
            AppError::PermissionDenied(_) => "PermissionDenied",
            AppError::DispatchFailed(_) => "DispatchFailed",
            AppError::Internal(_) => "InternalError",
            AppError::NotFound(_) => "NotFound",
            AppError::RateLimited { .. } => "RateLimited",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ChannelNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidChannelType(_) => StatusCode::BAD_REQUEST,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::DispatchFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::InvalidArgument(msg) => msg.clone(),
            AppError::NotReady { .. } => "bot is not ready yet".to_string(),
            AppError::ChannelNotFound(msg) => msg.clone(),
            AppError::InvalidChannelType(msg) => msg.clone(),
            AppError::PermissionDenied(msg) => msg.clone(),
            AppError::DispatchFailed(e) => {
                tracing::error!("dispatch failed: {e}");
                "failed to send message".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {e}");
                "internal server error".to_string()
            }
            AppError::NotFound(msg) => msg.clone(),
            AppError::RateLimited { retry_after } => {
                format!("rate limited, retry after {retry_after}s")
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::DispatchFailed(e) | AppError::Internal(e) => {
                write!(f, "{}: {e}", self.kind())
            }
            _ => write!(f, "{}", self.kind()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "success": false,
            "error": self.kind(),
            "message": self.message(),
        });
        match &self {
            AppError::NotReady { cause } => {
                body["login_error"] = json!(cause);
            }
            AppError::DispatchFailed(details) => {
                body["details"] = json!(details);
            }
            _ => {}
        }

        let mut response = (status, Json(body)).into_response();
        if let AppError::RateLimited { retry_after } = &self {
            response
                .headers_mut()
                .insert("Retry-After", HeaderValue::from(*retry_after));
        }
        response
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::InvalidId(id) => {
                AppError::InvalidArgument(format!("'{id}' is not a valid snowflake id"))
            }
            GatewayError::Forbidden(msg) => AppError::PermissionDenied(msg),
            GatewayError::Timeout(op) => AppError::DispatchFailed(format!("{op} timed out")),
            GatewayError::Library(msg) => AppError::DispatchFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_ready_body() {
        let (status, body) = body_json(AppError::NotReady {
            cause: Some("invalid token".into()),
        })
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "NotReady");
        assert_eq!(body["success"], false);
        assert_eq!(body["login_error"], "invalid token");
    }

    #[tokio::test]
    async fn test_dispatch_failed_carries_details() {
        let (status, body) = body_json(AppError::DispatchFailed("Missing Access".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "DispatchFailed");
        assert_eq!(body["details"], "Missing Access");
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let (status, body) = body_json(AppError::Internal("secret stack".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "InternalError");
        assert_eq!(body["message"], "internal server error");
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited { retry_after: 7 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["Retry-After"], "7");
    }

    #[test]
    fn test_gateway_error_mapping() {
        assert_eq!(
            AppError::from(GatewayError::InvalidId("abc".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(GatewayError::Forbidden("no".into())).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(GatewayError::Timeout("send")).kind(),
            "DispatchFailed"
        );
    }
}
