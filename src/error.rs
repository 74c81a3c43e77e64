//! Unified API error handling
//!
//! Provides consistent error responses across all endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::research::ResearchError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Research(#[from] ResearchError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn validation(details: Vec<String>) -> Self {
        Self::Validation(details)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(msg.into()))
    }

    /// Fail with `Validation` if `errors` is non-empty.
    pub fn check(errors: Vec<String>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation(errors))
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Research(ResearchError::ProviderNotConfigured(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Research(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Research(ResearchError::Provider(_)) => "PRICING_RESEARCH_FAILED",
            Self::Research(ResearchError::Parse(_)) => "AI_RESPONSE_PARSE_FAILED",
            Self::Research(ResearchError::ProviderNotConfigured(_)) => "AI_PROVIDER_NOT_CONFIGURED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Validation(_) => "Request validation failed".to_string(),
            Self::NotFound(msg) => msg.clone(),
            Self::Research(e) => e.to_string(),
            // Don't leak internal error details
            Self::Internal(_) | Self::Database(_) => "An internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(e) => {
                tracing::error!(error = ?e, "Internal server error");
            }
            Self::Database(e) => {
                tracing::error!(error = ?e, "Database error");
            }
            Self::Research(e) => {
                tracing::error!(error = %e, "Pricing research error");
            }
            _ => {
                tracing::warn!(error = %self, "API error");
            }
        }

        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
            details: match self {
                Self::Validation(details) => details,
                _ => Vec::new(),
            },
            request_id: None, // Will be populated by middleware if available
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::LlmError;

    fn provider_error() -> ResearchError {
        ResearchError::Provider(LlmError::InvalidResponse {
            provider: "openai",
            message: "truncated body".to_string(),
        })
    }

    #[test]
    fn research_errors_map_to_gateway_codes() {
        let err = ApiError::from(provider_error());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), "PRICING_RESEARCH_FAILED");

        let err = ApiError::from(ResearchError::Parse("expected value".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), "AI_RESPONSE_PARSE_FAILED");

        let err = ApiError::from(ResearchError::ProviderNotConfigured("anthropic"));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "AI_PROVIDER_NOT_CONFIGURED");
    }

    #[test]
    fn validation_carries_details() {
        let err = ApiError::validation(vec!["labor_hours must be greater than or equal to 0".into()]);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert!(ApiError::check(Vec::new()).is_ok());
    }

    #[test]
    fn internal_details_are_not_public() {
        let err = ApiError::internal("Database error: connection refused");
        assert_eq!(err.public_message(), "An internal error occurred");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn research_message_is_public() {
        let err = ApiError::from(provider_error());
        assert!(err.public_message().starts_with("Pricing research failed"));
    }
}
