//! Error types for clubledger-core
//!
//! Error codes, detailed messages and suggestions for the finance engine.

use clubledger_client::{ClientError, PaymentStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    RefundExceedsRemainder,
    InvalidTransition,
    DuplicateSubmission,
    NotFound,
    BackendError,
    DecodeError,
    TransportError,
    Unauthorized,
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::RefundExceedsRemainder => write!(f, "REFUND_EXCEEDS_REMAINDER"),
            ErrorCode::InvalidTransition => write!(f, "INVALID_TRANSITION"),
            ErrorCode::DuplicateSubmission => write!(f, "DUPLICATE_SUBMISSION"),
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::BackendError => write!(f, "BACKEND_ERROR"),
            ErrorCode::DecodeError => write!(f, "DECODE_ERROR"),
            ErrorCode::TransportError => write!(f, "TRANSPORT_ERROR"),
            ErrorCode::Unauthorized => write!(f, "UNAUTHORIZED"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Main error type for clubledger-core
#[derive(Error, Debug)]
pub enum CoreError {
    /// Rejected before any request was made
    #[error("Validation error on {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Refund of {requested} exceeds the refundable remainder of {remaining}")]
    RefundExceedsRemainder { requested: Decimal, remaining: Decimal },

    #[error("Payment cannot move from {from} to {to}")]
    InvalidTransition { from: PaymentStatus, to: PaymentStatus },

    #[error("Refund request {request_id} was already submitted")]
    DuplicateSubmission { request_id: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Backend rejected the request ({status}): {message}")]
    Backend { status: u16, message: String },

    /// A success response whose body could not be read
    #[error("Unreadable backend response: {message}")]
    Decode { message: String },

    #[error("Backend unreachable: {message}")]
    Transport { message: String },

    #[error("Session expired, sign in again")]
    Unauthorized,

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl CoreError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        CoreError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::ValidationError { .. } => ErrorCode::ValidationError,
            CoreError::RefundExceedsRemainder { .. } => ErrorCode::RefundExceedsRemainder,
            CoreError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            CoreError::DuplicateSubmission { .. } => ErrorCode::DuplicateSubmission,
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::Backend { .. } => ErrorCode::BackendError,
            CoreError::Decode { .. } => ErrorCode::DecodeError,
            CoreError::Transport { .. } => ErrorCode::TransportError,
            CoreError::Unauthorized => ErrorCode::Unauthorized,
            CoreError::InternalError { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::ValidationError { .. } => ErrorSeverity::Info,
            CoreError::RefundExceedsRemainder { .. } => ErrorSeverity::Info,
            CoreError::InvalidTransition { .. } => ErrorSeverity::Warning,
            CoreError::DuplicateSubmission { .. } => ErrorSeverity::Warning,
            CoreError::NotFound { .. } => ErrorSeverity::Warning,
            CoreError::Backend { .. } => ErrorSeverity::Error,
            CoreError::Decode { .. } => ErrorSeverity::Error,
            CoreError::Transport { .. } => ErrorSeverity::Error,
            CoreError::Unauthorized => ErrorSeverity::Critical,
            CoreError::InternalError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Whether the error was raised locally without contacting the backend
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            CoreError::ValidationError { .. }
                | CoreError::RefundExceedsRemainder { .. }
                | CoreError::InvalidTransition { .. }
                | CoreError::DuplicateSubmission { .. }
        )
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::ValidationError { field, .. } => {
                details = details.with_detail(serde_json::json!({ "field": field }));
            }
            CoreError::RefundExceedsRemainder { remaining, .. } => {
                details = details.with_detail(serde_json::json!({ "remaining": remaining.to_string() }));
                details = details.with_suggestion(format!("Refund at most {}.", remaining));
            }
            CoreError::InvalidTransition { from, .. } => {
                details = details.with_suggestion(format!(
                    "Payments with status '{}' cannot be changed this way.", from
                ));
            }
            CoreError::DuplicateSubmission { .. } => {
                details = details.with_suggestion(
                    "Reload the payments to see the first submission's result.".to_string()
                );
            }
            CoreError::Transport { .. } => {
                details = details.with_suggestion(
                    "Check the backend URL and network connection, then try again.".to_string()
                );
            }
            CoreError::Unauthorized => {
                details = details.with_suggestion("Sign in again to get a new token.".to_string());
            }
            _ => {}
        }

        details
    }
}

impl From<ClientError> for CoreError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Transport { message } => CoreError::Transport { message },
            ClientError::Backend { status, message } => CoreError::Backend { status, message },
            ClientError::Unauthorized => CoreError::Unauthorized,
            ClientError::NotFound { resource } => CoreError::NotFound { resource },
            ClientError::Decode { message } => CoreError::Decode { message },
            ClientError::IoError(e) => CoreError::InternalError { message: e.to_string() },
        }
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Error context for reporting
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Idempotency key of the request, when there is one
    pub request_id: Option<String>,
    /// Operation being performed
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: &str) -> Self {
        Self {
            request_id: None,
            operation: operation.to_string(),
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

/// Error logger trait
pub trait ErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext);
}

/// Default error logger using log crate
#[derive(Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext) {
        match error.severity() {
            ErrorSeverity::Info => log::debug!(
                target: "clubledger::error",
                "[{}] {} - Operation: {} - Request: {:?}",
                error.code(), error, context.operation, context.request_id
            ),
            ErrorSeverity::Warning => log::warn!(
                target: "clubledger::error",
                "[{}] {} - Operation: {} - Request: {:?}",
                error.code(), error, context.operation, context.request_id
            ),
            ErrorSeverity::Error | ErrorSeverity::Critical => log::error!(
                target: "clubledger::error",
                "[{}] {} - Operation: {} - Request: {:?}",
                error.code(), error, context.operation, context.request_id
            ),
        }
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::ValidationError.to_string(), "VALIDATION_ERROR");
        assert_eq!(ErrorCode::RefundExceedsRemainder.to_string(), "REFUND_EXCEEDS_REMAINDER");
        assert_eq!(ErrorCode::Unauthorized.to_string(), "UNAUTHORIZED");
    }

    #[test]
    fn test_client_side_errors() {
        assert!(CoreError::validation("amount", "must be positive").is_client_side());
        assert!(CoreError::RefundExceedsRemainder {
            requested: Decimal::from(250),
            remaining: Decimal::from(200),
        }
        .is_client_side());
        assert!(!CoreError::Unauthorized.is_client_side());
        assert!(!CoreError::Transport { message: "down".into() }.is_client_side());
    }

    #[test]
    fn test_from_client_error() {
        let err: CoreError = ClientError::Backend { status: 422, message: "bad".into() }.into();
        assert_eq!(err.code(), ErrorCode::BackendError);
        let err: CoreError = ClientError::Unauthorized.into();
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        let err: CoreError = ClientError::Decode { message: "expected an array".into() }.into();
        assert_eq!(err.code(), ErrorCode::DecodeError);
        assert!(!err.to_string().contains("200"));
    }

    #[test]
    fn test_refund_details_carry_remaining() {
        let err = CoreError::RefundExceedsRemainder {
            requested: Decimal::from(250),
            remaining: Decimal::from(200),
        };
        let details = err.to_details();
        assert_eq!(details.code, ErrorCode::RefundExceedsRemainder);
        assert_eq!(details.details.as_ref().unwrap()["remaining"], "200");
        assert!(details.message.contains("250"));
    }

    #[test]
    fn test_validation_details_name_field() {
        let details = CoreError::validation("description", "is required").to_details();
        assert_eq!(details.details.as_ref().unwrap()["field"], "description");
        assert!(details.to_string().starts_with("[VALIDATION_ERROR]"));
    }
}
