/// Error Handling Module
///
/// Every failure in the service is one of a small set of domain error kinds.
/// They are raised by the session manager, the token store and the
/// authentication gate, and are turned into an HTTP status plus JSON envelope
/// exactly once, at the request boundary (`ResponseError for AppError`).

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::response::ApiResponse;

/// Message returned for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid email/password";

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    SuspiciousContent(String),
    Malformed(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is required", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
            ValidationError::Malformed(msg) => write!(f, "malformed request: {}", msg),
        }
    }
}

impl StdError for ValidationError {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Authentication and token errors
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// Unknown email or wrong password. Both cases look the same to the caller.
    InvalidCredentials,
    /// Token absent from the store, malformed, expired, revoked or badly signed
    InvalidToken,
    /// Authorization header malformed, or no identity on a protected route
    Unauthorized,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "{}", INVALID_CREDENTIALS_MESSAGE),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::Unauthorized => write!(f, "Unauthorized"),
        }
    }
}

impl StdError for AuthError {}

/// Failures of the cryptographic primitives
#[derive(Debug, Clone, PartialEq)]
pub enum CryptoError {
    Hashing(String),
    Randomness(String),
    Signing(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::Hashing(msg) => write!(f, "Password hashing failed: {}", msg),
            CryptoError::Randomness(msg) => write!(f, "Random source unavailable: {}", msg),
            CryptoError::Signing(msg) => write!(f, "Token signing failed: {}", msg),
        }
    }
}

impl StdError for CryptoError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    Conflict(String),
    NotFound(String),
    Database(DatabaseError),
    Config(ConfigError),
    Crypto(CryptoError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Conflict(msg) => write!(f, "{}", msg),
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Crypto(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl AppError {
    pub fn invalid_token() -> Self {
        AppError::Auth(AuthError::InvalidToken)
    }

    pub fn unauthorized() -> Self {
        AppError::Auth(AuthError::Unauthorized)
    }
}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<CryptoError> for AppError {
    fn from(err: CryptoError) -> Self {
        AppError::Crypto(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let constraint = db_err.constraint().unwrap_or("unique constraint").to_string();
                if constraint.contains("email") {
                    AppError::Conflict("email already used".to_string())
                } else {
                    AppError::Database(DatabaseError::UniqueConstraintViolation(constraint))
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            sqlx::Error::Database(_) => {
                AppError::Database(DatabaseError::QueryExecution(err.to_string()))
            }
            _ => AppError::Database(DatabaseError::UnexpectedError(err.to_string())),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Trait for converting errors to HTTP responses and log events
pub trait ErrorHandler {
    fn error_envelope(&self) -> (StatusCode, ApiResponse<()>);
    fn log_error(&self, context: &ErrorContext);
}

impl ErrorHandler for AppError {
    fn error_envelope(&self) -> (StatusCode, ApiResponse<()>) {
        let message = match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Auth(e) => e.to_string(),
            AppError::Conflict(msg) | AppError::NotFound(msg) => msg.clone(),
            // Storage, crypto and config details stay in the logs.
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Config(_) => "Server configuration error".to_string(),
            AppError::Crypto(_) | AppError::Internal(_) => "Internal server error".to_string(),
        };

        (self.status_code(), ApiResponse::failure(message))
    }

    fn log_error(&self, context: &ErrorContext) {
        let request_id = context.request_id.as_str();
        let operation = context.operation.as_str();
        let user_id = context.user_id.as_deref().unwrap_or("-");

        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id, operation, user_id, error = %e, "Validation error");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(request_id, operation, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id, operation, user_id, error = %e, "Authentication error");
            }
            AppError::Conflict(msg) => {
                tracing::warn!(request_id, operation, user_id, error = %msg, "Conflict");
            }
            AppError::NotFound(msg) => {
                tracing::info!(request_id, operation, user_id, error = %msg, "Not found");
            }
            AppError::Database(e) => {
                tracing::error!(request_id, operation, user_id, error = %e, "Database error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id, operation, user_id, error = %e, "Configuration error");
            }
            AppError::Crypto(e) => {
                tracing::error!(request_id, operation, user_id, error = %e, "Cryptographic failure");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id, operation, user_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
///
/// Only builds the response. The request logger logs the error, once, under
/// the request id it also returns to the client.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, body) = self.error_envelope();
        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Config(_)
            | AppError::Crypto(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-request context used to correlate an error log with its response
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl ToString) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email".to_string());
        assert_eq!(err.to_string(), "email is required");
    }

    #[test]
    fn test_app_error_conversion() {
        let val_err = ValidationError::InvalidFormat("test".to_string());
        let app_err: AppError = val_err.into();
        match app_err {
            AppError::Validation(_) => (),
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (AppError::Validation(ValidationError::EmptyField("x".into())), 400),
            (AppError::Auth(AuthError::InvalidCredentials), 401),
            (AppError::invalid_token(), 401),
            (AppError::unauthorized(), 401),
            (AppError::Conflict("email already used".into()), 409),
            (AppError::NotFound("post not found".into()), 404),
            (AppError::Database(DatabaseError::QueryExecution("boom".into())), 500),
            (AppError::Config(ConfigError::MissingRequired("jwt.secret".into())), 500),
            (AppError::Crypto(CryptoError::Randomness("no entropy".into())), 500),
            (AppError::Internal("boom".into()), 500),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code().as_u16(), expected, "status for {:?}", error);
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let error = AppError::Database(DatabaseError::QueryExecution(
            "relation \"users\" does not exist".into(),
        ));
        let (_, body) = error.error_envelope();

        assert!(!body.success);
        assert!(!body.message.contains("users"));
        assert!(body.data.is_none());
    }

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        let error = AppError::Auth(AuthError::InvalidCredentials);
        let (_, body) = error.error_envelope();
        assert_eq!(body.message, INVALID_CREDENTIALS_MESSAGE);
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("test_operation");
        assert_eq!(ctx.operation, "test_operation");
        assert!(ctx.user_id.is_none());

        let ctx_with_user = ctx.with_user_id("user-123");
        assert_eq!(ctx_with_user.user_id, Some("user-123".to_string()));
    }

    #[test]
    fn test_error_response_matches_envelope() {
        let error = AppError::NotFound("post not found".into());
        let response = ResponseError::error_response(&error);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
