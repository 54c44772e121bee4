/// Error Handling Module
///
/// Unified error handling for the whole service:
/// 1. Domain-specific error types raised by the auth core and its adapters
/// 2. The `ErrorCode` table (numeric wire code, HTTP status, client message)
/// 3. The single `ResponseError` translator that turns any failure into the
///    `{code, message}` envelope
///
/// Handlers and middleware never format error JSON themselves; they return
/// `AppError` and let the translator below do it.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for request payloads
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    MalformedPayload(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::MalformedPayload(msg) => write!(f, "Malformed request: {}", msg),
        }
    }
}

impl StdError for ValidationError {}

/// Authentication and authorization failures raised by the session service
/// and the authentication gate
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// No `Authorization` header, or it does not start with `Bearer `
    MissingToken,
    InvalidToken,
    ExpiredToken,
    InvalidRefreshToken,
    NotMatchedRefreshToken,
    InvalidPassword,
    /// Any other authentication fault (disabled account, unreadable hash, ...)
    LoginError(String),
    Forbidden,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Authorization header is missing"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token has expired"),
            AuthError::InvalidRefreshToken => write!(f, "Refresh token failed verification"),
            AuthError::NotMatchedRefreshToken => {
                write!(f, "Refresh token does not match the stored token")
            }
            AuthError::InvalidPassword => write!(f, "Invalid password"),
            AuthError::LoginError(reason) => write!(f, "Login failed: {}", reason),
            AuthError::Forbidden => write!(f, "Access denied"),
        }
    }
}

impl StdError for AuthError {}

/// Principal lookup and registration errors
#[derive(Debug, Clone, PartialEq)]
pub enum AccountError {
    NotFoundUser,
    EmailAlreadyExists,
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountError::NotFoundUser => write!(f, "User not found"),
            AccountError::EmailAlreadyExists => write!(f, "Email already registered"),
        }
    }
}

impl StdError for AccountError {}

/// Email verification code errors
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationError {
    InvalidCode,
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationError::InvalidCode => write!(f, "Verification code is invalid or expired"),
        }
    }
}

impl StdError for VerificationError {}

/// Key/value store faults (Redis or the in-memory stand-in)
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    Unavailable(String),
    Command(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Key/value store unavailable: {}", msg),
            StoreError::Command(msg) => write!(f, "Key/value store command failed: {}", msg),
        }
    }
}

impl StdError for StoreError {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    NotFound(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Email service errors
#[derive(Debug, Clone)]
pub enum EmailError {
    SendFailed(String),
    InvalidRecipient(String),
}

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailError::SendFailed(msg) => write!(f, "Failed to send email: {}", msg),
            EmailError::InvalidRecipient(msg) => write!(f, "Invalid recipient: {}", msg),
        }
    }
}

impl StdError for EmailError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    Account(AccountError),
    Verification(VerificationError),
    Store(StoreError),
    Database(DatabaseError),
    Email(EmailError),
    /// Route did not match anything
    NotFoundEndPoint,
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Account(e) => write!(f, "{}", e),
            AppError::Verification(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Email(e) => write!(f, "{}", e),
            AppError::NotFoundEndPoint => write!(f, "No such endpoint"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        AppError::Account(err)
    }
}

impl From<VerificationError> for AppError {
    fn from(err: VerificationError) -> Self {
        AppError::Verification(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        AppError::Email(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(DatabaseError::from(err))
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionPool(err.to_string())
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                DatabaseError::UniqueConstraintViolation(db.message().to_string())
            }
            _ => DatabaseError::UnexpectedError(err.to_string()),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

// ============================================================================
// 3. ERROR CODE TABLE
// ============================================================================

/// Wire-level error codes. Each kind owns a numeric code, an HTTP status and
/// the message shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest,
    InvalidVerifyCode,
    EmailAlreadyExists,
    InvalidToken,
    ExpiredToken,
    InvalidRefreshToken,
    NotMatchedRefreshToken,
    InvalidPassword,
    LoginError,
    Forbidden,
    NotFoundEndPoint,
    NotFoundUser,
    InternalServerError,
    EmailSendFailed,
}

impl ErrorCode {
    pub fn code(&self) -> u32 {
        match self {
            ErrorCode::BadRequest => 40000,
            ErrorCode::InvalidVerifyCode => 40001,
            ErrorCode::EmailAlreadyExists => 40002,
            ErrorCode::InvalidToken => 40101,
            ErrorCode::ExpiredToken => 40102,
            ErrorCode::InvalidRefreshToken => 40103,
            ErrorCode::NotMatchedRefreshToken => 40104,
            ErrorCode::InvalidPassword => 40105,
            ErrorCode::LoginError => 40106,
            ErrorCode::Forbidden => 40301,
            ErrorCode::NotFoundEndPoint => 40400,
            ErrorCode::NotFoundUser => 40401,
            ErrorCode::InternalServerError => 50000,
            ErrorCode::EmailSendFailed => 50003,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::InvalidVerifyCode | ErrorCode::EmailAlreadyExists => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::InvalidToken
            | ErrorCode::ExpiredToken
            | ErrorCode::InvalidRefreshToken
            | ErrorCode::NotMatchedRefreshToken
            | ErrorCode::InvalidPassword
            | ErrorCode::LoginError => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFoundEndPoint | ErrorCode::NotFoundUser => StatusCode::NOT_FOUND,
            ErrorCode::InternalServerError | ErrorCode::EmailSendFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "The request payload is malformed.",
            ErrorCode::InvalidVerifyCode => "The verification code is invalid.",
            ErrorCode::EmailAlreadyExists => "This email is already in use.",
            ErrorCode::InvalidToken => "The token is invalid.",
            ErrorCode::ExpiredToken => "The token has expired.",
            ErrorCode::InvalidRefreshToken => "The refresh token is invalid.",
            ErrorCode::NotMatchedRefreshToken => "The refresh token does not match.",
            ErrorCode::InvalidPassword => "The password is incorrect.",
            ErrorCode::LoginError => "Login failed.",
            ErrorCode::Forbidden => "You do not have permission to access this resource.",
            ErrorCode::NotFoundEndPoint => "The requested API does not exist.",
            ErrorCode::NotFoundUser => "User not found.",
            ErrorCode::InternalServerError => "Internal server error.",
            ErrorCode::EmailSendFailed => "Failed to send the email.",
        }
    }
}

impl AppError {
    /// Classify this failure into its wire-level code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::BadRequest,
            AppError::Auth(e) => match e {
                AuthError::MissingToken | AuthError::InvalidToken => ErrorCode::InvalidToken,
                AuthError::ExpiredToken => ErrorCode::ExpiredToken,
                AuthError::InvalidRefreshToken => ErrorCode::InvalidRefreshToken,
                AuthError::NotMatchedRefreshToken => ErrorCode::NotMatchedRefreshToken,
                AuthError::InvalidPassword => ErrorCode::InvalidPassword,
                AuthError::LoginError(_) => ErrorCode::LoginError,
                AuthError::Forbidden => ErrorCode::Forbidden,
            },
            AppError::Account(e) => match e {
                AccountError::NotFoundUser => ErrorCode::NotFoundUser,
                AccountError::EmailAlreadyExists => ErrorCode::EmailAlreadyExists,
            },
            AppError::Verification(VerificationError::InvalidCode) => ErrorCode::InvalidVerifyCode,
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                ErrorCode::EmailAlreadyExists
            }
            AppError::Email(_) => ErrorCode::EmailSendFailed,
            AppError::NotFoundEndPoint => ErrorCode::NotFoundEndPoint,
            AppError::Store(_) | AppError::Database(_) | AppError::Internal(_) => {
                ErrorCode::InternalServerError
            }
        }
    }

    fn log_error(&self) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error = %e, "Validation error");
            }
            AppError::Auth(e) => {
                tracing::warn!(error = %e, "Authentication error");
            }
            AppError::Account(e) => {
                tracing::info!(error = %e, "Account error");
            }
            AppError::Verification(e) => {
                tracing::warn!(error = %e, "Verification error");
            }
            AppError::NotFoundEndPoint => {
                tracing::debug!("Unknown endpoint requested");
            }
            AppError::Store(e) => {
                tracing::error!(error = %e, error_debug = ?e, "Key/value store error");
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, error_debug = ?e, "Database error");
            }
            AppError::Email(e) => {
                tracing::error!(error = %e, "Email service error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
            }
        }
    }
}

// ============================================================================
// 4. HTTP RESPONSE MAPPING
// ============================================================================

/// Uniform error envelope
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub message: String,
}

impl From<ErrorCode> for ErrorResponse {
    fn from(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.log_error();

        let code = self.error_code();
        HttpResponse::build(code.status()).json(ErrorResponse::from(code))
    }

    fn status_code(&self) -> StatusCode {
        self.error_code().status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_and_invalid_tokens_have_distinct_codes() {
        let expired = AppError::from(AuthError::ExpiredToken).error_code();
        let invalid = AppError::from(AuthError::InvalidToken).error_code();

        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
        assert_ne!(expired.code(), invalid.code());
    }

    #[test]
    fn test_missing_token_maps_to_invalid_token() {
        let err = AppError::from(AuthError::MissingToken);
        assert_eq!(err.error_code(), ErrorCode::InvalidToken);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (AppError::from(AuthError::NotMatchedRefreshToken), 401, 40104),
            (AppError::from(AuthError::InvalidRefreshToken), 401, 40103),
            (AppError::from(AuthError::InvalidPassword), 401, 40105),
            (AppError::from(AuthError::LoginError("disabled".into())), 401, 40106),
            (AppError::from(AuthError::Forbidden), 403, 40301),
            (AppError::from(AccountError::NotFoundUser), 404, 40401),
            (AppError::from(AccountError::EmailAlreadyExists), 400, 40002),
            (AppError::from(VerificationError::InvalidCode), 400, 40001),
            (AppError::from(StoreError::Unavailable("down".into())), 500, 50000),
            (AppError::Internal("boom".into()), 500, 50000),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status_code().as_u16(), status, "status for {}", err);
            assert_eq!(err.error_code().code(), code, "code for {}", err);
        }
    }

    #[test]
    fn test_internal_errors_do_not_leak_details() {
        let err = AppError::Store(StoreError::Unavailable("redis://secret-host".into()));
        let body = ErrorResponse::from(err.error_code());

        assert!(!body.message.contains("secret-host"));
        assert_eq!(body.code, 50000);
    }

    #[test]
    fn test_unique_violation_maps_to_email_already_exists() {
        let err = AppError::Database(DatabaseError::UniqueConstraintViolation("users_email_key".into()));
        assert_eq!(err.error_code(), ErrorCode::EmailAlreadyExists);
    }
}
