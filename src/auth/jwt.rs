/// JWT Token Issuance and Verification
///
/// `TokenCodec` signs compact HS256 tokens and classifies presented tokens
/// into a three-state `VerifyResult`. It holds the process-wide signing key
/// and is read-only after construction, so one instance is shared by every
/// request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::AppError;

/// Outcome of verifying a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// Signature valid and not yet expired
    Success(String),
    /// Signature valid but past its expiry
    Expired(String),
    /// Bad signature or malformed token. Carries the subject when the
    /// payload could still be decoded, for diagnostics only.
    Invalid(Option<String>),
}

impl VerifyResult {
    pub fn is_success(&self) -> bool {
        matches!(self, VerifyResult::Success(_))
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            VerifyResult::Success(sub) | VerifyResult::Expired(sub) => Some(sub),
            VerifyResult::Invalid(sub) => sub.as_deref(),
        }
    }
}

/// Access and refresh token issued together
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Only the subject is read from payloads whose signature is not trusted
#[derive(Deserialize)]
struct UnverifiedClaims {
    sub: Option<String>,
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

impl TokenCodec {
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
        }
    }

    /// Refresh token lifetime in seconds, also the refresh record TTL
    pub fn refresh_token_expiry(&self) -> i64 {
        self.refresh_token_expiry
    }

    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Sign a token for `subject` expiring `ttl_seconds` from now
    ///
    /// # Errors
    /// Returns error if signing fails
    pub fn issue(&self, subject: &str, ttl_seconds: i64) -> Result<String, AppError> {
        let claims = Claims::new(subject, ttl_seconds);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    pub fn issue_access_token(&self, subject: &str) -> Result<String, AppError> {
        self.issue(subject, self.access_token_expiry)
    }

    pub fn issue_refresh_token(&self, subject: &str) -> Result<String, AppError> {
        self.issue(subject, self.refresh_token_expiry)
    }

    /// Issue a fresh access/refresh pair for `subject`
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(subject)?,
            refresh_token: self.issue_refresh_token(subject)?,
        })
    }

    /// Verify a token and classify the outcome.
    ///
    /// Expiry is checked here rather than by `jsonwebtoken` so that a
    /// correctly signed but expired token is reported as `Expired` with its
    /// subject instead of as a generic failure.
    pub fn verify(&self, token: &str) -> VerifyResult {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp"]);

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) if data.claims.is_expired() => VerifyResult::Expired(data.claims.sub),
            Ok(data) => VerifyResult::Success(data.claims.sub),
            Err(e) => {
                let subject = decode_unverified_subject(token);
                tracing::debug!(
                    error = %e,
                    subject = subject.as_deref().unwrap_or("<unknown>"),
                    "Token failed verification"
                );
                VerifyResult::Invalid(subject)
            }
        }
    }
}

/// Best-effort subject extraction without trusting the signature. The
/// header is never parsed, so unsigned (`alg: none`) tokens still yield
/// their subject.
fn decode_unverified_subject(token: &str) -> Option<String> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_header), Some(payload)) => payload,
        _ => return None,
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<UnverifiedClaims>(&bytes)
        .ok()
        .and_then(|claims| claims.sub)
}
