use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::ApiResponse;
use crate::auth::AuthContext;
use crate::error::AppError;
use crate::verification::EmailVerificationService;

#[derive(Deserialize)]
pub struct SendCodeRequest {
    pub mail: String,
    pub purpose: String,
}

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub mail: String,
    pub purpose: String,
    pub verify_code: String,
}

/// POST /auth/email/send
pub async fn send_verification_code(
    context: AuthContext,
    form: web::Json<SendCodeRequest>,
    verification: web::Data<EmailVerificationService>,
) -> Result<HttpResponse, AppError> {
    verification
        .send_code(&context, &form.mail, &form.purpose)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("verification code sent")))
}

/// POST /auth/email/verify
///
/// # Errors
/// - 400 (40001): wrong, expired or already used code
/// - 403: `mail` is not the caller's address
pub async fn verify_code(
    context: AuthContext,
    form: web::Json<VerifyCodeRequest>,
    verification: web::Data<EmailVerificationService>,
) -> Result<HttpResponse, AppError> {
    verification
        .verify_code(&context, &form.mail, &form.purpose, &form.verify_code)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("email verified")))
}
