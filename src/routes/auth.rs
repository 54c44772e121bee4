/// Authentication Routes
///
/// Registration, email availability, login, token reissue, logout and the
/// current principal. Tokens travel as an `Authorization: Bearer` response
/// header (access) and a `RefreshToken` cookie (refresh).

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::auth::{hash_password, AuthContext, SessionService};
use crate::credentials::{CredentialStore, NewPrincipal, Principal, Role};
use crate::error::{AccountError, AppError, AuthError};
use crate::validators::is_valid_email;

pub const REFRESH_TOKEN_COOKIE: &str = "RefreshToken";
pub const REFRESH_TOKEN_HEADER: &str = "RefreshToken";
pub const IS_ADMIN_COOKIE: &str = "isAdmin";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct EmailCheckQuery {
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// What a client may see of a principal
#[derive(Debug, Serialize, Deserialize)]
pub struct PrincipalSummary {
    pub id: i64,
    pub email: String,
    pub enabled: bool,
    pub is_admin: bool,
}

impl From<&Principal> for PrincipalSummary {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            email: principal.email.clone(),
            enabled: principal.enabled,
            is_admin: principal.is_admin(),
        }
    }
}

fn bearer(access_token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {}", access_token))
}

fn session_cookie<'a>(name: &'a str, value: String, max_age_secs: i64) -> Cookie<'a> {
    Cookie::build(name, value)
        .path("/")
        .max_age(Duration::seconds(max_age_secs))
        .http_only(false)
        .finish()
}

fn expired_cookie(name: &str) -> Cookie<'_> {
    Cookie::build(name, "")
        .path("/")
        .max_age(Duration::ZERO)
        .finish()
}

/// POST /auth/register
///
/// # Errors
/// - 400: invalid email or empty password
/// - 400 (40002): email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    credentials: web::Data<dyn CredentialStore>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    let password_hash = hash_password(&form.password)?;

    let principal = credentials
        .create(NewPrincipal {
            email,
            password_hash,
            role: Role::Nobody,
            enabled: true,
        })
        .await?;

    tracing::info!(user = %principal.identifier(), "User registered");
    Ok(HttpResponse::Ok().json(ApiResponse::ok("registered")))
}

/// GET /auth/email-check?email=
pub async fn email_check(
    query: web::Query<EmailCheckQuery>,
    credentials: web::Data<dyn CredentialStore>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&query.email)?;

    if credentials.exists_by_identifier(&email).await? {
        return Err(AccountError::EmailAlreadyExists.into());
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok("available")))
}

/// POST /auth/login
///
/// Sets the access token header plus `RefreshToken` and `isAdmin` cookies.
///
/// # Errors
/// - 404: unknown user
/// - 401 (40105): wrong password
/// - 401 (40106): disabled account
pub async fn login(
    form: web::Json<LoginRequest>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let outcome = session.login(form.username.trim(), &form.password).await?;
    let max_age = session.codec().refresh_token_expiry();

    Ok(HttpResponse::Ok()
        .insert_header(bearer(&outcome.tokens.access_token))
        .cookie(session_cookie(REFRESH_TOKEN_COOKIE, outcome.tokens.refresh_token.clone(), max_age))
        .cookie(session_cookie(IS_ADMIN_COOKIE, outcome.principal.is_admin().to_string(), max_age))
        .json(ApiResponse::ok(PrincipalSummary::from(&outcome.principal))))
}

/// POST /auth/reissue
///
/// The refresh token is read from the `RefreshToken` request header, or from
/// the cookie of the same name when the header is absent.
///
/// # Errors
/// - 401 (40103): missing, expired or tampered refresh token
/// - 401 (40104): not the current rotation (replay or post-logout)
pub async fn reissue(
    req: HttpRequest,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = req
        .headers()
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.cookie(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string()))
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidRefreshToken)?;

    let tokens = session.reissue(&refresh_token).await?;
    let cookie = Cookie::build(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone())
        .path("/")
        .max_age(Duration::seconds(session.codec().refresh_token_expiry()))
        .same_site(SameSite::Lax)
        .http_only(false)
        .finish();

    Ok(HttpResponse::Ok()
        .insert_header(bearer(&tokens.access_token))
        .cookie(cookie)
        .json(ApiResponse::ok("reissued")))
}

/// POST /auth/logout
pub async fn logout(
    context: Option<AuthContext>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    session.logout(context.as_ref()).await?;

    Ok(HttpResponse::Ok()
        .cookie(expired_cookie(REFRESH_TOKEN_COOKIE))
        .cookie(expired_cookie(IS_ADMIN_COOKIE))
        .json(ApiResponse::ok("logged out")))
}

/// GET /auth/me
pub async fn me(context: AuthContext) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(PrincipalSummary::from(context.principal())))
}
