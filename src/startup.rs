use actix_web::dev::Server;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{RefreshTokenStore, SessionService, TokenCodec};
use crate::credentials::CredentialStore;
use crate::email_client::EmailSender;
use crate::error::{AppError, ValidationError};
use crate::events::ViewedEventDispatcher;
use crate::middleware::{
    AuthenticationGate, BearerAuthenticator, GatePolicy, LoggerMiddleware, RequestAuthenticator,
};
use crate::routes::{
    email_check, health_check, login, logout, mark_viewed, me, register, reissue,
    send_verification_code, verify_code,
};
use crate::store::KeyValueStore;
use crate::verification::EmailVerificationService;

/// Everything the HTTP layer needs, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub codec: TokenCodec,
    pub credentials: Arc<dyn CredentialStore>,
    pub store: Arc<dyn KeyValueStore>,
    pub email_sender: Arc<dyn EmailSender>,
    pub viewed_events: ViewedEventDispatcher,
    pub code_ttl: u64,
}

impl AppState {
    pub fn session_service(&self) -> SessionService {
        SessionService::new(
            self.codec.clone(),
            self.credentials.clone(),
            RefreshTokenStore::new(self.store.clone()),
        )
    }

    pub fn verification_service(&self) -> EmailVerificationService {
        EmailVerificationService::new(
            self.store.clone(),
            self.credentials.clone(),
            self.email_sender.clone(),
            self.code_ttl,
        )
    }
}

fn malformed_payload(err: impl std::fmt::Display) -> actix_web::Error {
    AppError::from(ValidationError::MalformedPayload(err.to_string())).into()
}

async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    tracing::debug!(path = %req.path(), "No route matched");
    Err(AppError::NotFoundEndPoint)
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let session = web::Data::new(state.session_service());
    let verification = web::Data::new(state.verification_service());
    let credentials: web::Data<dyn CredentialStore> = web::Data::from(state.credentials.clone());
    let viewed_events = web::Data::new(state.viewed_events.clone());
    let authenticator: Arc<dyn RequestAuthenticator> = Arc::new(BearerAuthenticator::new(
        state.codec.clone(),
        state.credentials.clone(),
    ));

    let server = HttpServer::new(move || {
        App::new()
            // Logger is outermost so it also sees gate rejections
            .wrap(AuthenticationGate::new(authenticator.clone(), GatePolicy::default()))
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(session.clone())
            .app_data(verification.clone())
            .app_data(credentials.clone())
            .app_data(viewed_events.clone())

            // Extractor failures go through the same error envelope
            .app_data(web::JsonConfig::default().error_handler(|err, _| malformed_payload(err)))
            .app_data(web::QueryConfig::default().error_handler(|err, _| malformed_payload(err)))
            .app_data(web::PathConfig::default().error_handler(|err, _| malformed_payload(err)))

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/email-check", web::get().to(email_check))
                    .route("/login", web::post().to(login))
                    .route("/reissue", web::post().to(reissue))
                    .route("/logout", web::post().to(logout))
                    .route("/me", web::get().to(me))
                    .route("/email/send", web::post().to(send_verification_code))
                    .route("/email/verify", web::post().to(verify_code)),
            )
            .route("/sentence-sets/{id}/viewed", web::post().to(mark_viewed))
            .default_service(web::route().to(not_found))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
