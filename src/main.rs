use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use sentence_auth::auth::TokenCodec;
use sentence_auth::configuration::get_configuration;
use sentence_auth::credentials::PgCredentialStore;
use sentence_auth::email_client::{EmailClient, SenderEmail};
use sentence_auth::events::{spawn_viewed_worker, PgLastViewedRecorder, DEFAULT_QUEUE_CAPACITY};
use sentence_auth::startup::{run, AppState};
use sentence_auth::store::RedisStore;
use sentence_auth::telemetry::init_telemetry;

fn startup_error(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Structured logging
    init_telemetry("info");

    tracing::info!("Starting application");

    // Configuration
    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(startup_error(std::io::ErrorKind::InvalidInput, "Configuration error"));
        }
    };

    // Database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;
    tracing::info!("Database connection pool created successfully");

    // Redis (refresh tokens, verification codes)
    let store = RedisStore::connect(&configuration.redis).await.map_err(|e| {
        tracing::error!("Failed to connect to Redis: {}", e);
        startup_error(std::io::ErrorKind::ConnectionRefused, "Redis connection error")
    })?;
    tracing::info!("Redis connection established");

    let sender = SenderEmail::parse(configuration.email_client.sender_email.clone()).map_err(|e| {
        tracing::error!("Invalid sender email: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    let email_client = EmailClient::new(
        configuration.email_client.base_url.clone(),
        sender,
        configuration.email_client.timeout(),
    );

    let (viewed_events, _worker) = spawn_viewed_worker(
        Arc::new(PgLastViewedRecorder::new(pool.clone())),
        DEFAULT_QUEUE_CAPACITY,
    );

    let state = AppState {
        codec: TokenCodec::new(&configuration.jwt),
        credentials: Arc::new(PgCredentialStore::new(pool)),
        store: Arc::new(store),
        email_sender: Arc::new(email_client),
        viewed_events,
        code_ttl: configuration.verification.code_ttl,
    };

    // Bind and serve
    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, state)?.await
}
