pub mod auth;
pub mod configuration;
pub mod credentials;
pub mod email_client;
pub mod error;
pub mod events;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod validators;
pub mod verification;
