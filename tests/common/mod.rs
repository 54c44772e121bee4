#![allow(dead_code)]

use reqwest::header::{HeaderMap, AUTHORIZATION, SET_COOKIE};
use reqwest::Response;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use sentence_auth::auth::{hash_password, TokenCodec};
use sentence_auth::configuration::JwtSettings;
use sentence_auth::credentials::{CredentialStore, InMemoryCredentialStore, NewPrincipal, Role};
use sentence_auth::email_client::EmailSender;
use sentence_auth::error::EmailError;
use sentence_auth::events::{spawn_viewed_worker, InMemoryLastViewedRecorder};
use sentence_auth::startup::{run, AppState};
use sentence_auth::store::InMemoryStore;

pub const PASSWORD: &str = "correct horse battery staple";

/// Captures outgoing mail instead of sending it
#[derive(Default)]
pub struct RecordingEmailSender {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_email(&self, recipient: &str, _subject: &str, html: &str) -> Result<(), EmailError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), html.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub codec: TokenCodec,
    pub store: Arc<InMemoryStore>,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub emails: Arc<RecordingEmailSender>,
    pub last_viewed: Arc<InMemoryLastViewedRecorder>,
}

/// Tokens handed out by a successful login
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let codec = TokenCodec::new(&JwtSettings {
        secret: "integration-test-secret-key-32-bytes-long".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
    });
    let store = Arc::new(InMemoryStore::new());
    let credentials = Arc::new(InMemoryCredentialStore::new());
    let emails = Arc::new(RecordingEmailSender::default());
    let last_viewed = Arc::new(InMemoryLastViewedRecorder::new());
    let (viewed_events, _) = spawn_viewed_worker(last_viewed.clone(), 16);

    let state = AppState {
        codec: codec.clone(),
        credentials: credentials.clone(),
        store: store.clone(),
        email_sender: emails.clone(),
        viewed_events,
        code_ttl: 1800,
    };

    let server = run(listener, state).expect("Failed to create server");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        codec,
        store,
        credentials,
        emails,
        last_viewed,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Insert a principal directly, bypassing registration
    pub async fn add_user(&self, email: &str, role: Role) {
        self.credentials
            .create(NewPrincipal {
                email: email.to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                role,
                enabled: true,
            })
            .await
            .expect("Failed to create principal");
    }

    pub async fn post_login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login(&self, username: &str) -> Session {
        let response = self.post_login(username, PASSWORD).await;
        assert_eq!(200, response.status().as_u16());
        Session {
            access_token: access_token(response.headers()).expect("Missing access token"),
            refresh_token: cookie(response.headers(), "RefreshToken").expect("Missing refresh cookie"),
        }
    }

    pub async fn post_reissue(&self, refresh_token: &str) -> Response {
        self.client
            .post(self.url("/auth/reissue"))
            .header("RefreshToken", refresh_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_with_token(&self, path: &str, access_token: &str) -> Response {
        self.client
            .get(self.url(path))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_json_with_token(&self, path: &str, access_token: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub fn access_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Raw `Set-Cookie` line for `name`
pub fn set_cookie_line(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|line| line.starts_with(&prefix))
        .map(str::to_string)
}

pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let line = set_cookie_line(headers, name)?;
    let pair = line.split(';').next()?;
    pair.split_once('=').map(|(_, value)| value.to_string())
}

/// Error envelope code and HTTP status
pub async fn error_code(response: Response) -> (u16, u64) {
    let status = response.status().as_u16();
    let body: Value = response.json().await.expect("Failed to parse error body");
    assert!(body.get("message").is_some(), "error envelope without message: {}", body);
    (status, body["code"].as_u64().expect("error envelope without code"))
}
