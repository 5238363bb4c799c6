//! Email/password authentication against the hosted auth API.
//!
//! A [`Session`] carries the access token every table and channel request is
//! authorized with. Tokens are not refreshed; an expired session means
//! signing in again.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Sessions without an expiry never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected auth response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => Some(now + chrono::Duration::seconds(secs)),
            (None, None) => None,
        };

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user_id: self.user.id,
            email: self.user.email,
            expires_at,
        }
    }
}

/// Client for `/auth/v1`.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AuthClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    fn build_url(&self, path: &str) -> String {
        let base_url = if !self.base_url.starts_with("http://")
            && !self.base_url.starts_with("https://")
        {
            format!("https://{}", self.base_url)
        } else {
            self.base_url.clone()
        };

        format!("{}/auth/v1{}", base_url.trim_end_matches('/'), path)
    }

    /// Signs in with email and password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let body = self
            .post("/token?grant_type=password", email, password)
            .await?;
        let token: TokenResponse =
            serde_json::from_value(body).map_err(|e| AuthError::Decode(e.to_string()))?;

        let session = token.into_session(Utc::now());
        tracing::info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    /// Registers a new account.
    ///
    /// Returns `None` when the project requires email confirmation before the
    /// first sign-in.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError> {
        let body = self.post("/signup", email, password).await?;
        Ok(parse_signup(body, Utc::now()))
    }

    async fn post(&self, path: &str, email: &str, password: &str) -> Result<Value, AuthError> {
        let response = self
            .http
            .post(self.build_url(path))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| text.trim().to_string());
            tracing::debug!(status = status.as_u16(), %message, "Auth request rejected");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

fn parse_signup(body: Value, now: DateTime<Utc>) -> Option<Session> {
    serde_json::from_value::<TokenResponse>(body)
        .ok()
        .map(|token| token.into_session(now))
}

fn error_message(body: &Value) -> Option<String> {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
