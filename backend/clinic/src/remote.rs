//! # Upstream Clinical API
//!
//! Thin client for the remote API the gateway fronts. The base URL already carries
//! the `/api` prefix, so paths here are relative to it.
//!
//! ## Bodies
//! Upstream bodies are not trusted to be JSON. Each response is read as text and
//! tagged as either parsed JSON or the raw text that failed to parse, so handlers can
//! report exactly what came back.
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{
    auth::AuthToken,
    doctors::{DoctorRecord, parse_roster},
};

pub const LOGIN_PATH: &str = "auth/login";
pub const REGISTER_PATH: &str = "auth/register";
pub const CURRENT_USER_PATH: &str = "auth/me";
pub const DOCTORS_PATH: &str = "Doctors/lookup";
pub const APPOINTMENTS_PATH: &str = "Appointments";

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Invalid upstream URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid path segment: {0}")]
    InvalidSegment(String),

    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Upstream body, parsed or raw.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Json(Value),
    Malformed(String),
}

impl UpstreamBody {
    pub fn parse(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::Json(Value::Null);
        }

        serde_json::from_str(text)
            .map(Self::Json)
            .unwrap_or_else(|_| Self::Malformed(text.to_string()))
    }

    /// The `message` field of a JSON object body.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Json(value) => value.get("message").and_then(Value::as_str),
            Self::Malformed(_) => None,
        }
    }

    /// Body as JSON, with raw text wrapped as `{ "message": text }` for error details.
    pub fn to_details(&self) -> Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::Malformed(text) => serde_json::json!({ "message": text }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn message(&self) -> Option<&str> {
        self.body.message()
    }
}

/// Roster fetch outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Roster {
    Doctors(Vec<DoctorRecord>),
    Rejected(UpstreamResponse),
    Malformed(UpstreamBody),
}

#[derive(Debug, Clone)]
pub struct ClinicApi {
    client: Client,
    base_url: String,
}

impl ClinicApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let parsed = Url::parse(base_url).map_err(|e| RemoteError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "scheme must be http or https".to_string(),
            });
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// URL of one item under `path`. The id is percent-encoded as a single segment, so
    /// `/` and `?` stay inside it; `.` and `..` are refused.
    pub fn item_url(&self, path: &str, id: &str) -> Result<String, RemoteError> {
        if id.is_empty() || id == "." || id == ".." {
            return Err(RemoteError::InvalidSegment(id.to_string()));
        }

        let invalid = |reason: String| RemoteError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };

        let mut url = Url::parse(&self.url(path)).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .push(id);

        Ok(url.into())
    }

    pub async fn login<B: Serialize + ?Sized>(
        &self,
        body: &B,
    ) -> Result<UpstreamResponse, RemoteError> {
        self.send(self.request(Method::POST, LOGIN_PATH, None).json(body))
            .await
    }

    pub async fn register<B: Serialize + ?Sized>(
        &self,
        body: &B,
    ) -> Result<UpstreamResponse, RemoteError> {
        self.send(self.request(Method::POST, REGISTER_PATH, None).json(body))
            .await
    }

    pub async fn current_user(&self, token: &AuthToken) -> Result<UpstreamResponse, RemoteError> {
        self.send(self.request(Method::GET, CURRENT_USER_PATH, Some(token)))
            .await
    }

    pub async fn doctors(&self, token: &AuthToken) -> Result<UpstreamResponse, RemoteError> {
        self.send(self.request(Method::GET, DOCTORS_PATH, Some(token)))
            .await
    }

    /// Fetches the roster and checks it is a list of doctors.
    pub async fn roster(&self, token: &AuthToken) -> Result<Roster, RemoteError> {
        let response = self.doctors(token).await?;

        if !response.is_success() {
            return Ok(Roster::Rejected(response));
        }

        Ok(match response.body {
            UpstreamBody::Json(value) => match parse_roster(value.clone()) {
                Ok(doctors) => Roster::Doctors(doctors),
                Err(e) => {
                    debug!(error = %e, "Roster is not a doctor list");
                    Roster::Malformed(UpstreamBody::Json(value))
                }
            },
            malformed => Roster::Malformed(malformed),
        })
    }

    pub async fn appointments(&self, token: &AuthToken) -> Result<UpstreamResponse, RemoteError> {
        self.send(self.request(Method::GET, APPOINTMENTS_PATH, Some(token)))
            .await
    }

    pub async fn create_appointment<B: Serialize + ?Sized>(
        &self,
        token: &AuthToken,
        body: &B,
    ) -> Result<UpstreamResponse, RemoteError> {
        self.send(
            self.request(Method::POST, APPOINTMENTS_PATH, Some(token))
                .json(body),
        )
        .await
    }

    pub async fn delete_appointment(
        &self,
        token: &AuthToken,
        id: &str,
    ) -> Result<UpstreamResponse, RemoteError> {
        let url = self.item_url(APPOINTMENTS_PATH, id)?;

        self.send(self.request_url(Method::DELETE, url, Some(token)))
            .await
    }

    fn request(&self, method: Method, path: &str, token: Option<&AuthToken>) -> RequestBuilder {
        self.request_url(method, self.url(path), token)
    }

    fn request_url(
        &self,
        method: Method,
        url: String,
        token: Option<&AuthToken>,
    ) -> RequestBuilder {
        debug!(%method, %url, "Calling upstream");

        let request = self.client.request(method, url);
        match token {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<UpstreamResponse, RemoteError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        debug!(%status, bytes = text.len(), "Upstream responded");

        Ok(UpstreamResponse {
            status,
            body: UpstreamBody::parse(&text),
        })
    }
}
