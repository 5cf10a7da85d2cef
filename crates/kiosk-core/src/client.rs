// Client for the registration server's REST API.
//
// The server of record exposes the whole dataset, two "last changed" pings
// (database and static client files), the check-in call and the ticket
// printer hook. `CheckinApi` is the seam the sync tasks and the registration
// guard depend on, so they can be driven by in-memory fakes in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::protocol::{Participant, PrintJob, RegistrationRequest, Snapshot, VersionStamp};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout and the like.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The participant already has a recent check-in on the server.
    #[error("participant is already registered")]
    Conflict,

    #[error("server returned status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid request url: {0}")]
    Url(String),
}

impl ApiError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict)
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Operations the kiosk core needs from the server of record.
#[async_trait]
pub trait CheckinApi: Send + Sync {
    /// Fetch the complete dataset (no pagination, no deltas).
    async fn fetch_dataset(&self) -> Result<Snapshot, ApiError>;

    /// Opaque change stamp of the participant database.
    async fn data_version(&self) -> Result<String, ApiError>;

    /// Opaque change stamp of the deployed client build.
    async fn assets_version(&self) -> Result<String, ApiError>;

    /// Record a check-in. `Err(ApiError::Conflict)` when already registered.
    async fn register(&self, participant: &Participant) -> Result<(), ApiError>;

    /// Submit a ticket to the printer hook. The response body is ignored.
    async fn print(&self, job: &PrintJob) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// `reqwest`-backed implementation of [`CheckinApi`].
pub struct HttpApi {
    http: reqwest::Client,
    api_root: Url,
    credentials: Option<(String, String)>,
}

impl HttpApi {
    /// Build a client rooted at `base_url`; every endpoint lives under
    /// `{base_url}/api/`. Each request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url).map_err(|e| ApiError::Url(e.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let api_root = base.join("api/").map_err(|e| ApiError::Url(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            http,
            api_root,
            credentials: None,
        })
    }

    /// Attach HTTP basic credentials to every request.
    pub fn with_basic_auth(mut self, login: String, password: String) -> Self {
        self.credentials = Some((login, password));
        self
    }

    /// Build an `HttpApi` from the application config.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let api = HttpApi::new(&config.server.base_url, config.server.request_timeout())?;
        Ok(match (&config.credentials.api_login, &config.credentials.api_password) {
            (Some(login), Some(password)) => api.with_basic_auth(login.clone(), password.clone()),
            _ => api,
        })
    }

    fn endpoint(&self, name: &str) -> Result<Url, ApiError> {
        self.api_root
            .join(name)
            .map_err(|e| ApiError::Url(e.to_string()))
    }

    fn request(&self, method: reqwest::Method, name: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self.endpoint(name)?;
        debug!(%method, %url, "api request");
        let builder = self.http.request(method, url);
        Ok(match &self.credentials {
            Some((login, password)) => builder.basic_auth(login, Some(password)),
            None => builder,
        })
    }

    async fn version(&self, name: &str) -> Result<String, ApiError> {
        let response = self
            .request(reqwest::Method::POST, name)?
            .send()
            .await
            .map_err(ApiError::Transport)?;
        let stamp: VersionStamp = decode(check_status(response)?).await?;
        Ok(stamp.last_changed)
    }
}

#[async_trait]
impl CheckinApi for HttpApi {
    async fn fetch_dataset(&self) -> Result<Snapshot, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "db")?
            .send()
            .await
            .map_err(ApiError::Transport)?;
        decode(check_status(response)?).await
    }

    async fn data_version(&self) -> Result<String, ApiError> {
        self.version("db").await
    }

    async fn assets_version(&self) -> Result<String, ApiError> {
        self.version("files").await
    }

    async fn register(&self, participant: &Participant) -> Result<(), ApiError> {
        let response = self
            .request(reqwest::Method::POST, "check")?
            .json(&RegistrationRequest::from(participant))
            .send()
            .await
            .map_err(ApiError::Transport)?;
        check_status(response).map(|_| ())
    }

    async fn print(&self, job: &PrintJob) -> Result<(), ApiError> {
        let response = self
            .request(reqwest::Method::POST, "print")?
            .json(job)
            .send()
            .await
            .map_err(ApiError::Transport)?;
        check_status(response).map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Map non-success statuses onto [`ApiError`]. The server answers a repeated
/// check-in with 403; 409 is accepted as well.
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    classify_status(response.status())?;
    Ok(response)
}

pub(crate) fn classify_status(status: StatusCode) -> Result<(), ApiError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::FORBIDDEN | StatusCode::CONFLICT => Err(ApiError::Conflict),
        s => Err(ApiError::Status(s.as_u16())),
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(ApiError::Transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
