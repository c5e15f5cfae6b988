use async_trait::async_trait;
use url::Url;

use crate::config::JourneyConfig;
use crate::session::Session;

/// A request-level failure: the step got no usable response at all.
///
/// Distinct from an application-level check failure; the two are tracked as separate metrics.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Other(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// One journey step's request, described independently of any HTTP client.
#[derive(Debug, Clone)]
pub struct StepRequest {
    pub method: Method,
    pub path: String,
    pub headers: &'static [(&'static str, &'static str)],
    pub form: Option<Vec<(&'static str, String)>>,
}

impl StepRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            headers: &[],
            form: None,
        }
    }

    pub fn get_with_headers(
        path: impl Into<String>,
        headers: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            headers,
            form: None,
        }
    }

    pub fn post_form(path: impl Into<String>, form: Vec<(&'static str, String)>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            headers: &[],
            form: Some(form),
        }
    }
}

/// What the journey's checks get to look at.
#[derive(Debug, Clone)]
pub struct StepResponse {
    pub status: u16,
    pub body: String,
}

impl StepResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The seam between the journey script and the wire, so the step sequence and its scoring can
/// be exercised without a network.
#[async_trait]
pub trait JourneyClient: Send + Sync {
    async fn send(&self, request: &StepRequest) -> Result<StepResponse, TransportError>;
}

/// The production client: reqwest over the iteration's own cookie jar, so the session cookie
/// rides along on every step.
pub struct HttpJourneyClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpJourneyClient {
    pub fn new(session: &Session, config: &JourneyConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .cookie_provider(session.cookie_jar())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl JourneyClient for HttpJourneyClient {
    async fn send(&self, request: &StepRequest) -> Result<StepResponse, TransportError> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|e| TransportError::Other(e.to_string()))?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };

        for (name, value) in request.headers {
            builder = builder.header(*name, *value);
        }

        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(StepResponse { status, body })
    }
}
