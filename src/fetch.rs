use crate::config::{HTTP_TIMEOUT_SECS, USER_AGENT};
use crate::error::PipelineError;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Source of raw listing markup. Returns the body or fails; no retries.
pub trait Fetch {
    fn fetch(&self, url: &Url) -> Result<String, PipelineError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<String, PipelineError> {
        let fetch_error = |e: reqwest::Error| PipelineError::Fetch {
            url: url.to_string(),
            source: Box::new(e),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(fetch_error)?
            .error_for_status()
            .map_err(fetch_error)?;

        let body = response.text().map_err(fetch_error)?;
        debug!(url = %url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}
