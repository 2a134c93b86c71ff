//! Render API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::RequestBuilder;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{CreatedService, Deploy, NewStaticSite, Service, ServiceListItem};

const DEFAULT_BASE_URL: &str = "https://api.render.com/v1";

/// Characters left unescaped in a service id path segment.
const ID_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-');

/// Errors from the Render client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid API key")]
    InvalidKey,
}

/// Render API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Creates a new client with the given API key and per-request timeout.
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| Error::InvalidKey)?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Sets a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sends a request and returns the body of a 2xx response.
    async fn execute(&self, req: RequestBuilder) -> Result<Vec<u8>, Error> {
        let resp = req.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    /// Finds the service whose name is exactly `name`.
    ///
    /// Render's name filter is not guaranteed to be an exact match, so the
    /// listing is filtered again client-side.
    pub async fn find_service_by_name(&self, name: &str) -> Result<Option<Service>, Error> {
        let req = self
            .http
            .get(format!("{}/services", self.base_url))
            .query(&[("name", name), ("limit", "1")]);
        let body = self.execute(req).await?;
        let items: Vec<ServiceListItem> = serde_json::from_slice(&body)?;

        Ok(items
            .into_iter()
            .map(|item| item.service)
            .find(|svc| svc.name == name))
    }

    /// Creates a static site service.
    pub async fn create_static_site(&self, site: &NewStaticSite) -> Result<Service, Error> {
        let req = self
            .http
            .post(format!("{}/services", self.base_url))
            .json(site);
        let body = self.execute(req).await?;
        let created: CreatedService = serde_json::from_slice(&body)?;
        Ok(created.into_service())
    }

    /// Triggers a new deploy of a service.
    ///
    /// Returns as soon as Render accepts the trigger; the build itself runs
    /// asynchronously. The deploy record is returned when the body has one.
    pub async fn trigger_deploy(&self, service_id: &str) -> Result<Option<Deploy>, Error> {
        let id = utf8_percent_encode(service_id, ID_SEGMENT);
        let req = self
            .http
            .post(format!("{}/services/{id}/deploys", self.base_url))
            .json(&serde_json::json!({}));
        let body = self.execute(req).await?;

        let deploy = serde_json::from_slice::<Deploy>(&body).ok();
        if let Some(ref d) = deploy {
            debug!(service_id, deploy_id = %d.id, status = %d.status, "deploy triggered");
        }
        Ok(deploy)
    }
}
