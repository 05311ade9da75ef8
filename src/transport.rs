//! HTTP transport to the conversion service
//!
//! The client talks to the service only through the [`Transport`] trait so
//! the search and download flows can run against a scripted transport in
//! tests. [`HttpTransport`] is the `reqwest` implementation.

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::types::FormatSelection;
use async_trait::async_trait;
use url::Url;

/// A request to one of the service's endpoints
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiRequest {
    /// `GET /formats`
    Formats,
    /// `GET /search?query=…`
    Search {
        /// Trimmed query text
        query: String,
    },
    /// `GET /download?url=…&format=…&bitrate=…&method=…`
    Download {
        /// Source page URL (the download key)
        url: String,
        /// Output selection at the time the download started
        selection: FormatSelection,
    },
}

impl ApiRequest {
    /// Endpoint path relative to the service base URL
    pub fn path(&self) -> &'static str {
        match self {
            ApiRequest::Formats => "formats",
            ApiRequest::Search { .. } => "search",
            ApiRequest::Download { .. } => "download",
        }
    }

    /// Query parameters, unencoded
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            ApiRequest::Formats => Vec::new(),
            ApiRequest::Search { query } => vec![("query", query.clone())],
            ApiRequest::Download { url, selection } => vec![
                ("url", url.clone()),
                ("format", selection.format.to_string()),
                ("bitrate", selection.bitrate.to_string()),
                ("method", selection.method.to_string()),
            ],
        }
    }
}

/// A fully received response
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw `Content-Disposition` header, if present
    pub content_disposition: Option<String>,
    /// Response body
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the conversion service
///
/// Implementations return `Ok` for every response that arrived, whatever
/// its status, and `Err(Error::Transport)` when no response arrived.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and wait for the complete response
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// [`Transport`] over HTTP using `reqwest`
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport for the configured service
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let base_url = config.parsed_base_url()?;

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| Error::Config {
            message: format!("failed to build HTTP client: {e}"),
            key: None,
        })?;

        Ok(Self { client, base_url })
    }

    /// Service root all endpoint paths are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, request: &ApiRequest) -> Result<Url> {
        self.base_url
            .join(request.path())
            .map_err(|e| Error::Config {
                message: format!("invalid endpoint URL: {e}"),
                key: Some("server.base_url".to_string()),
            })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.endpoint(request)?;
        tracing::debug!(url = %url, "sending request");

        let response = self
            .client
            .get(url)
            .query(&request.query_pairs())
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_disposition = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?.to_vec();

        tracing::debug!(status, bytes = body.len(), "response received");
        Ok(ApiResponse {
            status,
            content_disposition,
            body,
        })
    }
}
