use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server returned {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("{0}")]
    Unavailable(String),
}

/// One GET against the tile endpoint.
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn fetch(&self, query: &[(String, String)]) -> Result<String, TransportError>;
}

pub struct HttpTileSource {
    http: Client,
    endpoint: Url,
}

impl HttpTileSource {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn request_url(&self, query: &[(String, String)]) -> Url {
        let mut url = self.endpoint.clone();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn fetch(&self, query: &[(String, String)]) -> Result<String, TransportError> {
        let url = self.request_url(query);
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })
    }
}
