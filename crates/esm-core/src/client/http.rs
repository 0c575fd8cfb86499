//! HTTP cluster client over the Elasticsearch REST API

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{BasicAuth, ClientConfig, ClientFactory, ClusterClient, ClusterInfo};
use crate::error::ClientError;

/// Delay before the first retry; doubled on each subsequent attempt
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Client for a single cluster node
#[derive(Debug)]
pub struct HttpClusterClient {
    http: reqwest::Client,
    node: String,
    auth: Option<BasicAuth>,
    ping_timeout: Duration,
    max_retries: u32,
}

impl HttpClusterClient {
    /// Build a client from a config
    ///
    /// # Errors
    /// Returns an error if the node URL is invalid or the HTTP client cannot be built
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let url = Url::parse(&config.node)
            .map_err(|e| ClientError::InvalidConfig(format!("{}: {e}", config.node)))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ClientError::InvalidConfig(format!(
                "{}: missing host",
                config.node
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.settings.request_timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http,
            node: config.node.trim_end_matches('/').to_string(),
            auth: config.auth.clone(),
            ping_timeout: config.settings.ping_timeout,
            max_retries: config.settings.max_retries,
        })
    }

    /// Send a request, retrying transport failures up to `max_retries` times.
    /// Non-success statuses are returned as [`ClientError::Status`] without retry.
    async fn send(
        &self,
        method: Method,
        path: &str,
        timeout: Option<Duration>,
    ) -> Result<Response, ClientError> {
        let url = format!("{}{path}", self.node);
        let mut attempt = 0;

        loop {
            let mut request = self.http.request(method.clone(), &url);
            if let Some(auth) = &self.auth {
                request = request.basic_auth(&auth.username, Some(&auth.password));
            }
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(ClientError::Status { status, body });
                }
                Err(err) if attempt < self.max_retries && is_retryable(&err) => {
                    attempt += 1;
                    tracing::debug!(
                        node = %self.node,
                        path,
                        attempt,
                        error = %err,
                        "retrying cluster request"
                    );
                    tokio::time::sleep(RETRY_BASE_DELAY * 2u32.pow((attempt - 1).min(5))).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(Method::GET, path, None).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

#[async_trait]
impl ClusterClient for HttpClusterClient {
    async fn ping(&self) -> Result<(), ClientError> {
        self.send(Method::HEAD, "/", Some(self.ping_timeout))
            .await
            .map(|_| ())
    }

    async fn health(&self) -> Result<Value, ClientError> {
        self.get_json("/_cluster/health").await
    }

    async fn info(&self) -> Result<ClusterInfo, ClientError> {
        self.get_json("/").await
    }

    async fn close(&self) -> Result<(), ClientError> {
        // reqwest releases pooled connections when the last handle drops
        Ok(())
    }
}

/// Factory producing [`HttpClusterClient`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn create(&self, config: &ClientConfig) -> Result<Arc<dyn ClusterClient>, ClientError> {
        Ok(Arc::new(HttpClusterClient::new(config)?))
    }
}
