use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Url;
use tracing::debug;
use tracing::warn;

use super::HttpRequest;
use super::HttpResponse;
use super::Method;
use super::Transport;
use super::INDEX_HEADER;
use crate::net::address_str;
use crate::AgentConfig;
use crate::ResourceIndex;
use crate::Result;
use crate::TransportError;

/// `reqwest`-backed transport with one pooled client per agent.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let address = address_str(&config.address);
        let base_url = Url::parse(&address).map_err(|e| TransportError::InvalidAddress(format!("{address}: {e}")))?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .tcp_keepalive(config.tcp_keepalive())
            .build()
            .map_err(|e| TransportError::Connect(format!("failed to build HTTP client: {e}")))?;

        debug!(%base_url, "created agent transport");

        Ok(Self {
            client,
            base_url,
            request_timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(
        &self,
        request: &HttpRequest,
    ) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&request.path)
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {e}", request.path)))?;

        if !request.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.params {
                if value.is_empty() {
                    pairs.append_key_only(key);
                } else {
                    pairs.append_pair(key, value);
                }
            }
        }
        Ok(url)
    }

    fn map_error(
        &self,
        request: &HttpRequest,
        timeout: Duration,
        e: reqwest::Error,
    ) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                path: request.path.clone(),
                duration: timeout,
            }
        } else if e.is_connect() {
            TransportError::Connect(format!("{}: {e}", self.base_url))
        } else {
            TransportError::Request {
                method: request.method.as_str(),
                path: request.path.clone(),
                source: Box::new(e),
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse> {
        let url = self.url_for(&request)?;
        let timeout = request.timeout.unwrap_or(self.request_timeout);

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Put => self.client.put(url),
        }
        .timeout(timeout);
        if let Some(body) = request.body.clone() {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(method = request.method.as_str(), path = %request.path, "agent request failed: {e}");
            self.map_error(&request, timeout, e)
        })?;

        let status = response.status().as_u16();
        let index = ResourceIndex::from_header(
            response
                .headers()
                .get(INDEX_HEADER)
                .and_then(|value| value.to_str().ok()),
        );
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_error(&request, timeout, e))?
            .to_vec();

        debug!(
            method = request.method.as_str(),
            path = %request.path,
            status,
            %index,
            "agent responded"
        );

        Ok(HttpResponse { status, body, index })
    }
}
