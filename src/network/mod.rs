//! HTTP abstraction layer between the client and the local agent.
//!
//! Everything above this module speaks in [`HttpRequest`] / [`HttpResponse`]
//! pairs; the only production implementation is the `reqwest`-backed
//! [`HttpTransport`]. Tests substitute `MockTransport`.
mod http;
pub use http::*;


use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::ResourceIndex;
use crate::Result;

/// Response header carrying the resource index
pub const INDEX_HEADER: &str = "X-Consul-Index";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
        }
    }
}

/// One request against the agent's `/v1` API.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute path including the `/v1` prefix
    pub path: String,
    /// Query parameters in insertion order; an empty value renders as a bare
    /// flag (`?recurse`)
    pub params: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Overrides the transport's default request timeout
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    fn new(
        method: Method,
        path: impl Into<String>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn flag(
        self,
        key: impl Into<String>,
    ) -> Self {
        self.param(key, "")
    }

    pub fn body(
        mut self,
        body: Vec<u8>,
    ) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Value of the first parameter named `key`
    pub fn param_value(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Raw agent answer; non-2xx statuses are not errors at this layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Parsed [`INDEX_HEADER`], zero when absent or malformed
    pub index: ResourceIndex,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Issues one request and returns whatever the agent answered.
    ///
    /// # Errors
    /// Only connectivity problems fail here: `Error::Transport` for
    /// timeouts, refused connections and malformed addresses.
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse>;
}
