//! HTTP transport seam.
//!
//! The dispatcher talks to the wire through the [`Transport`] trait so tests
//! can substitute scripted or in-memory implementations. [`UreqTransport`] is
//! the production implementation; every ureq call in the crate lives here.
//!
//! A transport returns `Ok` for *any* HTTP status. Only transport-level
//! failures (connection refused, timeout, DNS) become errors, which is what
//! the dispatcher's failover policy keys on.

use crate::error::{HdfsError, Result};
use serde::de::DeserializeOwned;
use std::fmt;
use std::io::Read;
use std::time::Duration;
use ureq::Agent;

/// HTTP method for an API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// One fully-built API request.
#[derive(Debug)]
pub struct ApiRequest<'a> {
    pub method: Method,
    /// Base URL of the endpoint serving this request, for error attribution.
    pub endpoint: &'a str,
    /// Complete request URL (endpoint + path + encoded query string).
    pub url: String,
    /// Request body, if any. Bodies are bounded in-memory buffers so a
    /// failed-over request can be re-sent verbatim.
    pub body: Option<&'a [u8]>,
}

/// A raw response: status code plus the (possibly streamed) body.
pub struct RawResponse {
    pub status: u16,
    pub body: Box<dyn Read>,
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl RawResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the whole body into memory.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.body.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Deserialize the body as JSON.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_reader(self.body)?)
    }
}

/// Sends one request and returns the raw outcome.
pub trait Transport: Send + Sync {
    fn issue(&self, req: ApiRequest<'_>) -> Result<RawResponse>;
}

/// Production transport over a blocking ureq agent.
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// Build a transport with the given connect and response-read timeouts.
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(connect_timeout))
            .timeout_recv_response(Some(read_timeout))
            .build();
        Self {
            agent: Agent::new_with_config(config),
        }
    }
}

impl Transport for UreqTransport {
    fn issue(&self, req: ApiRequest<'_>) -> Result<RawResponse> {
        let result = match req.method {
            Method::Get => self.agent.get(&req.url).call(),
            Method::Delete => self.agent.delete(&req.url).call(),
            Method::Put => match req.body {
                Some(data) => self.agent.put(&req.url).send(data),
                None => self.agent.put(&req.url).send_empty(),
            },
            Method::Post => match req.body {
                Some(data) => self.agent.post(&req.url).send(data),
                None => self.agent.post(&req.url).send_empty(),
            },
        };

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.into_body().into_reader();
                Ok(RawResponse {
                    status,
                    body: Box::new(body),
                })
            }
            Err(e) => Err(HdfsError::connection(req.endpoint, e.to_string())),
        }
    }
}
