use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use ureq::Agent;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw HTTP exchange result:
/// - HTTP status code
/// - full body, read regardless of the status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Network level failure. HTTP error statuses are *not* transport errors:
/// they come back as a [`TransportResponse`] so the caller can read the body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP error when sending request to {url}: {message}")]
    Request { url: String, message: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
}

/// Blocking request/response exchange with the device.
///
/// Timeouts and socket-level retries are the implementation's business.
pub trait Transport: Send + Sync {
    /// POST a SOAP envelope.
    ///
    /// - `url`: full control URL, e.g. "http://192.168.178.1:49000/upnp/control/deviceinfo"
    /// - `body`: the envelope
    /// - `soap_action`: "urn:service#Action", sent quoted in the SOAPAction header
    fn send(
        &self,
        url: &str,
        body: &str,
        soap_action: &str,
    ) -> Result<TransportResponse, TransportError>;

    /// GET a plain resource (the device description document).
    fn fetch(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        // 4xx/5xx must not become Error::StatusCode: the body of a
        // 401/500 carries the challenge or the SOAP fault.
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();

        Self {
            agent: config.into(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn send(
        &self,
        url: &str,
        body: &str,
        soap_action: &str,
    ) -> Result<TransportResponse, TransportError> {
        debug!(url = %url, soap_action = %soap_action, "POST SOAP request");

        let mut response = self
            .agent
            .post(url)
            .header("Content-Type", r#"text/xml; charset="utf-8""#)
            .header("SOAPAction", &format!(r#""{soap_action}""#))
            .send(body)
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::Body {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(TransportResponse { status, body })
    }

    fn fetch(&self, url: &str) -> Result<TransportResponse, TransportError> {
        debug!(url = %url, "GET");

        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::Body {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(TransportResponse { status, body })
    }
}
