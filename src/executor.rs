//! HTTP executor boundary
//!
//! The dispatcher never talks to the network directly; it hands a fully built
//! [`HttpRequest`] to an [`HttpExecutor`] and gets back an [`HttpResponse`] or a
//! transport error. Production use goes through [`ReqwestExecutor`]; tests plug
//! in scripted executors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::Error;

/// Time to establish the TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Overall time for one request/response exchange
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// One part of a multipart form body
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    /// Plain text field
    Field {
        /// Field name
        name: String,
        /// Field value
        value: String,
    },
    /// Binary file field
    File {
        /// Field name
        name: String,
        /// File name reported to the server
        filename: String,
        /// Raw payload bytes
        bytes: Vec<u8>,
    },
}

/// Request body, encoding already decided by the option set's shape
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// URL-encoded key/value pairs
    Form(Vec<(String, String)>),
    /// Multipart form data (present whenever a binary argument exists)
    Multipart(Vec<FormPart>),
}

/// A fully built outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Absolute request URL
    pub url: String,
    /// Headers to attach, in insertion order
    pub headers: Vec<(String, String)>,
    /// Encoded body
    pub body: RequestBody,
}

/// The raw outcome of one HTTP exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed `Retry-After` header, when the server sent one
    pub retry_after: Option<Duration>,
    /// Response body as text
    pub body: String,
}

/// Performs one HTTP exchange. Connection pooling, TLS, and proxying live here.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Execute the request, returning the response or a transport error.
    ///
    /// Implementations must not retry internally; the dispatcher owns the retry
    /// loop.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}

/// Default executor backed by a shared `reqwest::Client`
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    /// Build an executor with explicit connect/request timeouts so a hung
    /// server surfaces as a transport failure instead of an indefinite stall.
    pub fn new() -> Result<Self, Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an already-configured client (custom TLS, proxy, timeouts).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let mut builder = self.client.post(&request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match request.body {
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Multipart(parts) => {
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    form = match part {
                        FormPart::Field { name, value } => form.text(name, value),
                        FormPart::File {
                            name,
                            filename,
                            bytes,
                        } => form.part(
                            name,
                            reqwest::multipart::Part::bytes(bytes).file_name(filename),
                        ),
                    };
                }
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        debug!(status, ?retry_after, url = %request.url, "HTTP exchange complete");

        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("failed to read response body: {e}")))?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// Parse the `Retry-After` header as a whole number of seconds.
///
/// HTTP-date forms are ignored; the platform only sends the seconds form.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
