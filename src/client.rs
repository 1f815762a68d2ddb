//! Request dispatcher
//!
//! Orchestrates one logical API call: builds the request, admits it through the
//! concurrency queue, performs the exchange, interprets the response, emits
//! rate-limit events, and drives the retry loop. Retries re-enter the queue
//! from scratch; a ticket is never held across a backoff delay.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::executor::{HttpExecutor, HttpRequest, HttpResponse, ReqwestExecutor};
use crate::options::{ArgValue, CallOptions};
use crate::queue::{ConcurrencyQueue, DEFAULT_MAX_CONCURRENCY};
use crate::response::CallResult;
use crate::retry::{Failure, RetryConfig};

/// Production API endpoint root
pub const DEFAULT_BASE_URL: &str = "https://slack.com/api/";

/// Wait applied when a throttling response carries no server-suggested delay
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Default safety cap on pages fetched per pagination run. Guards against a
/// server bug repeating the same cursor forever; legitimate runs never get
/// near it.
pub const DEFAULT_MAX_PAGINATION_PAGES: usize = 10_000;

type RateLimitedListener = Box<dyn Fn(Duration) + Send + Sync>;

struct Inner {
    base_url: String,
    token: Option<String>,
    headers: Vec<(String, String)>,
    queue: ConcurrencyQueue,
    retry: RetryConfig,
    reject_rate_limited_calls: bool,
    max_pagination_pages: usize,
    executor: Arc<dyn HttpExecutor>,
    listeners: Mutex<Vec<RateLimitedListener>>,
}

/// Async client for the platform's Web API
#[derive(Clone)]
pub struct WebClient {
    inner: Arc<Inner>,
}

/// Builder for [`WebClient`]
pub struct WebClientBuilder {
    base_url: String,
    token: Option<String>,
    headers: Vec<(String, String)>,
    max_request_concurrency: usize,
    retry: RetryConfig,
    reject_rate_limited_calls: bool,
    max_pagination_pages: usize,
    executor: Option<Arc<dyn HttpExecutor>>,
}

impl Default for WebClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            headers: Vec::new(),
            max_request_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry: RetryConfig::default(),
            reject_rate_limited_calls: false,
            max_pagination_pages: DEFAULT_MAX_PAGINATION_PAGES,
            executor: None,
        }
    }
}

impl WebClientBuilder {
    /// Start from defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the API endpoint root (trailing slash added if missing)
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Bearer credential attached to every request unless a call supplies its own
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Add a fixed header merged into every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Cap on concurrently in-flight requests (must be at least 1)
    pub fn max_request_concurrency(mut self, max: usize) -> Self {
        self.max_request_concurrency = max;
        self
    }

    /// Retry policy parameters
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fail rate-limited calls immediately instead of waiting and retrying
    pub fn reject_rate_limited_calls(mut self, reject: bool) -> Self {
        self.reject_rate_limited_calls = reject;
        self
    }

    /// Safety cap on pages fetched per pagination run
    pub fn max_pagination_pages(mut self, max: usize) -> Self {
        self.max_pagination_pages = max;
        self
    }

    /// Replace the HTTP executor (custom transport, TLS setup, or a test double)
    pub fn executor(mut self, executor: Arc<dyn HttpExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Validate the configuration and build the client
    pub fn build(self) -> Result<WebClient> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url cannot be empty".to_string()));
        }
        if self.max_request_concurrency == 0 {
            return Err(Error::Config(
                "max_request_concurrency must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config(
                "retry max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_pagination_pages == 0 {
            return Err(Error::Config(
                "max_pagination_pages must be at least 1".to_string(),
            ));
        }

        let executor = match self.executor {
            Some(executor) => executor,
            None => Arc::new(ReqwestExecutor::new()?),
        };

        let mut base_url = self.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(WebClient {
            inner: Arc::new(Inner {
                base_url,
                token: self.token,
                headers: self.headers,
                queue: ConcurrencyQueue::new(self.max_request_concurrency),
                retry: self.retry,
                reject_rate_limited_calls: self.reject_rate_limited_calls,
                max_pagination_pages: self.max_pagination_pages,
                executor,
                listeners: Mutex::new(Vec::new()),
            }),
        })
    }
}

/// Either a terminal resolution or a retryable failure, one per attempt
enum Attempt {
    Resolved(CallResult),
    Failed { failure: Failure, terminal: Error },
}

impl WebClient {
    /// Build a client with default settings and the given bearer token
    pub fn new(token: impl Into<String>) -> Result<Self> {
        WebClientBuilder::new().token(token).build()
    }

    /// Start a builder
    pub fn builder() -> WebClientBuilder {
        WebClientBuilder::new()
    }

    /// Safety cap on pages per pagination run
    pub(crate) fn max_pagination_pages(&self) -> usize {
        self.inner.max_pagination_pages
    }

    /// Register a callback invoked whenever a response signals throttling,
    /// with the server-suggested wait. Callbacks fire in registration order,
    /// before the triggering call resolves, whether or not it is retried.
    pub fn on_rate_limited(&self, listener: impl Fn(Duration) + Send + Sync + 'static) {
        self.inner
            .listeners
            .lock()
            .expect("rate_limited listener registry poisoned")
            .push(Box::new(listener));
    }

    /// Call a Web API method.
    ///
    /// Resolves with the parsed body for any completed exchange inside the
    /// platform envelope, including `ok: false` semantic failures. Transport
    /// failures, unrecoverable HTTP statuses, and exhausted retries surface as
    /// errors.
    pub async fn api_call(&self, method: &str, options: CallOptions) -> Result<CallResult> {
        if method.trim().is_empty() {
            return Err(Error::Config("method name cannot be empty".to_string()));
        }

        let request = self.build_request(method, &options);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(method, attempt, "dispatching API call");

            let ticket = self.inner.queue.admit().await;
            let outcome = self.inner.executor.execute(request.clone()).await;
            // Release the slot before any backoff; retries re-enter the queue.
            drop(ticket);

            let attempt_result = match outcome {
                Ok(response) => self.interpret(response)?,
                Err(Error::Transport(message)) => Attempt::Failed {
                    failure: Failure::Transport(message.clone()),
                    terminal: Error::Transport(message),
                },
                Err(other) => return Err(other),
            };

            match attempt_result {
                Attempt::Resolved(result) => {
                    debug!(method, attempt, ok = result.ok, "API call resolved");
                    return Ok(result);
                }
                Attempt::Failed { failure, terminal } => {
                    match self.inner.retry.next_delay(attempt, &failure) {
                        Some(delay) => {
                            warn!(
                                method,
                                attempt,
                                max_attempts = self.inner.retry.max_attempts,
                                ?delay,
                                ?failure,
                                "API call failed, retrying after backoff"
                            );
                            sleep(delay).await;
                        }
                        None => {
                            warn!(method, attempt, "API call failed, retries exhausted");
                            return Err(terminal);
                        }
                    }
                }
            }
        }
    }

    /// Interpret one HTTP exchange into a resolution or a classified failure.
    ///
    /// Emits the `rate_limited` event exactly once per throttling response,
    /// before the response can influence the call's outcome.
    fn interpret(&self, response: HttpResponse) -> Result<Attempt> {
        if response.status == 429 {
            let wait = response.retry_after.unwrap_or(DEFAULT_RATE_LIMIT_WAIT);
            return self.rate_limited(wait);
        }

        if (500..=599).contains(&response.status) {
            return Ok(Attempt::Failed {
                failure: Failure::ServerError(response.status),
                terminal: Error::Http {
                    status: response.status,
                    body: response.body,
                },
            });
        }

        if !(200..=299).contains(&response.status) {
            // Client errors outside the platform envelope are not retryable.
            return Err(Error::Http {
                status: response.status,
                body: response.body,
            });
        }

        let result = CallResult::from_json(&response.body)
            .map_err(|e| Error::Parse(format!("invalid platform envelope: {e}")))?;

        if result.is_rate_limited() {
            let wait = result
                .retry_after_seconds()
                .map(Duration::from_secs)
                .or(response.retry_after)
                .unwrap_or(DEFAULT_RATE_LIMIT_WAIT);
            return self.rate_limited(wait);
        }

        Ok(Attempt::Resolved(result))
    }

    /// Shared handling for both throttling signals (HTTP 429 and API-level)
    fn rate_limited(&self, wait: Duration) -> Result<Attempt> {
        self.emit_rate_limited(wait);
        if self.inner.reject_rate_limited_calls {
            return Err(Error::RateLimited { retry_after: wait });
        }
        Ok(Attempt::Failed {
            failure: Failure::RateLimited { retry_after: wait },
            terminal: Error::RateLimited { retry_after: wait },
        })
    }

    fn emit_rate_limited(&self, wait: Duration) {
        let listeners = self
            .inner
            .listeners
            .lock()
            .expect("rate_limited listener registry poisoned");
        for listener in listeners.iter() {
            listener(wait);
        }
    }

    fn build_request(&self, method: &str, options: &CallOptions) -> HttpRequest {
        let url = format!("{}{}", self.inner.base_url, method.trim());

        // A per-call token argument overrides the client-level credential.
        let bearer = match options.get("token") {
            Some(ArgValue::Text(token)) => Some(token.as_str()),
            _ => self.inner.token.as_deref(),
        };

        let mut headers = Vec::with_capacity(self.inner.headers.len() + 1);
        headers.extend(self.inner.headers.iter().cloned());
        if let Some(token) = bearer {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        HttpRequest {
            url,
            headers,
            body: options.encode(),
        }
    }
}
