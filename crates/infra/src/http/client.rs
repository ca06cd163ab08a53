use std::time::Duration;

use careline_domain::CarelineError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

/// HTTP client with timeout support and retries for idempotent requests.
///
/// Non-idempotent methods (`POST`, `PATCH`) are sent exactly once.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, CarelineError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send a request. Idempotent methods (`GET`, `DELETE`, ...) are retried on
    /// 5xx responses and transport failures with exponential backoff; every
    /// other method gets a single attempt.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, CarelineError> {
        let request = builder.build().map_err(map_http_error)?;
        let attempts = if request.method().is_idempotent() { self.max_attempts } else { 1 };
        let method = request.method().clone();
        let url = request.url().clone();

        let mut pending = Some(request);
        for attempt in 1..=attempts {
            let last = attempt == attempts;
            // Keep the original for the next round while a clone goes out.
            let outgoing = match pending.as_ref().and_then(reqwest::Request::try_clone) {
                Some(copy) if !last => copy,
                _ => match pending.take() {
                    Some(original) => original,
                    None => break,
                },
            };

            let can_retry = !last && pending.is_some();
            debug!(attempt, %method, %url, "sending HTTP request");
            match self.client.execute(outgoing).await {
                Ok(response) if response.status().is_server_error() && can_retry => {
                    let status = response.status();
                    debug!(attempt, %method, %url, %status, "server error; retrying");
                }
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt, %method, %url, %status, "received HTTP response");
                    return Ok(response);
                }
                Err(err) if is_transient(&err) && can_retry => {
                    debug!(attempt, %method, %url, error = %err, "transport error; retrying");
                }
                Err(err) => return Err(map_http_error(err)),
            }

            self.pause(attempt).await;
        }

        Err(CarelineError::Internal(format!("{method} {url}: no attempt was made")))
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`,
    /// doubling at most eight times.
    fn backoff(&self, retry: usize) -> Duration {
        let doublings = retry.saturating_sub(1).min(8) as u32;
        self.base_backoff.saturating_mul(1 << doublings)
    }

    async fn pause(&self, retry: usize) {
        let delay = self.backoff(retry);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, CarelineError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(map_http_error)?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

pub(crate) fn map_http_error(err: reqwest::Error) -> CarelineError {
    let infra: InfraError = err.into();
    CarelineError::from(infra)
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
