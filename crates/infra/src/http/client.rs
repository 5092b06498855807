use std::time::Duration;

use batchwire_domain::constants::{DEFAULT_BASE_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS, USER_AGENT};
use batchwire_domain::{BatchwireError, HttpConfig};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::errors::InfraError;

/// HTTP client with timeout support and retry of undelivered requests.
///
/// Only connect failures are retried, with exponential backoff until
/// `max_attempts` is used up: the request never reached the server, so
/// sending it again cannot run it twice. Responses of any status, timeouts
/// and failures after the connection was made are handed back after a
/// single send.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Build a client from the `[http]` configuration section.
    pub fn from_config(config: &HttpConfig) -> Result<Self, BatchwireError> {
        Self::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts)
            .base_backoff(Duration::from_millis(config.base_backoff_ms))
            .build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the request, retrying only while the connection cannot be made.
    ///
    /// The body must be buffered (not streamed) so it can be resent.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, BatchwireError> {
        let mut attempt = 1;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    BatchwireError::Internal("streaming request bodies cannot be retried".into())
                })?
                .build()
                .map_err(|err| BatchwireError::from(InfraError::from(err)))?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt, %method, %url, "sending HTTP request");

            let err = match self.client.execute(request).await {
                Ok(response) => {
                    debug!(attempt, %url, status = %response.status(), "received HTTP response");
                    return Ok(response);
                }
                Err(err) if attempt < self.max_attempts && is_undelivered(&err) => err,
                Err(err) => return Err(InfraError::from(err).into()),
            };

            let delay = self.backoff_delay(attempt);
            warn!(attempt, %url, error = %err, ?delay, "connection failed, retrying HTTP request");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    /// Delay before retry number `attempt` (1-based): base, 2×base, 4×base…
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(8) as u32;
        self.base_backoff.saturating_mul(1u32 << shift)
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
            user_agent: USER_AGENT.to_string(),
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
        self.user_agent = agent.into();
        self
    }

    pub fn build(self) -> Result<HttpClient, BatchwireError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .no_proxy()
            .build()
            .map_err(|err| BatchwireError::from(InfraError::from(err)))?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

/// True when the request failed before any byte reached the server.
fn is_undelivered(err: &reqwest::Error) -> bool {
    err.is_connect()
}
