use std::time::Duration;

use exponential_backoff::Backoff;
use reqwest::Method;
use shared::ApiError;
use tracing::{debug, warn};

/// Retry policy for a [`RetryingClient`]. Mirrors the defaults used
/// throughout the original service's external integrations: a handful of
/// attempts with a doubling backoff, never retrying a client error.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 4,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            factor: 2,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> Backoff {
        let mut backoff = Backoff::new(self.attempts, self.min_delay, Some(self.max_delay));
        backoff.set_factor(self.factor);
        backoff
    }
}

/// A thin, uniform wrapper around [`reqwest::Client`] shared by every
/// external-service client: fixed base URL, optional basic-auth, default
/// headers, a per-request timeout, and the retry/backoff policy described
/// above. Individual service clients (DOI, persistent-id, catalog, access
/// management, ingestion admin) build their endpoint-specific calls on top
/// of [`RetryingClient::execute`].
#[derive(Clone)]
pub struct RetryingClient {
    http: reqwest::Client,
    base_url: String,
    basic_auth: Option<(String, String)>,
    retry: RetryPolicy,
}

impl RetryingClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(RetryingClient {
            http,
            base_url: base_url.into(),
            basic_auth: None,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues `method path` with a JSON `body` (when present), retrying on
    /// connection failures and 5xx responses per [`RetryPolicy`]. 4xx
    /// responses are never retried and are surfaced as
    /// [`ApiError::ExternalClientError`] immediately.
    pub async fn execute<B: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut backoff = self.retry.backoff();

        let mut last_err = None;
        for attempt in 0..self.retry.attempts {
            if attempt > 0 {
                debug!(attempt, url, "retrying external request");
            }

            let mut request = self.http.request(method.clone(), &url);
            if let Some((user, pass)) = &self.basic_auth {
                request = request.basic_auth(user, Some(pass));
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status.is_client_error() {
                        let detail = response.text().await.unwrap_or_default();
                        return Err(ApiError::ExternalClientError(format!(
                            "{url} responded {status}: {detail}"
                        )));
                    }
                    // 5xx: fall through to retry, remembering the failure.
                    let detail = response.text().await.unwrap_or_default();
                    last_err = Some(ApiError::ExternalServerError(format!(
                        "{url} responded {status}: {detail}"
                    )));
                }
                Err(e) if e.is_timeout() => {
                    last_err = Some(ApiError::ExternalTimeout(url.clone()));
                }
                Err(e) => {
                    last_err = Some(ApiError::ExternalServerError(format!("{url}: {e}")));
                }
            }

            match backoff.next(attempt + 1) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => break,
            }
        }

        let err = last_err.unwrap_or_else(|| {
            ApiError::ExternalServerError("external request exhausted retries with no recorded error".to_string())
        });
        warn!(url, "external request failed after retries");
        Err(err)
    }

    pub async fn get(&self, path: &str) -> Result<reqwest::Response, ApiError> {
        self.execute::<()>(Method::GET, path, None).await
    }

    pub async fn post<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, ApiError> {
        self.execute(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, ApiError> {
        self.execute(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, ApiError> {
        self.execute(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<reqwest::Response, ApiError> {
        self.execute::<()>(Method::DELETE, path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_the_documented_envelope() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 4);
        assert_eq!(policy.min_delay, Duration::from_millis(500));
        assert_eq!(policy.factor, 2);
    }

    #[test]
    fn backoff_delays_double_each_attempt_until_the_cap() {
        let policy = RetryPolicy::default();
        let mut backoff = policy.backoff();
        let first = backoff.next(1).unwrap();
        let second = backoff.next(2).unwrap();
        assert_eq!(first, Duration::from_millis(500));
        assert_eq!(second, Duration::from_secs(1));
    }
}
