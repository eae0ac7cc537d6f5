//! Generic request/response fetcher (C1): the single operation every
//! `SourceAdapter` routes its planned requests through. Bounded concurrency
//! via a per-source `Semaphore`, retry with jittered exponential backoff on
//! transport errors/timeouts/5xx/429, and a state machine of `Idle ->
//! AcquiredSlot -> Attempt(i) -> {Success, Backoff(i+1), FinalFailure}`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use rand::Rng;
use reqwest::{Client, Method};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::error::{FetchError, FetchResult};

type IntervalLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 500, max_delay_ms: 30_000, multiplier: 2.0 }
    }
}

impl RetryPolicy {
    /// `delay = min(base * multiplier^attempt, max)` ± 25% jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let raw = self.base_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let capped = raw.min(self.max_delay_ms as f64);
        let mut rng = rand::thread_rng();
        let jitter: f64 = rng.gen_range(-0.25..=0.25);
        let jittered = (capped * (1.0 + jitter)).max(0.0);
        Duration::from_millis(jittered as u64)
    }
}

/// A completed fetch: status, headers (lowercased names), and raw body.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Bounded-concurrency fetcher for one source client instance; the
/// semaphore is sized from the adapter's declared `max_concurrency`.
pub struct Fetcher {
    client: Client,
    semaphore: Arc<Semaphore>,
    retry_policy: RetryPolicy,
    limiter: Option<Arc<IntervalLimiter>>,
}

impl Fetcher {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            client: Client::new(),
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            retry_policy: RetryPolicy::default(),
            limiter: None,
        }
    }

    /// Builds with a request timeout, a retry policy capped at
    /// `max_retries` attempts, and a minimum interval between requests —
    /// for callers that know a source's declared concurrency/retry/
    /// timeout/rate-limit policy up front rather than accepting the
    /// blanket default. `rate_limit_interval_ms` of `0` disables limiting.
    pub fn with_full_policy(
        max_concurrency: usize,
        max_retries: u32,
        timeout_secs: u64,
        rate_limit_interval_ms: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        let limiter = Quota::with_period(Duration::from_millis(rate_limit_interval_ms))
            .map(|quota| Arc::new(RateLimiter::direct(quota)));
        Self {
            client,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            retry_policy: RetryPolicy { max_attempts: max_retries.max(1), ..RetryPolicy::default() },
            limiter,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    #[tracing::instrument(skip(self, headers, body), fields(url = %url))]
    pub async fn fetch(
        &self,
        method: Method,
        url: &str,
        headers: &HashMap<String, String>,
        query: &HashMap<String, String>,
        body: Option<serde_json::Value>,
    ) -> FetchResult<FetchedResponse> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::Cancelled)?;

        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let mut attempt = 0;
        loop {
            let mut request = self.client.request(method.clone(), url);
            for (key, value) in headers {
                request = request.header(key, value);
            }
            if !query.is_empty() {
                request = request.query(&query.iter().collect::<Vec<_>>());
            }
            if let Some(ref json_body) = body {
                request = request.json(json_body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse().ok());
                        if attempt + 1 >= self.retry_policy.max_attempts {
                            return Err(FetchError::RateLimited { retry_after });
                        }
                        let delay = retry_after
                            .map(Duration::from_secs)
                            .unwrap_or_else(|| self.retry_policy.backoff_delay(attempt));
                        warn!(attempt, ?delay, "rate limited, backing off");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    if status.is_server_error() {
                        if attempt + 1 >= self.retry_policy.max_attempts {
                            return Err(FetchError::Transient {
                                attempts: attempt + 1,
                                source: format!("server error {status}").into(),
                            });
                        }
                        let delay = self.retry_policy.backoff_delay(attempt);
                        warn!(attempt, status = %status, ?delay, "server error, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    if !status.is_success() {
                        return Err(FetchError::ClientError { status: status.as_u16() });
                    }

                    let headers: HashMap<String, String> = response
                        .headers()
                        .iter()
                        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                        .collect();
                    let status_code = status.as_u16();
                    let body = response.bytes().await.map_err(|e| FetchError::Transient {
                        attempts: attempt + 1,
                        source: Box::new(e),
                    })?;
                    info!(attempt, status = status_code, "fetch succeeded");
                    return Ok(FetchedResponse { status: status_code, headers, body: body.to_vec() });
                }
                Err(e) if e.is_timeout() => {
                    if attempt + 1 >= self.retry_policy.max_attempts {
                        return Err(FetchError::Timeout { url: url.to_string() });
                    }
                    let delay = self.retry_policy.backoff_delay(attempt);
                    warn!(attempt, ?delay, "timeout, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt + 1 >= self.retry_policy.max_attempts {
                        return Err(FetchError::Transient { attempts: attempt + 1, source: Box::new(e) });
                    }
                    let delay = self.retry_policy.backoff_delay(attempt);
                    warn!(attempt, error = %e, ?delay, "transport error, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delay_is_bounded_by_max() {
        let policy = RetryPolicy { max_attempts: 5, base_delay_ms: 500, max_delay_ms: 2_000, multiplier: 2.0 };
        let delay = policy.backoff_delay(10);
        assert!(delay.as_millis() <= 2_500);
    }

    #[test]
    fn fetcher_builds_with_declared_concurrency() {
        let fetcher = Fetcher::new(4);
        assert_eq!(fetcher.semaphore.available_permits(), 4);
    }
}
