use crate::errors::AppError;
use reqwest::{Client, Request, Response, StatusCode};
use std::time::Duration;

/// Bounded exponential-backoff retry policy for a single outbound call.
///
/// Backoff is purely deterministic: `min(max_delay, base_delay * 2^attempt)`
/// with no jitter. Attempt counting is local to one call and shared with
/// nothing else in flight.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based: the first wait doubles
    /// the base delay, matching the store's published backoff guidance).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(31))
            .min(self.max_delay)
    }
}

/// True for failure classes expected to resolve on retry: rate limiting and
/// server-side errors. Other 4xx statuses indicate a caller bug and must
/// fail fast.
pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// HTTP client that retries transient upstream failures with exponential
/// backoff.
///
/// `execute` never errors on HTTP-level failure: once attempts are exhausted
/// (or a non-retryable status arrives) the response is returned as-is and
/// the caller inspects the status. Only network-level faults (connection
/// errors, timeouts) surface as `Err`.
#[derive(Clone)]
pub struct RetryingClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new() -> Result<Self, AppError> {
        Self::with_policy(RetryPolicy::default())
    }

    pub fn with_policy(policy: RetryPolicy) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, policy })
    }

    /// Underlying `reqwest::Client`, for building requests.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Executes `request`, retrying on 429/5xx up to the policy's attempt
    /// ceiling. The request body must be cloneable (all our bodies are
    /// in-memory JSON).
    pub async fn execute(&self, request: Request) -> Result<Response, AppError> {
        let mut attempt: u32 = 0;
        loop {
            let this_try = request.try_clone().ok_or_else(|| {
                AppError::Internal("request body is not cloneable for retry".to_string())
            })?;
            let response = self.client.execute(this_try).await?;

            if !is_retryable(response.status()) {
                return Ok(response);
            }

            attempt += 1;
            if attempt >= self.policy.max_attempts {
                tracing::warn!(
                    "Retry budget exhausted after {} attempts: {} from {}",
                    attempt,
                    response.status(),
                    request.url()
                );
                return Ok(response);
            }

            let delay = self.policy.backoff_delay(attempt);
            tracing::warn!(
                "Transient failure ({}) from {}, retrying in {:?} (attempt {}/{})",
                response.status(),
                request.url(),
                delay,
                attempt,
                self.policy.max_attempts
            );
            tokio::time::sleep(delay).await;
        }
    }
}
