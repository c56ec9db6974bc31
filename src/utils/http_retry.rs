// Shared exponential-backoff wrapper for outbound provider calls
use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::time::{sleep, Duration};

/// Retries after the first attempt.
pub const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;

/// Delay before retry number `retry` (1-based): 1s, 2s, 4s.
pub fn backoff_delay(retry: u32) -> Duration {
    Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retry.saturating_sub(1)))
}

pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Sends the request built by `build`, retrying on network errors, 429 and
/// 5xx. `build` is invoked once per attempt since request bodies are consumed.
///
/// That is one initial attempt plus `MAX_RETRIES` retries: at most 4 sends
/// with 7s of backoff between them. The worst case is 7s plus four times the
/// per-request timeout, about 4 x 55s + 7s for AI calls.
pub async fn send_with_retry<F>(label: &str, build: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> RequestBuilder,
{
    let delays: Vec<Duration> = (1..=MAX_RETRIES).map(backoff_delay).collect();
    send_with_delays(label, build, &delays).await
}

async fn send_with_delays<F>(
    label: &str,
    build: F,
    delays: &[Duration],
) -> Result<Response, reqwest::Error>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0usize;

    loop {
        let is_last = attempt >= delays.len();

        match build().send().await {
            Ok(response) if is_last || !is_retryable(response.status()) => return Ok(response),
            Ok(response) => {
                tracing::warn!(
                    "{} attempt {} returned {}. Retrying in {:?}...",
                    label,
                    attempt + 1,
                    response.status(),
                    delays[attempt]
                );
            }
            Err(e) if is_last => {
                tracing::error!("{} failed after {} attempts: {}", label, attempt + 1, e);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    "{} attempt {} failed: {}. Retrying in {:?}...",
                    label,
                    attempt + 1,
                    e,
                    delays[attempt]
                );
            }
        }

        sleep(delays[attempt]).await;
        attempt += 1;
    }
}
