// riskwatch-core/src/infrastructure/retry.rs
//
// Bounded exponential backoff around store calls.
//
// | Attempt | Delay before next (defaults) |
// |---------|------------------------------|
// | 0       | 50ms                         |
// | 1       | 100ms                        |
// | 2       | gives up (max_attempts = 3)  |

use std::future::Future;
use tracing::warn;

use crate::domain::monitoring::RetryPolicy;
use crate::error::RiskwatchError;

/// Runs `op` until it succeeds, fails permanently, or `policy.max_attempts` is reached.
///
/// Only transient errors (`RiskwatchError::is_transient`) are retried.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RiskwatchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RiskwatchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    op = label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient store failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
