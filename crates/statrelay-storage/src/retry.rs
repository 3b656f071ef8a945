//! Bounded retry for calls that reach an external backend.

use sea_orm::DbErr;
use std::future::Future;
use std::time::Duration;

/// Retry policy for connection-class backend failures: a fixed attempt
/// bound with a linearly increasing delay between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
    pub step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_secs(1),
            step: Duration::from_secs(2),
        }
    }
}

/// True for transient connectivity failures worth retrying. Query, schema,
/// and constraint errors are not: replaying those cannot succeed.
pub fn is_connection_error(err: &DbErr) -> bool {
    matches!(err, DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
}

/// Runs `op`, retrying connection-class errors up to the policy bound.
///
/// The delay grows by `step` after each failed attempt. The wait is a plain
/// await, so dropping the future (request deadline, shutdown) cancels it
/// immediately. Non-connection errors and bound exhaustion return the last
/// error unchanged.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> std::result::Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, DbErr>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 0u32;
    loop {
        match op().await {
            Err(err) if is_connection_error(&err) && attempt < policy.retries => {
                attempt += 1;
                tracing::warn!(
                    error = %err,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Backend call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay += policy.step;
            }
            other => return other,
        }
    }
}
