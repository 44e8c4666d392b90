//! Bounded retry for external calls that report a transient condition,
//! such as a hardware signer that is busy with another request.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::WalletSettings;
use crate::crypto::SignerError;

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &WalletSettings) -> Self {
        Self {
            max_attempts: settings.signer_retry_attempts.max(1),
            backoff: settings.signer_retry_backoff(),
        }
    }
}

/// Errors that can tell whether another attempt may succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for SignerError {
    fn is_transient(&self) -> bool {
        SignerError::is_transient(self)
    }
}

/// Runs `operation` until it succeeds, fails permanently or the attempt
/// budget is spent, sleeping a fixed backoff between attempts.
pub async fn retry_transient<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, operation = %label, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < max_attempts => {
                warn!(
                    attempt,
                    max_attempts,
                    backoff_ms = policy.backoff.as_millis() as u64,
                    operation = %label,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
