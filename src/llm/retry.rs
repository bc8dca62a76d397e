//! Bounded retry with exponential backoff, and the model fallback loop
//!
//! A `ModelChain` is consumed front to back. Each model gets its own retry
//! budget; a model that exhausts it hands over to the next one. Only when the
//! whole chain is spent does the caller see an error.

use super::models::ModelChain;
use crate::error::{LqaError, LqaResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Initial delay before the first retry
pub const INITIAL_BACKOFF_MS: u64 = 1000;
pub const BACKOFF_MULTIPLIER: u32 = 2;
/// Extra attempts after the first failure
pub const DEFAULT_RETRIES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            multiplier: BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }

    /// Full backoff sequence when every attempt fails.
    pub fn delays(&self) -> Vec<Duration> {
        (1..=self.retries).map(|r| self.delay_for(r)).collect()
    }
}

/// Run `op` until it succeeds or the retry budget is spent.
///
/// Every failure is appended to `failures` as `label#attempt: error`.
/// Non-retryable errors return immediately.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    failures: &mut Vec<String>,
    mut op: F,
) -> LqaResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LqaResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                failures.push(format!("{}#{}: {}", label, attempt, err));
                if !err.is_retryable() || attempt > policy.retries {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    label,
                    attempt,
                    max_attempts = policy.retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Result of a chain run, tagged with the model that produced it
#[derive(Debug, Clone)]
pub struct ChainOutput<T> {
    pub value: T,
    pub model: String,
}

/// Try each model in the chain with its own retry budget.
pub async fn run_chain<T, F, Fut>(chain: &ModelChain, mut op: F) -> LqaResult<ChainOutput<T>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = LqaResult<T>>,
{
    if chain.is_empty() {
        return Err(LqaError::config("no models configured"));
    }
    let mut failures = Vec::new();

    for (idx, step) in chain.steps().iter().enumerate() {
        let model = step.model.as_str();
        match retry(&step.policy, model, &mut failures, || op(model.to_string())).await {
            Ok(value) => {
                return Ok(ChainOutput {
                    value,
                    model: model.to_string(),
                })
            }
            Err(err @ LqaError::Config(_)) => return Err(err),
            Err(err) => {
                if idx + 1 < chain.steps().len() {
                    warn!(model, error = %err, "model exhausted its retry budget, falling back");
                }
            }
        }
    }

    Err(LqaError::Exhausted { attempts: failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_default_backoff_sequence() {
        assert_eq!(
            RetryPolicy::default().delays(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
        assert!(RetryPolicy::none().delays().is_empty());
        assert_eq!(
            RetryPolicy::default().with_retries(4).delay_for(4),
            Duration::from_millis(8000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_sleeps_with_growing_delay() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let mut failures = Vec::new();

        let result = retry(&RetryPolicy::default(), "m", &mut failures, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LqaError::protocol("empty"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(failures.len(), 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(3100), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_on_config_error() {
        let calls = AtomicU32::new(0);
        let mut failures = Vec::new();
        let result: LqaResult<()> = retry(&RetryPolicy::default(), "m", &mut failures, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LqaError::config("no key")) }
        })
        .await;
        assert!(matches!(result, Err(LqaError::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_falls_back_after_budget() {
        let chain = ModelChain::new()
            .then("primary", RetryPolicy::default())
            .then("fallback", RetryPolicy::default());
        let seen = Mutex::new(Vec::new());

        let out = run_chain(&chain, |model| {
            seen.lock().unwrap().push(model.clone());
            async move {
                if model == "primary" {
                    Err(LqaError::transport("reset"))
                } else {
                    Ok("report")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(out.model, "fallback");
        assert_eq!(out.value, "report");
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["primary", "primary", "primary", "fallback"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_exhausted_reports_every_attempt() {
        let chain = ModelChain::new()
            .then("a", RetryPolicy::none())
            .then("b", RetryPolicy::default().with_retries(1));
        let result: LqaResult<ChainOutput<()>> =
            run_chain(&chain, |_| async { Err(LqaError::protocol("empty body")) }).await;
        match result {
            Err(LqaError::Exhausted { attempts }) => {
                assert_eq!(attempts.len(), 3);
                assert!(attempts[0].starts_with("a#1"));
                assert!(attempts[2].starts_with("b#2"));
            }
            other => panic!("expected exhausted, got {:?}", other.map(|o| o.model)),
        }
    }

    #[tokio::test]
    async fn test_empty_chain_is_config_error() {
        let result: LqaResult<ChainOutput<()>> =
            run_chain(&ModelChain::new(), |_| async { Ok(()) }).await;
        assert!(matches!(result, Err(LqaError::Config(_))));
    }
}
