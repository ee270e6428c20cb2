//! Retry loop: run an async attempt until success, cancellation or exhaustion.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

use super::policy::{RetryDecision, RetryPolicy};

/// Runs `attempt_fn` until it succeeds or the policy says to stop.
///
/// The cancellation token is checked before every attempt; a cancelled job
/// fails with `Cancelled` without spending an attempt. Failures are logged and
/// followed by the policy's delay (cut short by cancellation). When the budget
/// is spent the result is `ExhaustedRetries`.
pub async fn run_with_retry<F, Fut>(
    policy: &RetryPolicy,
    cancel: Option<&CancellationToken>,
    description: &str,
    mut attempt_fn: F,
) -> Result<()>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut attempt = 1u32;
    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            tracing::info!(
                job = description,
                attempt,
                "cancellation observed before attempt"
            );
            return Err(Error::Cancelled {
                description: description.to_string(),
            });
        }

        let err = match attempt_fn(attempt).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        tracing::error!(
            job = description,
            attempt,
            error = %format!("{err:#}"),
            "discrete job attempt failed"
        );

        match policy.decide(attempt) {
            RetryDecision::NoRetry => {
                return Err(Error::ExhaustedRetries {
                    description: description.to_string(),
                    attempts: attempt,
                    last_error: format!("{err:#}"),
                });
            }
            RetryDecision::RetryAfter(delay) => {
                tracing::debug!(job = description, ?delay, "waiting before next attempt");
                match cancel {
                    Some(token) => {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = token.cancelled() => {}
                        }
                    }
                    None => tokio::time::sleep(delay).await,
                }
                attempt += 1;
            }
        }
    }
}
