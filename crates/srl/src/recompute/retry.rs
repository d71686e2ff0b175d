use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::config::RetryPolicy;
use crate::runs::RepositoryError;

#[derive(Debug, Display, Error, From)]
pub enum AttemptError {
    #[display("timed out after {_0:?}")]
    #[from(ignore)]
    TimedOut(#[error(not(source))] Duration),

    #[display("{_0}")]
    Repository(RepositoryError),
}

#[derive(Debug, Display, Error)]
#[display("run repository unavailable after {attempts} attempt(s): {source}")]
pub struct RepositoryUnavailableError {
    pub attempts: u32,
    pub source: AttemptError,
}

/// Runs `make_attempt` until it succeeds, backing off exponentially between attempts.
pub(crate) async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut make_attempt: F,
) -> Result<T, RepositoryUnavailableError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    let mut backoff = policy.initial_backoff;
    let mut attempts = 0;

    loop {
        attempts += 1;

        let error = match timeout(policy.timeout, make_attempt()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => AttemptError::Repository(error),
            Err(_) => AttemptError::TimedOut(policy.timeout),
        };

        if attempts >= policy.attempts.get() {
            return Err(RepositoryUnavailableError { attempts, source: error });
        }

        warn!(%error, attempts, ?backoff, "{operation} failed; retrying");

        sleep(backoff).await;
        backoff = backoff.saturating_mul(2).min(policy.max_backoff);
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts: NonZero::new(attempts).unwrap(),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retries(&policy(3), "test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(RepositoryError::Unavailable)
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_eventually() {
        let calls = AtomicU32::new(0);
        let error = with_retries(&policy(2), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(RepositoryError::Unavailable)
        })
        .await
        .unwrap_err();

        assert_eq!(error.attempts, 2);
        assert!(matches!(error.source, AttemptError::Repository(RepositoryError::Unavailable)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_attempts_time_out() {
        let error = with_retries(&policy(1), "test", || async {
            sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(error.source, AttemptError::TimedOut(_)));
    }
}
