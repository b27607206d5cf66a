use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error("no value after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("check failed: {0}")]
    Check(#[source] E),
}

/// Runs `check` until it yields a value, at most `max_attempts` times,
/// sleeping `delay` between attempts. The attempt number (starting at 1) is
/// passed to `check`. An error from `check` ends polling immediately.
pub async fn poll_until<T, E, F, Fut>(
    max_attempts: u32,
    delay: Duration,
    mut check: F,
) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 1..=max_attempts {
        if let Some(value) = check(attempt).await.map_err(PollError::Check)? {
            return Ok(value);
        }

        if attempt < max_attempts {
            tokio::time::sleep(delay).await;
        }
    }

    Err(PollError::Timeout {
        attempts: max_attempts,
    })
}
