//! Polling for long-running AWS jobs.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::ToolError;

/// Outcome of one status check.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus<T> {
    Done(T),
    /// Still running; carries the last reported status for the timeout message.
    Pending(String),
}

/// Run `check` every `interval` until it reports `Done` or `timeout` elapses.
///
/// Errors returned by `check` end the wait immediately. A timeout too large to
/// represent as an instant means no deadline.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    interval: Duration,
    timeout: Duration,
    mut check: F,
) -> Result<T, ToolError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus<T>, ToolError>>,
{
    let deadline = Instant::now().checked_add(timeout);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match check().await? {
            PollStatus::Done(value) => return Ok(value),
            PollStatus::Pending(status) => {
                let expired = deadline.is_some_and(|deadline| {
                    Instant::now()
                        .checked_add(interval)
                        .map_or(true, |next| next > deadline)
                });
                if expired {
                    return Err(ToolError::Timeout(format!(
                        "{} still {} after {}s ({} checks)",
                        what,
                        status,
                        timeout.as_secs(),
                        attempts
                    )));
                }
                log::debug!("{} is {}; checking again in {:?}", what, status, interval);
                tokio::time::sleep(interval).await;
            }
        }
    }
}
