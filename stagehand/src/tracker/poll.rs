//! Bounded status polling against the tracker's event log.

use super::TaskTracker;
use crate::core::TaskStatus;
use crate::errors::OrchestratorError;
use std::time::Duration;
use tracing::debug;

/// Default number of poll attempts before giving up.
pub const DEFAULT_POLL_RETRIES: u32 = 10;

/// Fixed sleep between poll attempts.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The decisive result of a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// An event carrying the target status was observed.
    Reached,
    /// An event carrying `failed` was observed before the target.
    Failed,
    /// The retry budget ran out without a decisive status.
    ///
    /// Callers treat this as fatal; it is never folded into `Failed`.
    TimedOut,
}

/// Polls the task's event log until a decisive status appears.
///
/// Each attempt fetches the full event log and scans it in order: any
/// event matching `target` wins immediately; any `failed` event loses
/// immediately with no further retries. An inconclusive scan sleeps
/// [`POLL_INTERVAL`] and tries again, up to `max_retries` attempts.
///
/// Retries apply only to "status not yet decisive" — transport failures
/// and non-success responses from the tracker propagate as errors at
/// once.
///
/// # Errors
///
/// Returns an error if fetching the event log fails.
pub async fn poll_until(
    tracker: &dyn TaskTracker,
    task_id: &str,
    target: &TaskStatus,
    max_retries: u32,
) -> Result<PollOutcome, OrchestratorError> {
    for attempt in 0..max_retries {
        debug!(task_id, attempt, "checking task status");
        let events = tracker.task_events(task_id).await?;
        for event in &events {
            if event.status == *target {
                return Ok(PollOutcome::Reached);
            }
            if event.status == TaskStatus::Failed {
                return Ok(PollOutcome::Failed);
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    debug!(task_id, max_retries, "poll retry budget exhausted");
    Ok(PollOutcome::TimedOut)
}
