//! Fixed-interval status polling for submitted generation tasks.
//!
//! After an initial delay the status URL is fetched every
//! [`PollConfig::interval`] until the provider reports a terminal state,
//! the wall-clock budget runs out, too many consecutive requests fail, or
//! the [`CancellationToken`] is triggered.

use std::time::Duration;

use async_trait::async_trait;
use lookbook_core::error::CoreError;
use lookbook_core::task_response::{classify, extract_result_url, TaskState};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::GenerationApiError;

/// Source of task status documents.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, url: &str) -> Result<Value, GenerationApiError>;
}

/// Tunable parameters for the poll loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Wait before the first status request.
    pub initial_delay: Duration,
    /// Wait between status requests.
    pub interval: Duration,
    /// Consecutive failed requests tolerated before giving up.
    pub max_consecutive_failures: u32,
    /// Wall-clock budget measured from the first status request.
    pub budget: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(2000),
            interval: Duration::from_millis(3000),
            max_consecutive_failures: 10,
            budget: Duration::from_secs(5 * 60),
        }
    }
}

/// How a poll loop ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { result_url: String },
    Cancelled,
}

/// Why a poll loop gave up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    /// The provider reported failure or cancellation.
    #[error("{0}")]
    Failed(String),

    /// The provider reported success but no result URL was found.
    #[error("Generation completed without output")]
    NoOutput,

    /// Too many status requests in a row failed.
    #[error("Status polling failed {attempts} times in a row: {last_error}")]
    TooManyFailures { attempts: u32, last_error: String },

    /// The wall-clock budget ran out. The task may still finish upstream.
    #[error("Timed out after {}s waiting for the result; it may still be processing server-side", .0.as_secs())]
    TimedOut(Duration),
}

impl From<PollError> for CoreError {
    fn from(err: PollError) -> Self {
        CoreError::Upstream(err.to_string())
    }
}

/// Poll `url` until the task finishes.
pub async fn poll_until_done<S>(
    source: &S,
    url: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<PollOutcome, PollError>
where
    S: StatusSource + ?Sized,
{
    tokio::select! {
        _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
        _ = tokio::time::sleep(config.initial_delay) => {}
    }

    let deadline = Instant::now() + config.budget;
    let mut attempt = 0u32;
    let mut failures = 0u32;

    loop {
        attempt += 1;

        let result = tokio::select! {
            _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
            _ = tokio::time::sleep_until(deadline) => return Err(PollError::TimedOut(config.budget)),
            result = source.fetch_status(url) => result,
        };

        match result {
            Ok(body) => {
                failures = 0;
                match classify(&body) {
                    TaskState::Completed => {
                        return extract_result_url(&body)
                            .map(|result_url| PollOutcome::Completed { result_url })
                            .ok_or(PollError::NoOutput);
                    }
                    TaskState::Failed(message) => {
                        return Err(PollError::Failed(
                            message.unwrap_or_else(|| "Generation failed".to_string()),
                        ));
                    }
                    TaskState::Pending(status) => {
                        tracing::debug!(attempt, status = status.as_deref(), "Task still running");
                    }
                }
            }
            Err(err) => {
                failures += 1;
                tracing::warn!(attempt, failures, error = %err, "Status poll failed");
                // The budget outranks the failure limit.
                if Instant::now() < deadline && failures >= config.max_consecutive_failures {
                    return Err(PollError::TooManyFailures {
                        attempts: failures,
                        last_error: err.to_string(),
                    });
                }
            }
        }

        if Instant::now() >= deadline {
            return Err(PollError::TimedOut(config.budget));
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
            _ = tokio::time::sleep_until(deadline) => return Err(PollError::TimedOut(config.budget)),
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    /// Replays scripted responses, then reports `processing` forever.
    struct Scripted {
        steps: Mutex<VecDeque<Result<Value, GenerationApiError>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(steps: Vec<Result<Value, GenerationApiError>>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl StatusSource for Scripted {
        async fn fetch_status(&self, _url: &str) -> Result<Value, GenerationApiError> {
            *self.calls.lock().unwrap() += 1;
            self.steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({ "status": "processing" })))
        }
    }

    /// Never answers.
    struct Stalled;

    #[async_trait]
    impl StatusSource for Stalled {
        async fn fetch_status(&self, _url: &str) -> Result<Value, GenerationApiError> {
            std::future::pending().await
        }
    }

    /// Blocks past any short budget, then fails.
    struct SlowFailure(Duration);

    #[async_trait]
    impl StatusSource for SlowFailure {
        async fn fetch_status(&self, _url: &str) -> Result<Value, GenerationApiError> {
            std::thread::sleep(self.0);
            not_ready()
        }
    }

    fn not_ready() -> Result<Value, GenerationApiError> {
        Err(GenerationApiError::ApiError {
            status: 404,
            body: "not yet available".into(),
        })
    }

    fn fast() -> PollConfig {
        PollConfig {
            initial_delay: Duration::from_millis(1),
            interval: Duration::from_millis(1),
            max_consecutive_failures: 10,
            budget: Duration::from_secs(5),
        }
    }

    // -- terminal states --

    #[tokio::test]
    async fn completes_with_result_url() {
        let source = Scripted::new(vec![
            Ok(json!({ "status": "processing" })),
            Ok(json!({ "data": { "status": "completed", "outputs": ["https://cdn/x.png"] } })),
        ]);

        let outcome = poll_until_done(&source, "u", &fast(), &CancellationToken::new()).await;

        assert_eq!(
            outcome,
            Ok(PollOutcome::Completed {
                result_url: "https://cdn/x.png".into()
            })
        );
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn success_without_output_is_failure() {
        let source = Scripted::new(vec![Ok(json!({ "status": "SUCCESS" }))]);

        let outcome = poll_until_done(&source, "u", &fast(), &CancellationToken::new()).await;

        assert_eq!(outcome, Err(PollError::NoOutput));
    }

    #[tokio::test]
    async fn provider_failure_carries_message() {
        let source = Scripted::new(vec![Ok(json!({ "status": "failed", "error": "NSFW" }))]);

        let outcome = poll_until_done(&source, "u", &fast(), &CancellationToken::new()).await;

        assert_eq!(outcome, Err(PollError::Failed("NSFW".into())));
    }

    // -- transient failures --

    #[tokio::test]
    async fn nine_failures_then_success_completes() {
        let mut steps: Vec<_> = (0..9).map(|_| not_ready()).collect();
        steps.push(Ok(json!({ "status": "succeeded", "output": "https://cdn/y.png" })));
        let source = Scripted::new(steps);

        let outcome = poll_until_done(&source, "u", &fast(), &CancellationToken::new()).await;

        assert_matches!(outcome, Ok(PollOutcome::Completed { .. }));
        assert_eq!(source.calls(), 10);
    }

    #[tokio::test]
    async fn tenth_consecutive_failure_gives_up() {
        let source = Scripted::new((0..10).map(|_| not_ready()).collect());

        let outcome = poll_until_done(&source, "u", &fast(), &CancellationToken::new()).await;

        assert_matches!(outcome, Err(PollError::TooManyFailures { attempts: 10, .. }));
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let mut steps: Vec<_> = (0..9).map(|_| not_ready()).collect();
        steps.push(Ok(json!({ "status": "processing" })));
        steps.extend((0..9).map(|_| not_ready()));
        steps.push(Ok(json!({ "status": "completed", "url": "https://cdn/z.png" })));
        let source = Scripted::new(steps);

        let outcome = poll_until_done(&source, "u", &fast(), &CancellationToken::new()).await;

        assert_matches!(outcome, Ok(PollOutcome::Completed { .. }));
        assert_eq!(source.calls(), 20);
    }

    // -- budget and cancellation --

    #[tokio::test]
    async fn budget_exhaustion_times_out() {
        let source = Scripted::new(vec![]);
        let config = PollConfig {
            budget: Duration::from_millis(20),
            interval: Duration::from_millis(5),
            ..fast()
        };

        let outcome = poll_until_done(&source, "u", &config, &CancellationToken::new()).await;

        assert_matches!(outcome, Err(PollError::TimedOut(_)));
        assert!(outcome.unwrap_err().to_string().contains("still be processing"));
    }

    #[tokio::test]
    async fn hung_status_request_times_out() {
        let config = PollConfig {
            budget: Duration::from_millis(50),
            ..fast()
        };

        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            poll_until_done(&Stalled, "u", &config, &CancellationToken::new()),
        )
        .await
        .expect("poll loop must honour its budget");

        assert_eq!(outcome, Err(PollError::TimedOut(Duration::from_millis(50))));
    }

    #[tokio::test]
    async fn failure_limit_after_budget_reports_timeout() {
        let source = SlowFailure(Duration::from_millis(30));
        let config = PollConfig {
            max_consecutive_failures: 1,
            budget: Duration::from_millis(10),
            ..fast()
        };

        let outcome = poll_until_done(&source, "u", &config, &CancellationToken::new()).await;

        assert_matches!(outcome, Err(PollError::TimedOut(_)));
    }

    #[tokio::test]
    async fn cancellation_stops_polling() {
        let source = Scripted::new(vec![]);
        let cancel = CancellationToken::new();
        let config = PollConfig {
            interval: Duration::from_secs(60),
            ..fast()
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let outcome = poll_until_done(&source, "u", &config, &cancel).await;

        assert_eq!(outcome, Ok(PollOutcome::Cancelled));
        assert_eq!(source.calls(), 1);
    }
}
