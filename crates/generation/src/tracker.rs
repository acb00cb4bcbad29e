//! Server-side owner of the current generation job.
//!
//! At most one job is tracked. Submitting a new request supersedes the
//! previous job: its poll loop is cancelled and any late result it produces
//! is discarded because updates are applied only when the job id still
//! matches the current job.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use lookbook_core::error::CoreError;
use lookbook_core::generation::{prepare, GenerationRequest, JobStatus, ModelRegistry, PreparedGeneration};
use lookbook_core::task_response::{
    classify, extract_error_message, extract_poll_url, extract_result_url, extract_task_id,
    TaskState,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::GenerationBackend;
use crate::poller::{poll_until_done, PollConfig, PollError, PollOutcome};

/// One timestamped line of a job's activity log.
#[derive(Debug, Clone, Serialize)]
pub struct JobLogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Snapshot of a tracked job as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub id: Uuid,
    pub model: String,
    pub dimension: Option<String>,
    pub resolution: String,
    pub prompt: String,
    pub reference_images: Vec<String>,
    pub status: JobStatus,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub logs: Vec<JobLogEntry>,
    pub created_at: DateTime<Utc>,
}

impl GenerationJob {
    fn queued(prepared: &PreparedGeneration) -> Self {
        let mut job = Self {
            id: Uuid::new_v4(),
            model: prepared.model.id.clone(),
            dimension: prepared.dimension.map(|d| d.to_string()),
            resolution: prepared.resolution.as_str().to_string(),
            prompt: prepared.prompt.clone(),
            reference_images: prepared.reference_images.clone(),
            status: JobStatus::Queued,
            result_url: None,
            error: None,
            logs: Vec::new(),
            created_at: Utc::now(),
        };
        job.log(format!("Queued {} ({})", prepared.model.label, job.resolution));
        job
    }

    fn log(&mut self, message: impl Into<String>) {
        self.logs.push(JobLogEntry {
            at: Utc::now(),
            message: message.into(),
        });
    }

    fn finish(&mut self, status: JobStatus, message: impl Into<String>) {
        let message = message.into();
        self.status = status;
        if matches!(status, JobStatus::Failed | JobStatus::TimedOut) {
            self.error = Some(message.clone());
        }
        self.log(message);
    }
}

#[derive(Default)]
struct TrackerState {
    job: Option<GenerationJob>,
    cancel: Option<CancellationToken>,
}

type Shared = Arc<Mutex<TrackerState>>;

fn lock(shared: &Shared) -> MutexGuard<'_, TrackerState> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Apply `f` to the current job if it is still `job_id` and not finished.
/// Returns whether the update was applied.
fn update(shared: &Shared, job_id: Uuid, f: impl FnOnce(&mut GenerationJob)) -> bool {
    let mut state = lock(shared);
    match state.job.as_mut() {
        Some(job) if job.id == job_id && !job.status.is_terminal() => {
            f(job);
            true
        }
        _ => {
            tracing::debug!(%job_id, "Discarding update for superseded job");
            false
        }
    }
}

/// Tracks the single current generation job.
pub struct JobTracker {
    backend: Option<Arc<dyn GenerationBackend>>,
    registry: Arc<ModelRegistry>,
    poll: PollConfig,
    shared: Shared,
}

impl JobTracker {
    /// `backend` is `None` when no provider key is configured.
    pub fn new(
        backend: Option<Arc<dyn GenerationBackend>>,
        registry: Arc<ModelRegistry>,
        poll: PollConfig,
    ) -> Self {
        Self {
            backend,
            registry,
            poll,
            shared: Arc::default(),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Validate `request`, replace the current job and start it in the
    /// background. Nothing changes when validation fails.
    pub fn submit(&self, request: &GenerationRequest) -> Result<GenerationJob, CoreError> {
        let backend = self.backend.clone().ok_or_else(|| {
            CoreError::Configuration("GENERATION_API_KEY is not configured".to_string())
        })?;
        let prepared = prepare(&self.registry, request)?;

        let job = GenerationJob::queued(&prepared);
        let token = CancellationToken::new();
        {
            let mut state = lock(&self.shared);
            if let Some(previous) = state.cancel.replace(token.clone()) {
                previous.cancel();
            }
            state.job = Some(job.clone());
        }

        tracing::info!(job_id = %job.id, model = %job.model, "Generation job queued");
        tokio::spawn(run_job(
            Arc::clone(&self.shared),
            backend,
            self.poll.clone(),
            job.id,
            prepared,
            token,
        ));

        Ok(job)
    }

    /// Snapshot of the current job, if any.
    pub fn current(&self) -> Option<GenerationJob> {
        lock(&self.shared).job.clone()
    }

    /// Cancel the in-flight job. Returns `false` when nothing was running.
    pub fn cancel(&self) -> bool {
        let mut state = lock(&self.shared);
        let token = state.cancel.take();
        match state.job.as_mut() {
            Some(job) if !job.status.is_terminal() => {
                job.finish(JobStatus::Cancelled, "Cancelled");
                if let Some(token) = token {
                    token.cancel();
                }
                tracing::info!(job_id = %job.id, "Generation job cancelled");
                true
            }
            _ => false,
        }
    }

    /// Stop any in-flight poll loop. Called on server shutdown.
    pub fn shutdown(&self) {
        if self.cancel() {
            tracing::info!("Cancelled in-flight generation job on shutdown");
        }
    }
}

async fn run_job(
    shared: Shared,
    backend: Arc<dyn GenerationBackend>,
    poll: PollConfig,
    job_id: Uuid,
    prepared: PreparedGeneration,
    cancel: CancellationToken,
) {
    let submitted = tokio::select! {
        _ = cancel.cancelled() => return,
        result = backend.submit(&prepared.model.id, &prepared.payload) => result,
    };

    let response = match submitted {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(%job_id, error = %err, "Generation submit failed");
            update(&shared, job_id, |job| {
                job.finish(JobStatus::Failed, format!("Submit failed: {err}"))
            });
            return;
        }
    };

    if let Some(result_url) = extract_result_url(&response) {
        tracing::info!(%job_id, "Generation completed immediately");
        update(&shared, job_id, |job| {
            job.result_url = Some(result_url);
            job.finish(JobStatus::Completed, "Completed");
        });
        return;
    }
    if let TaskState::Failed(message) = classify(&response) {
        let message = message.unwrap_or_else(|| "Generation failed".to_string());
        update(&shared, job_id, |job| job.finish(JobStatus::Failed, message));
        return;
    }

    let poll_url = extract_poll_url(&response)
        .or_else(|| extract_task_id(&response).map(|id| backend.result_url(&id)));
    let Some(poll_url) = poll_url else {
        let detail = extract_error_message(&response)
            .unwrap_or_else(|| "response had no task id or poll URL".to_string());
        tracing::error!(%job_id, %detail, "Cannot track generation task");
        update(&shared, job_id, |job| {
            job.finish(JobStatus::Failed, format!("Cannot track task: {detail}"))
        });
        return;
    };

    let still_current = update(&shared, job_id, |job| {
        job.status = JobStatus::Processing;
        job.log("Submitted; waiting for result");
    });
    if !still_current {
        return;
    }
    tracing::info!(%job_id, %poll_url, "Polling generation task");

    match poll_until_done(backend.as_ref(), &poll_url, &poll, &cancel).await {
        Ok(PollOutcome::Completed { result_url }) => {
            tracing::info!(%job_id, "Generation completed");
            update(&shared, job_id, |job| {
                job.result_url = Some(result_url);
                job.finish(JobStatus::Completed, "Completed");
            });
        }
        Ok(PollOutcome::Cancelled) => {
            tracing::debug!(%job_id, "Poll loop stopped");
        }
        Err(err @ PollError::TimedOut(_)) => {
            tracing::warn!(%job_id, error = %err, "Generation timed out");
            update(&shared, job_id, |job| job.finish(JobStatus::TimedOut, err.to_string()));
        }
        Err(err) => {
            tracing::error!(%job_id, error = %err, "Generation failed");
            update(&shared, job_id, |job| job.finish(JobStatus::Failed, err.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::api::GenerationApiError;
    use crate::poller::StatusSource;

    /// Provider fake: fixed submit response, scripted status responses.
    struct FakeBackend {
        submit: Value,
        submit_delay: Duration,
        statuses: Mutex<VecDeque<Value>>,
        polled: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(submit: Value, statuses: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                submit,
                submit_delay: Duration::ZERO,
                statuses: Mutex::new(statuses.into()),
                polled: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl StatusSource for FakeBackend {
        async fn fetch_status(&self, url: &str) -> Result<Value, GenerationApiError> {
            self.polled.lock().unwrap().push(url.to_string());
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| json!({ "status": "processing" })))
        }
    }

    #[async_trait]
    impl GenerationBackend for FakeBackend {
        async fn submit(&self, _model: &str, _payload: &Value) -> Result<Value, GenerationApiError> {
            tokio::time::sleep(self.submit_delay).await;
            Ok(self.submit.clone())
        }

        fn result_url(&self, task_id: &str) -> String {
            format!("https://provider.test/predictions/{task_id}/result")
        }
    }

    fn fast_poll() -> PollConfig {
        PollConfig {
            initial_delay: Duration::from_millis(1),
            interval: Duration::from_millis(1),
            max_consecutive_failures: 10,
            budget: Duration::from_secs(5),
        }
    }

    fn tracker(backend: Arc<FakeBackend>) -> JobTracker {
        JobTracker::new(Some(backend), Arc::new(ModelRegistry::default()), fast_poll())
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "google/imagen4".into(),
            prompt: Some("a red coat".into()),
            ..Default::default()
        }
    }

    async fn wait_terminal(tracker: &JobTracker) -> GenerationJob {
        for _ in 0..500 {
            if let Some(job) = tracker.current().filter(|j| j.status.is_terminal()) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("job did not finish: {:?}", tracker.current());
    }

    #[tokio::test]
    async fn immediate_result_skips_polling() {
        let backend = FakeBackend::new(json!({ "data": { "outputs": ["https://cdn/a.png"] } }), vec![]);
        let tracker = tracker(Arc::clone(&backend));

        let queued = tracker.submit(&request()).unwrap();
        assert_eq!(queued.status, JobStatus::Queued);

        let job = wait_terminal(&tracker).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result_url.as_deref(), Some("https://cdn/a.png"));
        assert!(backend.polled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn task_id_is_polled_at_constructed_url() {
        let backend = FakeBackend::new(
            json!({ "data": { "id": "t-1", "status": "created" } }),
            vec![
                json!({ "status": "processing" }),
                json!({ "data": { "status": "completed", "outputs": ["https://cdn/b.png"] } }),
            ],
        );
        let tracker = tracker(Arc::clone(&backend));

        tracker.submit(&request()).unwrap();
        let job = wait_terminal(&tracker).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(
            backend.polled.lock().unwrap()[0],
            "https://provider.test/predictions/t-1/result"
        );
        assert!(job.logs.len() >= 3);
    }

    #[tokio::test]
    async fn untrackable_response_fails() {
        let backend = FakeBackend::new(json!({ "status": "created" }), vec![]);
        let tracker = tracker(backend);

        tracker.submit(&request()).unwrap();
        let job = wait_terminal(&tracker).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("no task id"));
    }

    #[tokio::test]
    async fn success_envelope_without_task_id_reports_missing_id() {
        let submitted = json!({ "code": 200, "message": "success", "data": { "status": "created" } });
        let tracker = tracker(FakeBackend::new(submitted, vec![]));

        tracker.submit(&request()).unwrap();
        let job = wait_terminal(&tracker).await;

        let error = job.error.unwrap();
        assert!(error.contains("no task id"));
        assert!(!error.contains("success"));
    }

    #[tokio::test]
    async fn validation_failure_leaves_tracker_idle() {
        let tracker = tracker(FakeBackend::new(json!({}), vec![]));

        let err = tracker
            .submit(&GenerationRequest {
                model: "google/nano-banana/edit".into(),
                prompt: Some("x".into()),
                ..Default::default()
            })
            .unwrap_err();

        assert_matches!(err, CoreError::Validation(_));
        assert!(tracker.current().is_none());
    }

    #[tokio::test]
    async fn missing_key_is_configuration_error() {
        let tracker = JobTracker::new(None, Arc::new(ModelRegistry::default()), fast_poll());

        assert_matches!(tracker.submit(&request()), Err(CoreError::Configuration(_)));
    }

    #[tokio::test]
    async fn cancel_stops_running_job() {
        let backend = FakeBackend::new(json!({ "id": "t-2" }), vec![]);
        let tracker = tracker(backend);

        tracker.submit(&request()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(tracker.cancel());
        assert_eq!(tracker.current().unwrap().status, JobStatus::Cancelled);
        assert!(!tracker.cancel());
    }

    #[tokio::test]
    async fn resubmission_supersedes_previous_job() {
        let slow = Arc::new(FakeBackend {
            submit: json!({ "output": "https://cdn/old.png" }),
            submit_delay: Duration::from_millis(30),
            statuses: Mutex::new(VecDeque::new()),
            polled: Mutex::new(Vec::new()),
        });
        let tracker = tracker(slow);

        let first = tracker.submit(&request()).unwrap();
        let second = tracker.submit(&request()).unwrap();
        assert_ne!(first.id, second.id);

        let job = wait_terminal(&tracker).await;
        assert_eq!(job.id, second.id);
        assert_eq!(job.status, JobStatus::Completed);
    }
}
