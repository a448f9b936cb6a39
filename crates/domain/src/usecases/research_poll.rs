//! Deep research poller - repeatedly reads a job's status until it completes

use std::sync::Arc;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use crate::{
    model::{ResearchJob, ResearchStatus},
    ports::{ResearchError, ResearchStatusSource},
};

/// Default delay between two status reads
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poller state. `Completed` and `Cancelled` are terminal; `Errored` waits for
/// a manual [`PollHandle::poll_now`].
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Polling,
    Completed(ResearchJob),
    Errored(String),
    Cancelled,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Completed(_) | PollState::Cancelled)
    }
}

/// Receives poller events. `on_complete` is called exactly once per job.
pub trait ResearchObserver: Send + Sync {
    fn on_progress(&self, _job: &ResearchJob) {}

    fn on_complete(&self, job: ResearchJob);

    fn on_error(&self, _error: &str) {}
}

struct Shared {
    state: watch::Sender<PollState>,
    wake: Notify,
}

impl Shared {
    /// Move to `next` unless the poller already reached a terminal state
    fn transition(&self, next: PollState) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_terminal() || *state == next {
                false
            } else {
                *state = next;
                true
            }
        })
    }

    /// Record a failed read. Every failure is published, even when the
    /// message repeats, so watchers and observers see each one.
    fn fail(&self, message: String) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = PollState::Errored(message);
                true
            }
        })
    }
}

pub struct ResearchPoller {
    source: Arc<dyn ResearchStatusSource>,
    interval: Duration,
}

impl ResearchPoller {
    pub fn new(source: Arc<dyn ResearchStatusSource>) -> Self {
        Self {
            source,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start polling `job_id`. The first read happens immediately. `started`
    /// is the job creation instant used for [`PollHandle::elapsed`].
    pub fn spawn(
        &self,
        job_id: impl Into<String>,
        started: Instant,
        observer: Arc<dyn ResearchObserver>,
    ) -> PollHandle {
        let job_id = job_id.into();
        let (state, _) = watch::channel(PollState::Polling);
        let shared = Arc::new(Shared {
            state,
            wake: Notify::new(),
        });

        let task = tokio::spawn(poll_loop(
            self.source.clone(),
            job_id.clone(),
            self.interval,
            shared.clone(),
            observer,
        ));

        PollHandle {
            job_id,
            started,
            shared,
            task,
        }
    }
}

async fn poll_loop(
    source: Arc<dyn ResearchStatusSource>,
    job_id: String,
    interval: Duration,
    shared: Arc<Shared>,
    observer: Arc<dyn ResearchObserver>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polls: u32 = 0;

    loop {
        let errored = matches!(*shared.state.borrow(), PollState::Errored(_));
        if errored {
            shared.wake.notified().await;
            ticker.reset();
        } else {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shared.wake.notified() => {}
            }
        }

        polls += 1;
        let outcome = source.read_status(&job_id).await;

        match outcome {
            Ok(job) if job.status == ResearchStatus::Completed => {
                tracing::info!(job_id = %job_id, polls, "Deep research completed");
                if shared.transition(PollState::Completed(job.clone())) {
                    observer.on_complete(job);
                }
                return;
            }
            Ok(job) if job.status == ResearchStatus::Failed => {
                let message = "Deep research job failed".to_string();
                tracing::warn!(job_id = %job_id, polls, "{}", message);
                if shared.fail(message.clone()) {
                    observer.on_error(&message);
                }
            }
            Ok(job) => {
                tracing::debug!(
                    job_id = %job_id,
                    polls,
                    depth = job.current_depth,
                    max_depth = job.max_depth,
                    "Deep research in progress"
                );
                shared.transition(PollState::Polling);
                observer.on_progress(&job);
            }
            Err(e) => {
                let message = error_message(&e);
                tracing::warn!(job_id = %job_id, polls, error = %e, "Status read failed");
                if shared.fail(message.clone()) {
                    observer.on_error(&message);
                }
            }
        }
    }
}

fn error_message(error: &ResearchError) -> String {
    format!("Failed to read research status: {}", error)
}

/// Handle to a running poll. Dropping it stops the poll.
pub struct PollHandle {
    job_id: String,
    started: Instant,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state(&self) -> PollState {
        self.shared.state.borrow().clone()
    }

    /// Time since the job was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Trigger one read right away. After an error this is the only way to
    /// resume; a successful read resumes periodic polling.
    pub fn poll_now(&self) {
        if !self.state().is_terminal() {
            self.shared.wake.notify_one();
        }
    }

    /// Trigger one read and wait for its outcome. Returns at once when the
    /// poll already reached a terminal state.
    pub async fn retry(&self) -> PollState {
        let mut rx = self.shared.state.subscribe();
        if rx.borrow_and_update().is_terminal() {
            return self.state();
        }

        self.shared.wake.notify_one();
        match rx.changed().await {
            Ok(()) => rx.borrow_and_update().clone(),
            Err(_) => self.state(),
        }
    }

    /// Stop polling. Safe to call repeatedly and after completion; a
    /// completed poll keeps its `Completed` state.
    pub fn cancel(&self) {
        if self.shared.transition(PollState::Cancelled) {
            tracing::debug!(job_id = %self.job_id, "Deep research polling cancelled");
        }
        self.task.abort();
    }

    /// Wait until the state satisfies `predicate`
    pub async fn wait_until(&self, mut predicate: impl FnMut(&PollState) -> bool) -> PollState {
        let mut rx = self.shared.state.subscribe();
        match rx.wait_for(|state| predicate(state)).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Wait until the poll leaves `Polling`
    pub async fn settled(&self) -> PollState {
        self.wait_until(|state| *state != PollState::Polling).await
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Format a duration as `MM:SS`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
