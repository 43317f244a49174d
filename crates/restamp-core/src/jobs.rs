//! Background job store for batch processing.
//!
//! A fixed pool of worker threads drains a FIFO queue of submitted
//! batches. Finished jobs stay queryable for a retention window and are
//! then evicted by a sweeper thread.

use crate::archive::{self, InputDocument};
use crate::error::RestampError;
use crate::profile::Profile;
use crate::rewrite::RewriteOptions;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct JobStoreConfig {
    pub workers: usize,
    /// How long terminal jobs remain queryable.
    pub retention: Duration,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        JobStoreConfig {
            workers: 5,
            retention: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobId(String);

impl JobId {
    fn new() -> Self {
        JobId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed { reason: String },
}

impl JobStatus {
    fn label(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed { .. } => "failed",
        }
    }
}

struct JobPayload {
    documents: Vec<InputDocument>,
    profile: Profile,
    options: RewriteOptions,
}

enum JobState {
    Queued(Box<JobPayload>),
    Processing,
    Completed { zip_bytes: Vec<u8> },
    Failed { reason: String },
}

struct JobEntry {
    state: JobState,
    finished_at: Option<Instant>,
}

struct StoreState {
    queue: VecDeque<JobId>,
    jobs: HashMap<JobId, JobEntry>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<StoreState>,
    work_available: Condvar,
    sweeper_tick: Condvar,
}

pub struct JobStore {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl JobStore {
    pub fn new(config: JobStoreConfig) -> JobStore {
        let shared = Arc::new(Shared {
            state: Mutex::new(StoreState {
                queue: VecDeque::new(),
                jobs: HashMap::new(),
                shutdown: false,
            }),
            work_available: Condvar::new(),
            sweeper_tick: Condvar::new(),
        });

        let mut handles = Vec::with_capacity(config.workers + 1);
        for _ in 0..config.workers {
            let shared = Arc::clone(&shared);
            handles.push(std::thread::spawn(move || worker_loop(&shared)));
        }
        {
            let shared = Arc::clone(&shared);
            handles.push(std::thread::spawn(move || {
                sweeper_loop(&shared, config.retention)
            }));
        }

        JobStore { shared, handles }
    }

    /// Queue a batch and return the id to poll it with.
    pub fn submit(
        &self,
        documents: Vec<InputDocument>,
        profile: Profile,
        options: RewriteOptions,
    ) -> JobId {
        let id = JobId::new();
        let payload = Box::new(JobPayload {
            documents,
            profile,
            options,
        });
        let mut state = self.shared.state.lock().unwrap();
        state.jobs.insert(
            id.clone(),
            JobEntry {
                state: JobState::Queued(payload),
                finished_at: None,
            },
        );
        state.queue.push_back(id.clone());
        self.shared.work_available.notify_one();
        tracing::debug!(job = %id, "job queued");
        id
    }

    pub fn status(&self, id: &JobId) -> Result<JobStatus, RestampError> {
        let state = self.shared.state.lock().unwrap();
        let entry = state
            .jobs
            .get(id)
            .ok_or_else(|| RestampError::JobNotFound(id.to_string()))?;
        Ok(match &entry.state {
            JobState::Queued(_) => JobStatus::Queued,
            JobState::Processing => JobStatus::Processing,
            JobState::Completed { .. } => JobStatus::Completed,
            JobState::Failed { reason } => JobStatus::Failed {
                reason: reason.clone(),
            },
        })
    }

    /// Hand back the result zip of a completed job.
    pub fn fetch_result(&self, id: &JobId) -> Result<Vec<u8>, RestampError> {
        let state = self.shared.state.lock().unwrap();
        let entry = state
            .jobs
            .get(id)
            .ok_or_else(|| RestampError::JobNotFound(id.to_string()))?;
        match &entry.state {
            JobState::Completed { zip_bytes } => Ok(zip_bytes.clone()),
            JobState::Failed { reason } => Err(RestampError::ResultNotReady(
                id.to_string(),
                format!("failed: {reason}"),
            )),
            other => {
                let status = match other {
                    JobState::Queued(_) => JobStatus::Queued,
                    _ => JobStatus::Processing,
                };
                Err(RestampError::ResultNotReady(
                    id.to_string(),
                    status.label().to_string(),
                ))
            }
        }
    }
}

impl Drop for JobStore {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.shutdown = true;
        }
        self.shared.work_available.notify_all();
        self.shared.sweeper_tick.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let (id, payload) = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if state.shutdown {
                    return;
                }
                if let Some(id) = state.queue.pop_front() {
                    let Some(entry) = state.jobs.get_mut(&id) else {
                        // Evicted while queued; nothing to do.
                        continue;
                    };
                    match std::mem::replace(&mut entry.state, JobState::Processing) {
                        JobState::Queued(payload) => break (id, payload),
                        other => {
                            entry.state = other;
                            continue;
                        }
                    }
                }
                state = shared.work_available.wait(state).unwrap();
            }
        };

        tracing::debug!(job = %id, "job started");
        let result = archive::process_batch(&payload.documents, &payload.profile, &payload.options);

        let mut state = shared.state.lock().unwrap();
        if let Some(entry) = state.jobs.get_mut(&id) {
            entry.state = match result {
                Ok(outcome) => {
                    tracing::debug!(job = %id, entries = outcome.processed.len(), "job completed");
                    JobState::Completed {
                        zip_bytes: outcome.zip_bytes,
                    }
                }
                Err(e) => {
                    tracing::warn!(job = %id, error = %e, "job failed");
                    JobState::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            entry.finished_at = Some(Instant::now());
        }
    }
}

fn sweeper_loop(shared: &Shared, retention: Duration) {
    let interval = retention.min(Duration::from_secs(5)).max(Duration::from_millis(10));
    let mut state = shared.state.lock().unwrap();
    loop {
        if state.shutdown {
            return;
        }
        state
            .jobs
            .retain(|_, entry| match entry.finished_at {
                Some(finished) => finished.elapsed() < retention,
                None => true,
            });
        let (next, _) = shared.sweeper_tick.wait_timeout(state, interval).unwrap();
        state = next;
    }
}
