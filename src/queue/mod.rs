// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Processing queue: a fixed pool of worker threads running jobs.
//!
//! Job ids travel to workers over a FIFO `crossbeam_channel`. Every status
//! and progress mutation goes through one `parking_lot::Mutex` guarding the
//! job table; engine work runs outside that lock. Status and progress
//! changes are broadcast to subscribers as [`QueueEvent`]s.

pub mod batch;
pub mod config;
pub mod job;

use std::collections::HashMap;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::raster::CarrierImage;
use crate::stego::capacity;
use crate::stego::config::{EmbedConfig, ExtractConfig};
use crate::stego::error::StegoError;
use crate::stego::payload::Payload;
use crate::stego::progress::{fraction_at, CancelToken, Phase, PhaseObserver};

pub use batch::{BatchCoordinator, BatchCounts, BatchId, BatchItem, BatchItemResult, BatchOptions, BatchSummary};
pub use config::QueueConfig;
pub use job::{EmbedArtifact, JobError, JobId, JobKind, JobOutcome, JobSnapshot, JobStatus};

use job::{ImageSource, Job, JobInput};

/// Errors returned by queue operations. Engine failures of a running job are
/// recorded on the job instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
    #[error("unknown job {0}")]
    UnknownJob(JobId),
    #[error("unknown batch {0}")]
    UnknownBatch(BatchId),
    #[error("{0} is {1:?} and cannot be retried")]
    NotRetryable(JobId, JobStatus),
    /// Submission refused before a job was created.
    #[error("submission rejected: {0}")]
    Rejected(#[from] StegoError),
    #[error("queue is shut down")]
    ShutDown,
}

/// Broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// A job entered `phase`; `progress` is the fraction done before it.
    Progress { job: JobId, phase: Phase, progress: f32 },
    /// A job was created or changed status.
    StatusChanged(JobSnapshot),
}

struct QueueState {
    jobs: HashMap<JobId, Job>,
    next_id: u64,
    dispatch: Option<Sender<JobId>>,
    subscribers: Vec<Sender<QueueEvent>>,
}

impl QueueState {
    fn emit(&mut self, event: QueueEvent) {
        self.subscribers.retain(|s| s.send(event.clone()).is_ok());
    }

    fn emit_status(&mut self, id: JobId) {
        if let Some(job) = self.jobs.get(&id) {
            let snapshot = job.state.clone();
            self.emit(QueueEvent::StatusChanged(snapshot));
        }
    }
}

struct Shared {
    config: QueueConfig,
    state: Mutex<QueueState>,
    changed: Condvar,
}

/// Cloneable access to a queue's jobs. Does not own the workers.
#[derive(Clone)]
pub struct QueueHandle {
    shared: Arc<Shared>,
}

/// Owns the worker threads; dereferences to [`QueueHandle`] for all job
/// operations. Dropping it shuts the queue down.
pub struct ProcessingQueue {
    handle: QueueHandle,
    workers: Vec<JoinHandle<()>>,
}

impl ProcessingQueue {
    /// Spawn `config.workers` worker threads.
    ///
    /// # Errors
    /// [`QueueError::Rejected`] with `InvalidConfig` for an invalid config.
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        let (tx, rx) = unbounded::<JobId>();
        let shared = Arc::new(Shared {
            config: config.clone(),
            state: Mutex::new(QueueState {
                jobs: HashMap::new(),
                next_id: 1,
                dispatch: Some(tx),
                subscribers: Vec::new(),
            }),
            changed: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(config.workers);
        for id in 0..config.workers {
            let shared = Arc::clone(&shared);
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("stegforge-worker-{id}"))
                .spawn(move || worker_loop(id, &shared, &rx))
                .map_err(|e| StegoError::InternalCodecFault(format!("spawn worker: {e}")))?;
            workers.push(handle);
        }
        info!("processing queue started with {} workers", config.workers);
        Ok(Self { handle: QueueHandle { shared }, workers })
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    /// Stop accepting jobs, cancel pending ones, let running jobs finish and
    /// join the workers. Subscribers are disconnected afterwards.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.handle.shared.state.lock();
            if state.dispatch.take().is_none() && self.workers.is_empty() {
                return;
            }
            let pending: Vec<JobId> = state
                .jobs
                .values()
                .filter(|j| j.state.status == JobStatus::Pending)
                .map(|j| j.state.id)
                .collect();
            for id in pending {
                if let Some(job) = state.jobs.get_mut(&id) {
                    job.transition(JobStatus::Cancelled);
                }
                state.emit_status(id);
            }
        }
        self.handle.shared.changed.notify_all();

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("worker thread panicked outside a job");
            }
        }
        self.handle.shared.state.lock().subscribers.clear();
        info!("processing queue shut down");
    }
}

impl Deref for ProcessingQueue {
    type Target = QueueHandle;

    fn deref(&self) -> &QueueHandle {
        &self.handle
    }
}

impl Drop for ProcessingQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl QueueHandle {
    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Stream of queue events from now on.
    pub fn subscribe(&self) -> Receiver<QueueEvent> {
        let (tx, rx) = unbounded();
        self.shared.state.lock().subscribers.push(tx);
        rx
    }

    /// Submit an embed job. The carrier is decoded and the capacity checked
    /// synchronously; nothing is queued if either fails.
    ///
    /// # Errors
    /// [`QueueError::Rejected`] with the engine error (`PayloadTooLarge`,
    /// `UnsupportedFormat`, `InvalidConfig`, ...), or [`QueueError::ShutDown`].
    pub fn submit_embed(
        &self,
        carrier: &[u8],
        payload: Payload,
        config: EmbedConfig,
    ) -> Result<JobId, QueueError> {
        let image = CarrierImage::decode(carrier)?;
        capacity::check(&image, &config, payload.len())?;
        self.enqueue(
            JobInput::Embed {
                carrier: ImageSource::Decoded(Arc::new(image)),
                payload: Arc::new(payload),
                config: Arc::new(config),
            },
            None,
        )
    }

    /// Submit an extract job.
    pub fn submit_extract(&self, image: Vec<u8>, config: ExtractConfig) -> Result<JobId, QueueError> {
        self.enqueue(
            JobInput::Extract { image: ImageSource::Encoded(Arc::new(image)), config: Arc::new(config) },
            None,
        )
    }

    /// Queue without submit-time checks; failures surface on the job.
    pub(crate) fn enqueue(&self, input: JobInput, retry_of: Option<JobId>) -> Result<JobId, QueueError> {
        self.purge_expired();
        let mut state = self.shared.state.lock();
        let Some(dispatch) = state.dispatch.clone() else {
            return Err(QueueError::ShutDown);
        };
        let id = JobId(state.next_id);
        state.next_id += 1;
        let kind = input.kind();
        state.jobs.insert(id, Job::new(id, input, retry_of));
        if dispatch.send(id).is_err() {
            state.jobs.remove(&id);
            return Err(QueueError::ShutDown);
        }
        state.emit_status(id);
        debug!("{id} queued ({kind:?})");
        Ok(id)
    }

    pub fn get_job(&self, id: JobId) -> Result<JobSnapshot, QueueError> {
        let state = self.shared.state.lock();
        state.jobs.get(&id).map(|j| j.state.clone()).ok_or(QueueError::UnknownJob(id))
    }

    /// Snapshots of all retained jobs, by id.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let state = self.shared.state.lock();
        let mut all: Vec<JobSnapshot> = state.jobs.values().map(|j| j.state.clone()).collect();
        all.sort_by_key(|s| s.id);
        all
    }

    /// Block until the job is terminal or `timeout` elapses, then return its
    /// snapshot. Check `status.is_terminal()` to tell the two apart.
    pub fn wait(&self, id: JobId, timeout: Duration) -> Result<JobSnapshot, QueueError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        loop {
            let snapshot = state.jobs.get(&id).map(|j| j.state.clone()).ok_or(QueueError::UnknownJob(id))?;
            if snapshot.status.is_terminal() {
                return Ok(snapshot);
            }
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                return state.jobs.get(&id).map(|j| j.state.clone()).ok_or(QueueError::UnknownJob(id));
            }
        }
    }

    /// Request cancellation. A pending job is cancelled at once; a running job
    /// stops at its next phase boundary and never completes. Returns false if
    /// the job was already terminal.
    pub fn cancel(&self, id: JobId) -> Result<bool, QueueError> {
        let mut state = self.shared.state.lock();
        let job = state.jobs.get_mut(&id).ok_or(QueueError::UnknownJob(id))?;
        match job.state.status {
            JobStatus::Pending => {
                job.cancel.cancel();
                job.transition(JobStatus::Cancelled);
                state.emit_status(id);
                drop(state);
                self.shared.changed.notify_all();
                debug!("{id} cancelled while pending");
                Ok(true)
            }
            JobStatus::Running => {
                job.cancel.cancel();
                debug!("{id} cancellation requested");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Re-run a terminal job as a new job with the same input and config.
    /// The original job is left untouched.
    pub fn retry(&self, id: JobId) -> Result<JobId, QueueError> {
        let input = {
            let state = self.shared.state.lock();
            let job = state.jobs.get(&id).ok_or(QueueError::UnknownJob(id))?;
            if !job.state.status.is_terminal() {
                return Err(QueueError::NotRetryable(id, job.state.status));
            }
            job.input.clone()
        };
        let new_id = self.enqueue(input, Some(id))?;
        info!("{id} retried as {new_id}");
        Ok(new_id)
    }

    /// Drop all terminal jobs. Returns how many were removed.
    pub fn clear_finished(&self) -> usize {
        let mut state = self.shared.state.lock();
        let before = state.jobs.len();
        state.jobs.retain(|_, j| !j.state.status.is_terminal());
        before - state.jobs.len()
    }

    /// Drop terminal jobs that finished more than `job_ttl_secs` ago.
    pub fn purge_expired(&self) -> usize {
        let ttl = chrono::Duration::seconds(self.shared.config.job_ttl_secs as i64);
        let cutoff = Utc::now() - ttl;
        let mut state = self.shared.state.lock();
        let before = state.jobs.len();
        state.jobs.retain(|_, j| !matches!(j.state.finished_at, Some(t) if t <= cutoff));
        let purged = before - state.jobs.len();
        if purged > 0 {
            debug!("purged {purged} expired jobs");
        }
        purged
    }

    /// Pending → Running. `None` if the job was cancelled or removed while
    /// waiting in the channel.
    fn start(&self, id: JobId) -> Option<(JobInput, CancelToken)> {
        let mut state = self.shared.state.lock();
        let job = state.jobs.get_mut(&id)?;
        if !job.transition(JobStatus::Running) {
            return None;
        }
        let started = (job.input.clone(), job.cancel.clone());
        state.emit_status(id);
        Some(started)
    }

    fn record_phase(&self, id: JobId, phase: Phase) {
        let mut state = self.shared.state.lock();
        let Some(job) = state.jobs.get_mut(&id) else { return };
        let progress = fraction_at(phase, job.state.kind.phases()).max(job.state.progress);
        job.state.progress = progress;
        job.state.phase = Some(phase);
        state.emit(QueueEvent::Progress { job: id, phase, progress });
    }

    /// Running → terminal. A job whose cancel flag is set ends Cancelled
    /// regardless of its result.
    fn finish(&self, id: JobId, result: Result<JobOutcome, StegoError>) {
        let mut state = self.shared.state.lock();
        let Some(job) = state.jobs.get_mut(&id) else { return };
        let status = match result {
            _ if job.cancel.is_cancelled() => JobStatus::Cancelled,
            Ok(outcome) => {
                job.state.outcome = Some(Arc::new(outcome));
                JobStatus::Completed
            }
            Err(StegoError::Cancelled) => JobStatus::Cancelled,
            Err(e) => {
                warn!("{id} failed: {e}");
                job.state.error = Some(JobError::from(&e));
                JobStatus::Failed
            }
        };
        job.transition(status);
        debug!("{id} finished: {status:?}");
        state.emit_status(id);
        drop(state);
        self.shared.changed.notify_all();
    }
}

/// Phase observer bound to one running job.
struct JobObserver<'a> {
    queue: &'a QueueHandle,
    id: JobId,
    cancel: CancelToken,
}

impl PhaseObserver for JobObserver<'_> {
    fn checkpoint(&self, phase: Phase) -> Result<(), StegoError> {
        self.cancel.check()?;
        self.queue.record_phase(self.id, phase);
        Ok(())
    }
}

fn worker_loop(worker: usize, shared: &Arc<Shared>, jobs: &Receiver<JobId>) {
    let queue = QueueHandle { shared: Arc::clone(shared) };
    while let Ok(id) = jobs.recv() {
        let Some((input, cancel)) = queue.start(id) else {
            continue;
        };
        debug!("worker {worker} running {id}");
        let observer = JobObserver { queue: &queue, id, cancel };
        let result = panic::catch_unwind(AssertUnwindSafe(|| job::run(&input, &observer)))
            .unwrap_or_else(|panic| Err(StegoError::InternalCodecFault(panic_message(panic.as_ref()))));
        queue.finish(id, result);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "codec panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_messages() {
        let p = panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "boom");
        let p = panic::catch_unwind(|| panic!("{}", 42)).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "42");
    }

    #[test]
    fn invalid_config_rejected() {
        let res = ProcessingQueue::new(QueueConfig::default().with_workers(0));
        assert!(matches!(res, Err(QueueError::Rejected(StegoError::InvalidConfig(_)))));
    }

    #[test]
    fn shutdown_refuses_new_jobs() {
        let mut queue = ProcessingQueue::new(QueueConfig::default().with_workers(1)).unwrap();
        queue.shutdown();
        let res = queue.submit_extract(vec![1, 2, 3], ExtractConfig::auto());
        assert_eq!(res, Err(QueueError::ShutDown));
        // Idempotent.
        queue.shutdown();
    }

    #[test]
    fn unknown_job() {
        let queue = ProcessingQueue::new(QueueConfig::default().with_workers(1)).unwrap();
        assert_eq!(queue.get_job(JobId(99)), Err(QueueError::UnknownJob(JobId(99))));
        assert_eq!(queue.cancel(JobId(99)), Err(QueueError::UnknownJob(JobId(99))));
    }
}
