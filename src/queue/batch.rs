// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Batch coordinator: groups jobs into one logical run.
//!
//! A watcher thread follows the queue's event stream, records each member's
//! latest status and finalises a batch once every member is terminal.
//! Member failures are normal; only `fail_fast` cancels the siblings.
//!
//! The coordinator never holds job outcomes itself: summaries read them from
//! the queue, so a job removed by `clear_finished` or the TTL purge takes its
//! artifact with it. Finalised batches expire after the queue's
//! `job_ttl_secs`.

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::job::{ImageSource, JobInput};
use super::{JobError, JobId, JobOutcome, JobSnapshot, JobStatus, QueueError, QueueEvent, QueueHandle};
use crate::stego::config::{EmbedConfig, ExtractConfig};
use crate::stego::payload::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

/// One image + config pair.
#[derive(Debug, Clone)]
pub enum BatchItem {
    Embed { carrier: Vec<u8>, payload: Payload, config: EmbedConfig },
    Extract { image: Vec<u8>, config: ExtractConfig },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Cancel the remaining members after the first failure.
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchCounts {
    pub fn terminal(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }
}

/// Latest known state of one member, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemResult {
    pub index: usize,
    pub job: JobId,
    pub status: JobStatus,
    /// Read from the queue; `None` once the job has been cleared or purged.
    #[serde(skip)]
    pub outcome: Option<Arc<JobOutcome>>,
    pub error: Option<JobError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub id: BatchId,
    pub counts: BatchCounts,
    pub items: Vec<BatchItemResult>,
    pub finalized: bool,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

struct BatchRun {
    id: BatchId,
    options: BatchOptions,
    items: Vec<BatchItemResult>,
    created_at: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
}

impl BatchRun {
    fn counts(&self) -> BatchCounts {
        let mut counts = BatchCounts { total: self.items.len(), ..BatchCounts::default() };
        for item in &self.items {
            match item.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Completed => counts.succeeded += 1,
                JobStatus::Failed => counts.failed += 1,
                JobStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    fn summary(&self) -> BatchSummary {
        BatchSummary {
            id: self.id,
            counts: self.counts(),
            items: self.items.clone(),
            finalized: self.finalized_at.is_some(),
            created_at: self.created_at,
            finalized_at: self.finalized_at,
        }
    }
}

#[derive(Default)]
struct BatchTable {
    runs: HashMap<BatchId, BatchRun>,
    /// Member job → (batch, item index).
    members: HashMap<JobId, (BatchId, usize)>,
    next_id: u64,
}

struct Shared {
    table: Mutex<BatchTable>,
    finalized: Condvar,
}

/// Submits batches to a queue and tracks them to completion.
///
/// The watcher thread exits when the coordinator is dropped or the queue
/// shuts down. Its queue subscription is released with it.
pub struct BatchCoordinator {
    queue: QueueHandle,
    shared: Arc<Shared>,
    stop: Option<Sender<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl BatchCoordinator {
    pub fn new(queue: QueueHandle) -> Self {
        let shared = Arc::new(Shared { table: Mutex::new(BatchTable::default()), finalized: Condvar::new() });
        let events = queue.subscribe();
        // Never sent on; dropping the sender is the stop signal.
        let (stop, stopped) = bounded::<()>(0);
        let watcher_shared = Arc::clone(&shared);
        let watcher_queue = queue.clone();
        let watcher = thread::spawn(move || watch(&watcher_queue, &watcher_shared, &events, &stopped));
        Self { queue, shared, stop: Some(stop), watcher: Some(watcher) }
    }

    /// Create one job per item. Items are not capacity-checked up front: an
    /// oversized item becomes a failed member.
    ///
    /// # Errors
    /// [`QueueError::ShutDown`] if the queue no longer accepts jobs. Members
    /// already queued are cancelled.
    pub fn submit_batch(&self, items: Vec<BatchItem>, options: BatchOptions) -> Result<BatchId, QueueError> {
        self.purge_expired();
        // Held across submission so the watcher cannot see a member's events
        // before the member is registered.
        let mut table = self.shared.table.lock();
        let id = BatchId(table.next_id);
        table.next_id += 1;

        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match self.queue.enqueue(to_input(item), None) {
                Ok(job) => results.push(BatchItemResult {
                    index,
                    job,
                    status: JobStatus::Pending,
                    outcome: None,
                    error: None,
                }),
                Err(e) => {
                    for queued in &results {
                        let _ = self.queue.cancel(queued.job);
                    }
                    return Err(e);
                }
            }
        }
        for item in &results {
            table.members.insert(item.job, (id, item.index));
        }
        let mut run = BatchRun { id, options, items: results, created_at: Utc::now(), finalized_at: None };
        if run.items.is_empty() {
            run.finalized_at = Some(run.created_at);
        }
        info!("{id} submitted with {} items (fail_fast: {})", run.items.len(), options.fail_fast);
        table.runs.insert(id, run);
        Ok(id)
    }

    pub fn get_batch(&self, id: BatchId) -> Result<BatchSummary, QueueError> {
        let summary = {
            let table = self.shared.table.lock();
            table.runs.get(&id).map(BatchRun::summary).ok_or(QueueError::UnknownBatch(id))?
        };
        Ok(self.with_outcomes(summary))
    }

    /// Block until the batch is finalised or `timeout` elapses, then return
    /// its summary.
    pub fn wait_batch(&self, id: BatchId, timeout: Duration) -> Result<BatchSummary, QueueError> {
        let deadline = Instant::now() + timeout;
        let summary = {
            let mut table = self.shared.table.lock();
            loop {
                let run = table.runs.get(&id).ok_or(QueueError::UnknownBatch(id))?;
                if run.finalized_at.is_some() {
                    break run.summary();
                }
                if self.shared.finalized.wait_until(&mut table, deadline).timed_out() {
                    break table.runs.get(&id).map(BatchRun::summary).ok_or(QueueError::UnknownBatch(id))?;
                }
            }
        };
        Ok(self.with_outcomes(summary))
    }

    /// Cancel every non-terminal member. Returns how many were signalled.
    pub fn cancel_batch(&self, id: BatchId) -> Result<usize, QueueError> {
        let jobs: Vec<JobId> = {
            let table = self.shared.table.lock();
            let run = table.runs.get(&id).ok_or(QueueError::UnknownBatch(id))?;
            run.items.iter().filter(|i| !i.status.is_terminal()).map(|i| i.job).collect()
        };
        let mut cancelled = 0;
        for job in jobs {
            if self.queue.cancel(job)? {
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    /// Forget a batch. Its jobs stay in the queue.
    pub fn remove_batch(&self, id: BatchId) -> Result<BatchSummary, QueueError> {
        let summary = {
            let mut table = self.shared.table.lock();
            let run = table.runs.remove(&id).ok_or(QueueError::UnknownBatch(id))?;
            for item in &run.items {
                table.members.remove(&item.job);
            }
            run.summary()
        };
        Ok(self.with_outcomes(summary))
    }

    /// Drop batches finalised more than the queue's `job_ttl_secs` ago.
    /// Also run on every submission.
    pub fn purge_expired(&self) -> usize {
        let ttl = chrono::Duration::seconds(self.queue.config().job_ttl_secs as i64);
        let cutoff = Utc::now() - ttl;
        let mut table = self.shared.table.lock();
        let expired: Vec<BatchId> = table
            .runs
            .values()
            .filter(|run| matches!(run.finalized_at, Some(t) if t <= cutoff))
            .map(|run| run.id)
            .collect();
        for id in &expired {
            if let Some(run) = table.runs.remove(id) {
                for item in &run.items {
                    table.members.remove(&item.job);
                }
            }
        }
        if !expired.is_empty() {
            debug!("purged {} expired batches", expired.len());
        }
        expired.len()
    }

    fn with_outcomes(&self, mut summary: BatchSummary) -> BatchSummary {
        for item in &mut summary.items {
            item.outcome = self.queue.get_job(item.job).ok().and_then(|job| job.outcome);
        }
        summary
    }
}

impl Drop for BatchCoordinator {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(watcher) = self.watcher.take() {
            if watcher.join().is_err() {
                warn!("batch watcher panicked");
            }
        }
    }
}

fn to_input(item: BatchItem) -> JobInput {
    match item {
        BatchItem::Embed { carrier, payload, config } => JobInput::Embed {
            carrier: ImageSource::Encoded(Arc::new(carrier)),
            payload: Arc::new(payload),
            config: Arc::new(config),
        },
        BatchItem::Extract { image, config } => JobInput::Extract {
            image: ImageSource::Encoded(Arc::new(image)),
            config: Arc::new(config),
        },
    }
}

fn watch(queue: &QueueHandle, shared: &Shared, events: &Receiver<QueueEvent>, stopped: &Receiver<()>) {
    loop {
        select! {
            recv(events) -> event => match event {
                Ok(QueueEvent::StatusChanged(snapshot)) => record(queue, shared, &snapshot),
                Ok(QueueEvent::Progress { .. }) => {}
                Err(_) => break,
            },
            recv(stopped) -> _ => break,
        }
    }
    debug!("batch watcher stopped");
}

fn record(queue: &QueueHandle, shared: &Shared, snapshot: &JobSnapshot) {
    let mut table = shared.table.lock();
    let Some(&(batch, index)) = table.members.get(&snapshot.id) else { return };
    let Some(run) = table.runs.get_mut(&batch) else { return };
    let Some(item) = run.items.get_mut(index) else { return };
    // Events for one job arrive in order; never step back from terminal.
    if item.status.is_terminal() {
        return;
    }
    item.status = snapshot.status;
    item.error = snapshot.error.clone();

    if snapshot.status == JobStatus::Failed && run.options.fail_fast {
        let siblings: Vec<JobId> =
            run.items.iter().filter(|i| !i.status.is_terminal()).map(|i| i.job).collect();
        if !siblings.is_empty() {
            info!("{batch} fail-fast: cancelling {} remaining items", siblings.len());
        }
        for job in siblings {
            // Emits events back into our own channel; handled after this one.
            let _ = queue.cancel(job);
        }
    }

    if run.finalized_at.is_none() && run.items.iter().all(|i| i.status.is_terminal()) {
        run.finalized_at = Some(Utc::now());
        let counts = run.counts();
        info!(
            "{batch} finalized: {} succeeded, {} failed, {} cancelled",
            counts.succeeded, counts.failed, counts.cancelled
        );
        shared.finalized.notify_all();
    }
}
