// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Jobs: one embed or extract call bound to one image and one config
//! snapshot.

use core::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::raster::quality::QualityMetrics;
use crate::raster::CarrierImage;
use crate::stego::config::{Algorithm, EmbedConfig, ExtractConfig};
use crate::stego::error::{ErrorKind, StegoError};
use crate::stego::payload::Payload;
use crate::stego::progress::{CancelToken, Phase, PhaseObserver, EMBED_PHASES, EXTRACT_PHASES};
use crate::stego::{embed, extract, ExtractionResult};

/// Queue-assigned job identifier, unique per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Embed,
    Extract,
}

impl JobKind {
    pub(crate) fn phases(self) -> &'static [Phase] {
        match self {
            Self::Embed => &EMBED_PHASES,
            Self::Extract => &EXTRACT_PHASES,
        }
    }
}

/// Job lifecycle. Transitions only move forward:
///
/// ```text
/// Pending → Running → Completed | Failed | Cancelled
/// Pending → Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Cancelled),
            Self::Running => next.is_terminal(),
            Self::Completed | Self::Failed | Self::Cancelled => false,
        }
    }
}

/// Image source of a job: raw bytes decoded by the worker, or a carrier
/// already decoded at submit time.
#[derive(Debug, Clone)]
pub(crate) enum ImageSource {
    Encoded(Arc<Vec<u8>>),
    Decoded(Arc<CarrierImage>),
}

impl ImageSource {
    fn load(&self) -> Result<Arc<CarrierImage>, StegoError> {
        match self {
            Self::Encoded(bytes) => CarrierImage::decode(bytes).map(Arc::new),
            Self::Decoded(image) => Ok(Arc::clone(image)),
        }
    }
}

/// Immutable job input. Cloning shares the buffers, so a retry reuses the
/// exact same image and config snapshot.
#[derive(Debug, Clone)]
pub(crate) enum JobInput {
    Embed { carrier: ImageSource, payload: Arc<Payload>, config: Arc<EmbedConfig> },
    Extract { image: ImageSource, config: Arc<ExtractConfig> },
}

impl JobInput {
    pub(crate) fn kind(&self) -> JobKind {
        match self {
            Self::Embed { .. } => JobKind::Embed,
            Self::Extract { .. } => JobKind::Extract,
        }
    }
}

/// Export bundle of a completed embed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedArtifact {
    /// Lossless PNG encoding of the stego image.
    pub png: Vec<u8>,
    pub algorithm: Algorithm,
    pub quality: QualityMetrics,
    pub bytes_embedded: usize,
    pub frame_bytes: usize,
    pub capacity: usize,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Embedded(EmbedArtifact),
    Extracted(ExtractionResult),
}

impl JobOutcome {
    pub fn as_embedded(&self) -> Option<&EmbedArtifact> {
        match self {
            Self::Embedded(a) => Some(a),
            Self::Extracted(_) => None,
        }
    }

    pub fn as_extracted(&self) -> Option<&ExtractionResult> {
        match self {
            Self::Extracted(r) => Some(r),
            Self::Embedded(_) => None,
        }
    }
}

/// Failure recorded on a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&StegoError> for JobError {
    fn from(e: &StegoError) -> Self {
        Self { kind: e.kind(), message: e.to_string() }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Coarse progress in `[0, 1]`; 1 only once terminal.
    pub progress: f32,
    pub phase: Option<Phase>,
    #[serde(skip)]
    pub outcome: Option<Arc<JobOutcome>>,
    pub error: Option<JobError>,
    pub retry_of: Option<JobId>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Queue-owned job record.
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) input: JobInput,
    pub(crate) cancel: CancelToken,
    pub(crate) state: JobSnapshot,
}

impl Job {
    pub(crate) fn new(id: JobId, input: JobInput, retry_of: Option<JobId>) -> Self {
        let kind = input.kind();
        Self {
            input,
            cancel: CancelToken::new(),
            state: JobSnapshot {
                id,
                kind,
                status: JobStatus::Pending,
                progress: 0.0,
                phase: None,
                outcome: None,
                error: None,
                retry_of,
                created_at: Utc::now(),
                started_at: None,
                finished_at: None,
            },
        }
    }

    /// Apply a status transition. Returns false (and changes nothing) if the
    /// transition would move backwards.
    pub(crate) fn transition(&mut self, next: JobStatus) -> bool {
        if !self.state.status.can_transition_to(next) {
            return false;
        }
        self.state.status = next;
        let now = Utc::now();
        if next == JobStatus::Running {
            self.state.started_at = Some(now);
        }
        if next.is_terminal() {
            self.state.finished_at = Some(now);
            self.state.progress = 1.0;
        }
        true
    }
}

/// Run a job's input through the engine.
pub(crate) fn run(input: &JobInput, observer: &dyn PhaseObserver) -> Result<JobOutcome, StegoError> {
    match input {
        JobInput::Embed { carrier, payload, config } => {
            observer.checkpoint(Phase::Decode)?;
            let carrier = carrier.load()?;
            let outcome = embed(&carrier, payload, config, observer)?;
            let png = outcome.stego.to_png()?;
            Ok(JobOutcome::Embedded(EmbedArtifact {
                png,
                algorithm: outcome.algorithm,
                quality: outcome.quality,
                bytes_embedded: outcome.payload_bytes,
                frame_bytes: outcome.frame_bytes,
                capacity: outcome.capacity,
                width: carrier.width(),
                height: carrier.height(),
            }))
        }
        JobInput::Extract { image, config } => {
            observer.checkpoint(Phase::Decode)?;
            let image = image.load()?;
            Ok(JobOutcome::Extracted(extract(&image, config, observer)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotonic() {
        use JobStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));
        assert!(!Running.can_transition_to(Pending));
        for terminal in [Completed, Failed, Cancelled] {
            for next in [Pending, Running, Completed, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn job_error_keeps_message() {
        let e = StegoError::PayloadTooLarge { size: 9, capacity: 3 };
        let je = JobError::from(&e);
        assert_eq!(je.kind, ErrorKind::PayloadTooLarge);
        assert_eq!(je.to_string(), e.to_string());
    }

    #[test]
    fn ids_display() {
        assert_eq!(JobId(7).to_string(), "job-7");
    }
}
