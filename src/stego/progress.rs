// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Phase-boundary progress and cooperative cancellation.
//!
//! The engine reports coarse phases, never per-pixel progress. Before each
//! phase it calls [`PhaseObserver::checkpoint`]; an observer that returns
//! `Err(StegoError::Cancelled)` aborts the operation at that boundary, so
//! cancellation latency is bounded by one phase.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::StegoError;

/// Coarse processing phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Carrier bytes are decoded into pixels.
    Decode,
    CapacityCheck,
    /// Envelope, encryption and digest (embed) or decryption (extract).
    Cipher,
    /// Copy layout (embed) or majority-vote reconciliation (extract).
    Redundancy,
    /// Strategy embed or extract over the pixels.
    Codec,
    /// Digest verification.
    Integrity,
}

/// Phase order of an embed job.
pub const EMBED_PHASES: [Phase; 5] =
    [Phase::Decode, Phase::CapacityCheck, Phase::Cipher, Phase::Redundancy, Phase::Codec];

/// Phase order of an extract job.
pub const EXTRACT_PHASES: [Phase; 5] =
    [Phase::Decode, Phase::Codec, Phase::Redundancy, Phase::Integrity, Phase::Cipher];

/// Fraction of work done when `phase` starts, given a phase order.
pub fn fraction_at(phase: Phase, order: &[Phase]) -> f32 {
    match order.iter().position(|&p| p == phase) {
        Some(i) if !order.is_empty() => i as f32 / order.len() as f32,
        _ => 0.0,
    }
}

/// Receives phase boundaries from the engine.
pub trait PhaseObserver {
    /// Called before `phase` starts. Returning an error aborts the operation.
    fn checkpoint(&self, phase: Phase) -> Result<(), StegoError>;
}

/// Observer that never cancels and discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unobserved;

impl PhaseObserver for Unobserved {
    fn checkpoint(&self, _phase: Phase) -> Result<(), StegoError> {
        Ok(())
    }
}

/// Shared cancellation flag for one operation.
///
/// Uses atomics so it can be set from any thread while a worker runs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; honoured at the next phase boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Return `Err(StegoError::Cancelled)` if cancellation was requested.
    pub fn check(&self) -> Result<(), StegoError> {
        if self.is_cancelled() {
            Err(StegoError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl PhaseObserver for CancelToken {
    fn checkpoint(&self, _phase: Phase) -> Result<(), StegoError> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_are_monotonic() {
        let f: Vec<f32> = EMBED_PHASES.iter().map(|&p| fraction_at(p, &EMBED_PHASES)).collect();
        assert_eq!(f[0], 0.0);
        assert!(f.windows(2).all(|w| w[0] < w[1]));
        assert!(*f.last().unwrap() < 1.0);
    }

    #[test]
    fn unknown_phase_is_zero() {
        assert_eq!(fraction_at(Phase::Integrity, &EMBED_PHASES), 0.0);
    }

    #[test]
    fn cancel_token_trips_checkpoint() {
        let token = CancelToken::new();
        assert!(token.checkpoint(Phase::Codec).is_ok());
        token.clone().cancel();
        assert!(matches!(token.checkpoint(Phase::Codec), Err(StegoError::Cancelled)));
    }
}
