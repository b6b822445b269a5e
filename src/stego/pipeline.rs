// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Embed and extract pipelines.
//!
//! Embed: capacity check → envelope (optional compression) → optional
//! encryption → optional digest → header + redundant copies → strategy.
//!
//! Extract: strategy reads the header prefix → header decides the stream
//! length → strategy reads the stream → majority reconciliation → digest
//! check → decryption → envelope.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::raster::quality::{self, QualityMetrics};
use crate::raster::{CarrierImage, StegoImage};
use crate::stego::capacity;
use crate::stego::codec::Codec;
use crate::stego::config::{Algorithm, EmbedConfig, ExtractConfig};
use crate::stego::crypto;
use crate::stego::error::{ErrorKind, StegoError};
use crate::stego::frame::{self, Header, HEADER_BITS};
use crate::stego::integrity;
use crate::stego::payload::{self, Payload};
use crate::stego::permute::traversal_seed;
use crate::stego::progress::{Phase, PhaseObserver};
use crate::stego::redundancy;

/// Result of a successful embed.
#[derive(Debug, Clone)]
pub struct EmbedOutcome {
    pub stego: StegoImage,
    pub algorithm: Algorithm,
    /// Raw payload bytes accepted.
    pub payload_bytes: usize,
    /// Frame bytes per copy after compression, encryption and digest.
    pub frame_bytes: usize,
    pub capacity: usize,
    pub quality: QualityMetrics,
}

/// Result of an extraction attempt that found an embedded header.
///
/// A failed integrity check is a result, not an error: `payload` is `None`,
/// `confidence` is 0 and `failure` names the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub payload: Option<Payload>,
    /// Fraction of redundant copies agreeing with the reconciled bits,
    /// averaged over bit positions. 1.0 for an untouched single copy.
    pub confidence: f64,
    pub algorithm: Option<Algorithm>,
    pub failure: Option<ErrorKind>,
}

impl ExtractionResult {
    fn rejected(algorithm: Algorithm, kind: ErrorKind) -> Self {
        Self { payload: None, confidence: 0.0, algorithm: Some(algorithm), failure: Some(kind) }
    }

    pub fn is_verified(&self) -> bool {
        self.payload.is_some()
    }
}

/// Embed `payload` into `carrier`.
///
/// # Errors
/// - [`StegoError::InvalidConfig`] for an invalid config.
/// - [`StegoError::PayloadTooLarge`] if the payload exceeds the capacity.
/// - [`StegoError::Cancelled`] if the observer aborts at a phase boundary.
pub fn embed(
    carrier: &CarrierImage,
    payload: &Payload,
    config: &EmbedConfig,
    observer: &dyn PhaseObserver,
) -> Result<EmbedOutcome, StegoError> {
    observer.checkpoint(Phase::CapacityCheck)?;
    let capacity = capacity::check(carrier, config, payload.len())?;

    observer.checkpoint(Phase::Cipher)?;
    let mut frame_data = payload::encode_envelope(payload, config.compress());
    if config.is_encrypted() {
        let key = config
            .key()
            .ok_or_else(|| StegoError::InvalidConfig("encryption enabled without a key".into()))?;
        frame_data = crypto::seal(&frame_data, key)?;
    }
    if config.content_hash() {
        frame_data = integrity::seal(frame_data);
    }

    observer.checkpoint(Phase::Redundancy)?;
    let frame_len = u32::try_from(frame_data.len())
        .map_err(|_| StegoError::PayloadTooLarge { size: payload.len(), capacity })?;
    let header = Header {
        algorithm: config.algorithm(),
        encrypted: config.is_encrypted(),
        digest: config.content_hash(),
        redundancy: config.redundancy(),
        frame_len,
    };
    let stream = frame::build_stream(&header, &frame_data);

    observer.checkpoint(Phase::Codec)?;
    let codec = Codec::for_algorithm(config.algorithm());
    let seed = traversal_seed(config.seed(), config.algorithm());
    let stego = codec.embed(carrier, &stream, &seed)?;
    let quality = quality::measure(carrier, stego.image());

    debug!(
        "embedded {} payload bytes ({} frame bytes x{}) with {}, capacity {}, PSNR {:.1} dB",
        payload.len(),
        frame_data.len(),
        config.redundancy(),
        config.algorithm(),
        capacity,
        quality.psnr_db
    );

    Ok(EmbedOutcome {
        stego,
        algorithm: config.algorithm(),
        payload_bytes: payload.len(),
        frame_bytes: frame_data.len(),
        capacity,
        quality,
    })
}

/// Extract a payload, trying the configured strategies in order.
///
/// The first strategy whose header verifies and whose frame authenticates
/// wins. If headers were found but none authenticated, the first such
/// rejection is returned as a result with `payload: None`.
///
/// # Errors
/// - [`StegoError::NoEmbeddingDetected`] if no strategy finds a valid header.
/// - [`StegoError::Cancelled`] if the observer aborts at a phase boundary.
pub fn extract(
    image: &CarrierImage,
    config: &ExtractConfig,
    observer: &dyn PhaseObserver,
) -> Result<ExtractionResult, StegoError> {
    let mut rejected: Option<ExtractionResult> = None;
    for algorithm in config.candidates() {
        match extract_with(image, algorithm, config, observer)? {
            None => debug!("no {algorithm} header found"),
            Some(result) if result.is_verified() => return Ok(result),
            Some(result) => {
                debug!("{algorithm} header found but frame rejected: {:?}", result.failure);
                rejected.get_or_insert(result);
            }
        }
    }
    rejected.ok_or(StegoError::NoEmbeddingDetected)
}

/// One strategy. `None` means no header for this strategy.
fn extract_with(
    image: &CarrierImage,
    algorithm: Algorithm,
    config: &ExtractConfig,
    observer: &dyn PhaseObserver,
) -> Result<Option<ExtractionResult>, StegoError> {
    observer.checkpoint(Phase::Codec)?;
    let codec = Codec::for_algorithm(algorithm);
    let seed = traversal_seed(config.seed(), algorithm);
    let units = codec.unit_count(image);
    if units < HEADER_BITS {
        return Ok(None);
    }

    let header = match frame::read_header(&codec.extract(image, &seed, HEADER_BITS)) {
        Some(h) if h.algorithm == algorithm => h,
        _ => return Ok(None),
    };
    let total = header.stream_bits();
    if total > units {
        // A CRC collision on noise can claim an impossible length.
        return Ok(None);
    }
    let stream = codec.extract(image, &seed, total);

    observer.checkpoint(Phase::Redundancy)?;
    let reconciled = redundancy::reconcile(
        &stream[HEADER_BITS..],
        header.frame_len as usize * 8,
        header.redundancy as usize,
    );
    let frame_data = frame::bits_to_bytes(&reconciled.bits);
    if reconciled.disputed > 0 {
        debug!("{algorithm}: {} disputed bits reconciled", reconciled.disputed);
    }

    observer.checkpoint(Phase::Integrity)?;
    let body = if header.digest {
        match integrity::verify(&frame_data) {
            Some(body) => body,
            None => return Ok(Some(ExtractionResult::rejected(algorithm, ErrorKind::AuthenticationFailure))),
        }
    } else {
        &frame_data[..]
    };

    observer.checkpoint(Phase::Cipher)?;
    let envelope = if header.encrypted {
        let Some(key) = config.key() else {
            return Ok(Some(ExtractionResult::rejected(algorithm, ErrorKind::AuthenticationFailure)));
        };
        match crypto::open(body, key) {
            Ok(plain) => plain,
            Err(StegoError::AuthenticationFailure) => {
                return Ok(Some(ExtractionResult::rejected(algorithm, ErrorKind::AuthenticationFailure)))
            }
            Err(e) => return Err(e),
        }
    } else {
        body.to_vec()
    };

    let payload = match payload::decode_envelope(&envelope) {
        Ok(p) => p,
        Err(e) => return Ok(Some(ExtractionResult::rejected(algorithm, e.kind()))),
    };

    Ok(Some(ExtractionResult {
        payload: Some(payload),
        confidence: reconciled.agreement,
        algorithm: Some(algorithm),
        failure: None,
    }))
}
