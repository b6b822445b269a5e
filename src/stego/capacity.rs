// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Capacity model.
//!
//! The capacity is the largest payload (raw bytes, before compression) that
//! an embed with the given config is guaranteed to accept:
//!
//! ```text
//! floor((units - HEADER_BITS) / 8 / redundancy) - frame_overhead
//! ```
//!
//! saturating at 0. The frame overhead counts the envelope flags byte, the
//! cipher's salt, nonce and tag when encrypted, and the digest when enabled.
//! Compression is never assumed; it can only shrink the frame.

use serde::{Deserialize, Serialize};

use crate::raster::CarrierImage;
use crate::stego::codec::Codec;
use crate::stego::config::{Algorithm, EmbedConfig};
use crate::stego::crypto::CIPHER_OVERHEAD;
use crate::stego::error::StegoError;
use crate::stego::frame::HEADER_BITS;
use crate::stego::integrity::DIGEST_LEN;
use crate::stego::payload::{encode_envelope, Payload, ENVELOPE_OVERHEAD};

/// Embedding units the carrier offers to `algorithm`.
pub fn unit_count(carrier: &CarrierImage, algorithm: Algorithm) -> usize {
    Codec::for_algorithm(algorithm).unit_count(carrier)
}

/// Bytes added to the payload before replication.
pub fn frame_overhead(config: &EmbedConfig) -> usize {
    let mut overhead = ENVELOPE_OVERHEAD;
    if config.is_encrypted() {
        overhead += CIPHER_OVERHEAD;
    }
    if config.content_hash() {
        overhead += DIGEST_LEN;
    }
    overhead
}

/// Frame bytes one copy may occupy, before overhead.
fn frame_budget(carrier: &CarrierImage, config: &EmbedConfig) -> Result<usize, StegoError> {
    config.validate()?;
    let units = unit_count(carrier, config.algorithm());
    let budget = units.saturating_sub(HEADER_BITS) / 8 / config.redundancy() as usize;
    // The header stores the frame length as a u32.
    Ok(budget.min(u32::MAX as usize))
}

/// Maximum payload size in bytes for `config` on `carrier`.
///
/// # Errors
/// [`StegoError::InvalidConfig`] if the config is invalid.
pub fn capacity(carrier: &CarrierImage, config: &EmbedConfig) -> Result<usize, StegoError> {
    Ok(frame_budget(carrier, config)?.saturating_sub(frame_overhead(config)))
}

/// Reject a payload that does not fit. Returns the capacity on success.
///
/// A carrier too small for the overhead alone rejects even an empty payload.
///
/// # Errors
/// [`StegoError::PayloadTooLarge`] if the payload does not fit.
pub fn check(carrier: &CarrierImage, config: &EmbedConfig, payload_len: usize) -> Result<usize, StegoError> {
    let budget = frame_budget(carrier, config)?;
    let overhead = frame_overhead(config);
    let capacity = budget.saturating_sub(overhead);
    if payload_len.saturating_add(overhead) > budget {
        return Err(StegoError::PayloadTooLarge { size: payload_len, capacity });
    }
    Ok(capacity)
}

/// Frame size in bytes the payload would occupy, after optional compression
/// and before replication.
pub fn encoded_payload_size(payload: &Payload, config: &EmbedConfig) -> usize {
    let envelope = encode_envelope(payload, config.compress()).len();
    frame_overhead(config) - ENVELOPE_OVERHEAD + envelope
}

/// Capacity of one carrier under each strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub width: u32,
    pub height: u32,
    pub entries: Vec<CapacityEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityEntry {
    pub algorithm: Algorithm,
    pub units: usize,
    pub capacity: usize,
}

impl CapacityReport {
    pub fn get(&self, algorithm: Algorithm) -> Option<&CapacityEntry> {
        self.entries.iter().find(|e| e.algorithm == algorithm)
    }
}

/// Capacity for every strategy, keeping the other config options fixed.
///
/// # Errors
/// [`StegoError::InvalidConfig`] if the config is invalid.
pub fn capacity_report(carrier: &CarrierImage, config: &EmbedConfig) -> Result<CapacityReport, StegoError> {
    let entries = Algorithm::DETECT_ORDER
        .iter()
        .map(|&algorithm| {
            let cfg = config.for_algorithm(algorithm);
            Ok(CapacityEntry {
                algorithm,
                units: unit_count(carrier, algorithm),
                capacity: capacity(carrier, &cfg)?,
            })
        })
        .collect::<Result<Vec<_>, StegoError>>()?;
    Ok(CapacityReport { width: carrier.width(), height: carrier.height(), entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::ChannelLayout;
    use crate::stego::config::Passphrase;

    fn rgb(w: u32, h: u32) -> CarrierImage {
        CarrierImage::from_raw(w, h, ChannelLayout::Rgb, vec![128; (w * h * 3) as usize]).unwrap()
    }

    #[test]
    fn lsb_plain() {
        let carrier = rgb(64, 64);
        let cfg = EmbedConfig::new(Algorithm::Lsb);
        // (12288 - 240) / 8 = 1506 frame bytes, minus the envelope byte.
        assert_eq!(capacity(&carrier, &cfg).unwrap(), 1505);
    }

    #[test]
    fn redundancy_divides_and_overhead_subtracts() {
        let carrier = rgb(64, 64);
        let cfg = EmbedConfig::new(Algorithm::Lsb)
            .with_redundancy(3)
            .with_encryption(Passphrase::new("k"))
            .with_content_hash(true);
        assert_eq!(frame_overhead(&cfg), 1 + 44 + 32);
        assert_eq!(capacity(&carrier, &cfg).unwrap(), 1506 / 3 - 77);
    }

    #[test]
    fn tiny_carrier_saturates_at_zero() {
        let carrier = rgb(8, 8);
        for algorithm in Algorithm::DETECT_ORDER {
            let cfg = EmbedConfig::new(algorithm).with_encryption(Passphrase::new("k"));
            assert_eq!(capacity(&carrier, &cfg).unwrap(), 0, "{algorithm}");
        }
    }

    #[test]
    fn check_rejects_oversized() {
        let carrier = rgb(64, 64);
        let cfg = EmbedConfig::new(Algorithm::Lsb);
        assert_eq!(check(&carrier, &cfg, 1505).unwrap(), 1505);
        assert_eq!(
            check(&carrier, &cfg, 1506),
            Err(StegoError::PayloadTooLarge { size: 1506, capacity: 1505 })
        );
    }

    #[test]
    fn overhead_alone_can_overflow() {
        // 16×16 RGB: (768 - 240) / 8 = 66 frame bytes < 77 bytes of overhead.
        let cfg = EmbedConfig::new(Algorithm::Lsb)
            .with_encryption(Passphrase::new("k"))
            .with_content_hash(true);
        assert_eq!(capacity(&rgb(16, 16), &cfg).unwrap(), 0);
        assert!(matches!(check(&rgb(16, 16), &cfg, 0), Err(StegoError::PayloadTooLarge { .. })));
    }

    #[test]
    fn invalid_config_surfaces() {
        let cfg = EmbedConfig::new(Algorithm::Dct).with_redundancy(0);
        assert!(matches!(capacity(&rgb(64, 64), &cfg), Err(StegoError::InvalidConfig(_))));
    }

    #[test]
    fn report_orders_strategies() {
        let report = capacity_report(&rgb(256, 256), &EmbedConfig::new(Algorithm::Lsb)).unwrap();
        let caps: Vec<usize> = report.entries.iter().map(|e| e.capacity).collect();
        assert!(caps[0] > caps[1] && caps[1] > caps[2], "{caps:?}");
        // 32×32 luma blocks.
        assert_eq!(report.get(Algorithm::Dct).unwrap().units, 1024);
        assert_eq!(report.get(Algorithm::Dct).unwrap().capacity, (1024 - 240) / 8 - 1);
        assert_eq!(report.get(Algorithm::Dwt).unwrap().units, 256);
    }

    #[test]
    fn encoded_size_tracks_frame() {
        let cfg = EmbedConfig::new(Algorithm::Lsb).with_content_hash(true);
        assert_eq!(encoded_payload_size(&Payload::text("abc"), &cfg), 1 + 3 + 32);
        let squeezed = EmbedConfig::new(Algorithm::Lsb).with_compression(true);
        let text = Payload::text("repeat ".repeat(200));
        assert!(encoded_payload_size(&text, &squeezed) < text.len());
    }
}
