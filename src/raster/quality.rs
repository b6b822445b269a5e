// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Carrier vs. stego quality metrics reported at the export boundary.

use serde::{Deserialize, Serialize};

use super::CarrierImage;

/// PSNR reported for bit-identical images.
pub const PSNR_CAP_DB: f64 = 100.0;

/// Deterministic quality summary of a stego image against its carrier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Peak signal-to-noise ratio over colour samples, in dB.
    pub psnr_db: f64,
    /// Largest absolute per-sample difference.
    pub max_abs_delta: u8,
    /// Fraction of colour samples that changed.
    pub changed_ratio: f64,
}

/// Compare two same-shaped images over their colour samples.
pub fn measure(carrier: &CarrierImage, stego: &CarrierImage) -> QualityMetrics {
    debug_assert_eq!(carrier.samples().len(), stego.samples().len());
    let channels = carrier.layout().channels();
    let color = carrier.layout().color_channels();

    let mut sq_sum = 0u64;
    let mut max_abs_delta = 0u8;
    let mut changed = 0usize;
    let mut counted = 0usize;
    for (i, (&a, &b)) in carrier.samples().iter().zip(stego.samples()).enumerate() {
        if i % channels >= color {
            continue;
        }
        let d = a.abs_diff(b);
        sq_sum += u64::from(d) * u64::from(d);
        max_abs_delta = max_abs_delta.max(d);
        if d != 0 {
            changed += 1;
        }
        counted += 1;
    }

    if counted == 0 || sq_sum == 0 {
        return QualityMetrics { psnr_db: PSNR_CAP_DB, max_abs_delta, changed_ratio: 0.0 };
    }

    let mse = sq_sum as f64 / counted as f64;
    let psnr = 10.0 * (255.0f64 * 255.0 / mse).log10();
    QualityMetrics {
        psnr_db: psnr.min(PSNR_CAP_DB),
        max_abs_delta,
        changed_ratio: changed as f64 / counted as f64,
    }
}
