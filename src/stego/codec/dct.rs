// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Block DCT mid-band quantisation.
//!
//! Unit `u` is one full 8×8 block of the luma plane, aligned with the JPEG
//! block grid. The bit is carried by QIM on a single mid-frequency
//! coefficient.
//!
//! Exactness: a QIM move of at most `step/2 = 12` on a coefficient with
//! basis amplitude at most 1/4 moves any pixel by at most 3, so the block is
//! first clamped into `[3, 252]` and never saturates. Rounding the output to
//! integers perturbs each pixel's luma by at most 0.5 (the weights sum to
//! 1), so the carrier coefficient moves by at most `0.5 × Σ|basis| ≈ 3.35`,
//! below the `step/4 = 6` decoding margin.

use crate::raster::transform::{dct_8x8, idct_8x8};
use crate::raster::CarrierImage;

use super::{cell_units, qim_decode, qim_embed, read_cell, write_cell};

const BLOCK: usize = 8;

/// Default quantisation step.
pub const DCT_STEP: f64 = 24.0;
/// Pixel headroom required by [`DCT_STEP`].
pub const DCT_MARGIN: f64 = 3.0;
/// Carrier coefficient (row 2, column 3) in natural order.
pub const DCT_COEFF: usize = 2 * BLOCK + 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dct {
    step: f64,
    margin: f64,
}

impl Default for Dct {
    fn default() -> Self {
        Self { step: DCT_STEP, margin: DCT_MARGIN }
    }
}

impl Dct {
    pub fn unit_count(&self, carrier: &CarrierImage) -> usize {
        cell_units(carrier, BLOCK)
    }

    pub(crate) fn embed_unit(&self, carrier: &CarrierImage, samples: &mut [u8], unit: usize, bit: u8) {
        let cell = read_cell(carrier, samples, unit, BLOCK, self.margin);
        let mut block = [0.0f64; 64];
        block.copy_from_slice(&cell.luma);

        let mut coeffs = dct_8x8(&block);
        coeffs[DCT_COEFF] = qim_embed(coeffs[DCT_COEFF], bit, self.step);
        let pixels = idct_8x8(&coeffs);
        write_cell(carrier, samples, &cell, &pixels);
    }

    pub(crate) fn extract_unit(&self, image: &CarrierImage, unit: usize) -> u8 {
        let cell = read_cell(image, image.samples(), unit, BLOCK, 0.0);
        let mut block = [0.0f64; 64];
        block.copy_from_slice(&cell.luma);
        qim_decode(dct_8x8(&block)[DCT_COEFF], self.step)
    }
}
