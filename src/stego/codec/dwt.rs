// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Haar wavelet detail sub-band spread embedding (STDM).
//!
//! Unit `u` is one full 16×16 tile of the luma plane. Two Haar levels leave
//! a 4×4 horizontal-detail band (HL2) of coarse structure that survives JPEG
//! quantisation. The bit is embedded by QIM on the projection of those 16
//! coefficients onto a keyed unit-norm spreading vector, and the correction
//! is spread back along that vector.
//!
//! Exactness: an HL2 coefficient covers a 4×4 pixel patch with weights
//! `±1/4`, and each spreading component is at most 1 in magnitude, so a
//! projection move of at most `step/2 = 24` moves pixels by at most 6. Tiles
//! are clamped into `[6, 249]` first. Integer rounding perturbs each HL2
//! coefficient by at most 2 and the projection by at most `2 × Σ|v_i| ≤ 8`,
//! below the `step/4 = 12` decoding margin.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::raster::transform::{haar_forward, haar_inverse};
use crate::raster::CarrierImage;

use super::{cell_units, qim_decode, qim_embed, read_cell, write_cell};

const TILE: usize = 16;
/// HL2 coefficients per tile.
pub const SPREAD_LEN: usize = (TILE / 4) * (TILE / 4);

/// Default quantisation step on the projection.
pub const DWT_STEP: f64 = 48.0;
/// Pixel headroom required by [`DWT_STEP`].
pub const DWT_MARGIN: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dwt {
    step: f64,
    margin: f64,
}

impl Default for Dwt {
    fn default() -> Self {
        Self { step: DWT_STEP, margin: DWT_MARGIN }
    }
}

impl Dwt {
    pub fn unit_count(&self, carrier: &CarrierImage) -> usize {
        cell_units(carrier, TILE)
    }

    pub(crate) fn embed_unit(
        &self,
        carrier: &CarrierImage,
        samples: &mut [u8],
        unit: usize,
        bit: u8,
        seed: &[u8; 32],
    ) {
        let cell = read_cell(carrier, samples, unit, TILE, self.margin);
        let mut fine = haar_forward(&cell.luma, TILE);
        let mut coarse = haar_forward(&fine.ll, TILE / 2);
        let v = spreading_vector(seed, unit);

        let p = project(&coarse.hl, &v);
        let delta = qim_embed(p, bit, self.step) - p;
        for (h, vi) in coarse.hl.iter_mut().zip(v.iter()) {
            *h += delta * vi;
        }
        fine.ll = haar_inverse(&coarse);
        write_cell(carrier, samples, &cell, &haar_inverse(&fine));
    }

    pub(crate) fn extract_unit(&self, image: &CarrierImage, unit: usize, seed: &[u8; 32]) -> u8 {
        let cell = read_cell(image, image.samples(), unit, TILE, 0.0);
        let fine = haar_forward(&cell.luma, TILE);
        let coarse = haar_forward(&fine.ll, TILE / 2);
        qim_decode(project(&coarse.hl, &spreading_vector(seed, unit)), self.step)
    }
}

fn project(coeffs: &[f64], v: &[f64; SPREAD_LEN]) -> f64 {
    coeffs.iter().zip(v.iter()).map(|(a, b)| a * b).sum()
}

/// Unit-norm spreading vector for one unit.
///
/// Each unit draws from its own ChaCha20 stream, so vectors can be produced
/// in any order. Stream 0 is left to the traversal shuffle.
pub(crate) fn spreading_vector(seed: &[u8; 32], unit: usize) -> [f64; SPREAD_LEN] {
    let mut rng = ChaCha20Rng::from_seed(*seed);
    rng.set_stream(unit as u64 + 1);

    let mut v = [0.0f64; SPREAD_LEN];
    for val in v.iter_mut() {
        *val = rng.gen_range(-1.0..1.0);
    }
    let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 1e-10 {
        for val in v.iter_mut() {
            *val /= norm;
        }
    } else {
        v = [0.0; SPREAD_LEN];
        v[0] = 1.0;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::ChannelLayout;

    #[test]
    fn vectors_are_unit_norm_and_keyed() {
        let a = spreading_vector(&[42u8; 32], 3);
        let norm: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-10);
        assert_eq!(a, spreading_vector(&[42u8; 32], 3));
        assert_ne!(a, spreading_vector(&[42u8; 32], 4));
        assert_ne!(a, spreading_vector(&[43u8; 32], 3));
    }

    #[test]
    fn saturated_tiles_still_carry_bits() {
        let seed = [1u8; 32];
        for value in [0u8, 255] {
            let img = CarrierImage::from_raw(16, 16, ChannelLayout::Luma, vec![value; 256]).unwrap();
            for bit in 0..2u8 {
                let mut samples = img.samples().to_vec();
                Dwt::default().embed_unit(&img, &mut samples, 0, bit, &seed);
                let stego = img.with_samples(samples);
                assert_eq!(Dwt::default().extract_unit(&stego, 0, &seed), bit);
            }
        }
    }

    #[test]
    fn every_unit_reads_back() {
        let img = CarrierImage::from_raw(64, 64, ChannelLayout::Luma, vec![128; 64 * 64]).unwrap();
        let seed = [7u8; 32];
        let mut samples = img.samples().to_vec();
        let units = Dwt::default().unit_count(&img);
        for u in 0..units {
            Dwt::default().embed_unit(&img, &mut samples, u, 1, &seed);
        }
        let stego = img.with_samples(samples);
        let right: usize = (0..units).map(|u| Dwt::default().extract_unit(&stego, u, &seed) as usize).sum();
        assert_eq!(right, units);
    }

    #[test]
    fn pixel_change_stays_within_margin() {
        let samples: Vec<u8> = (0..256u32).map(|i| (40 + (i * 13) % 160) as u8).collect();
        let img = CarrierImage::from_raw(16, 16, ChannelLayout::Luma, samples).unwrap();
        let seed = [9u8; 32];
        for bit in 0..2u8 {
            let mut out = img.samples().to_vec();
            Dwt::default().embed_unit(&img, &mut out, 0, bit, &seed);
            for (a, b) in img.samples().iter().zip(&out) {
                // Move (≤ 6) plus rounding; no clamping in this range.
                assert!(a.abs_diff(*b) <= 7, "{a} -> {b}");
            }
            assert_eq!(Dwt::default().extract_unit(&img.with_samples(out), 0, &seed), bit);
        }
    }
}
