// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Spatial LSB replacement.
//!
//! Unit `u` is the `u`-th colour sample in raster order (alpha skipped).
//! Embedding overwrites its least-significant bit, so a sample changes by at
//! most 1.

use crate::raster::CarrierImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lsb;

impl Lsb {
    pub fn unit_count(&self, carrier: &CarrierImage) -> usize {
        carrier.color_sample_count()
    }

    pub(crate) fn embed_unit(&self, carrier: &CarrierImage, samples: &mut [u8], unit: usize, bit: u8) {
        let i = sample_of(carrier, unit);
        samples[i] = (samples[i] & !1) | (bit & 1);
    }

    pub(crate) fn extract_unit(&self, image: &CarrierImage, unit: usize) -> u8 {
        image.samples()[sample_of(image, unit)] & 1
    }
}

/// Flat sample index of colour sample `unit`.
pub(crate) fn sample_of(carrier: &CarrierImage, unit: usize) -> usize {
    let colors = carrier.layout().color_channels();
    let pixel = unit / colors;
    pixel * carrier.layout().channels() + unit % colors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::ChannelLayout;

    #[test]
    fn skips_alpha() {
        let img = CarrierImage::from_raw(2, 1, ChannelLayout::Rgba, vec![0; 8]).unwrap();
        let idx: Vec<usize> = (0..6).map(|u| sample_of(&img, u)).collect();
        assert_eq!(idx, vec![0, 1, 2, 4, 5, 6]);
    }

    #[test]
    fn changes_at_most_one_level() {
        let img = CarrierImage::from_raw(2, 1, ChannelLayout::Rgb, vec![0, 255, 128, 7, 8, 9]).unwrap();
        let mut samples = img.samples().to_vec();
        for u in 0..6 {
            Lsb.embed_unit(&img, &mut samples, u, (u % 2) as u8);
        }
        for (a, b) in img.samples().iter().zip(&samples) {
            assert!(a.abs_diff(*b) <= 1);
        }
        let stego = img.with_samples(samples);
        let bits: Vec<u8> = (0..6).map(|u| Lsb.extract_unit(&stego, u)).collect();
        assert_eq!(bits, vec![0, 1, 0, 1, 0, 1]);
    }
}
