// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Embedding strategies.
//!
//! A strategy maps a bitstream onto "units" of the carrier, one bit per unit,
//! visiting units in the keyed traversal order from [`crate::stego::permute`]:
//!
//! | Strategy | Unit                                   |
//! |----------|----------------------------------------|
//! | LSB      | one colour sample                      |
//! | DCT      | one 8×8 block of the luma plane        |
//! | DWT      | one 16×16 tile of the luma plane       |
//!
//! Units never overlap, so embedding bit `i` cannot disturb bit `j`. The
//! transform strategies clamp each unit into a pixel range that leaves room
//! for the worst-case coefficient change, so the stego pixels never saturate
//! and every embedded bit is read back exactly from the lossless output.
//!
//! On colour carriers the transform strategies work on BT.601 luma, the same
//! signal JPEG keeps at full resolution. A luma change is written back as an
//! equal shift of R, G and B, which leaves both chroma components untouched,
//! so chroma subsampling on recompression does not erase the bits.

pub mod dct;
pub mod dwt;
pub mod lsb;

use crate::raster::{CarrierImage, StegoImage};
use crate::stego::config::Algorithm;
use crate::stego::error::StegoError;
use crate::stego::permute::traversal_prefix;

/// Closed set of strategies, dispatched by `match`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Codec {
    Lsb(lsb::Lsb),
    Dct(dct::Dct),
    Dwt(dwt::Dwt),
}

impl Codec {
    pub fn for_algorithm(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Lsb => Self::Lsb(lsb::Lsb),
            Algorithm::Dct => Self::Dct(dct::Dct::default()),
            Algorithm::Dwt => Self::Dwt(dwt::Dwt::default()),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Lsb(_) => Algorithm::Lsb,
            Self::Dct(_) => Algorithm::Dct,
            Self::Dwt(_) => Algorithm::Dwt,
        }
    }

    /// Number of one-bit units the carrier offers.
    pub fn unit_count(&self, carrier: &CarrierImage) -> usize {
        match self {
            Self::Lsb(c) => c.unit_count(carrier),
            Self::Dct(c) => c.unit_count(carrier),
            Self::Dwt(c) => c.unit_count(carrier),
        }
    }

    /// Embed `bits` (one bit per element, 0 or 1) into the first
    /// `bits.len()` units of the traversal order.
    ///
    /// # Errors
    /// [`StegoError::PayloadTooLarge`] if the stream has more bits than the
    /// carrier has units. Callers check capacity first; this is a backstop.
    pub fn embed(
        &self,
        carrier: &CarrierImage,
        bits: &[u8],
        seed: &[u8; 32],
    ) -> Result<StegoImage, StegoError> {
        let units = self.unit_count(carrier);
        if bits.len() > units {
            return Err(StegoError::PayloadTooLarge { size: bits.len() / 8, capacity: units / 8 });
        }
        let order = traversal_prefix(units, bits.len(), seed);
        let mut samples = carrier.samples().to_vec();
        for (&unit, &bit) in order.iter().zip(bits) {
            match self {
                Self::Lsb(c) => c.embed_unit(carrier, &mut samples, unit, bit),
                Self::Dct(c) => c.embed_unit(carrier, &mut samples, unit, bit),
                Self::Dwt(c) => c.embed_unit(carrier, &mut samples, unit, bit, seed),
            }
        }
        Ok(StegoImage::new(carrier.with_samples(samples)))
    }

    /// Read the bits of the first `count` units of the traversal order.
    ///
    /// Returns fewer than `count` bits only when the image has fewer units.
    pub fn extract(&self, image: &CarrierImage, seed: &[u8; 32], count: usize) -> Vec<u8> {
        let order = traversal_prefix(self.unit_count(image), count, seed);
        match self {
            Self::Lsb(c) => map_units(&order, |u| c.extract_unit(image, u)),
            Self::Dct(c) => map_units(&order, |u| c.extract_unit(image, u)),
            Self::Dwt(c) => map_units(&order, |u| c.extract_unit(image, u, seed)),
        }
    }
}

#[cfg(feature = "parallel")]
fn map_units<F>(order: &[usize], f: F) -> Vec<u8>
where
    F: Fn(usize) -> u8 + Sync + Send,
{
    use rayon::prelude::*;
    order.par_iter().map(|&u| f(u)).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_units<F>(order: &[usize], f: F) -> Vec<u8>
where
    F: Fn(usize) -> u8,
{
    order.iter().map(|&u| f(u)).collect()
}

/// Quantisation index modulation on a scalar.
///
/// Bit 0 lives on the lattice `k·step + step/4`, bit 1 on
/// `k·step + 3·step/4`. The value moves by at most `step/2`, and decoding
/// tolerates any later error below `step/4`.
pub(crate) fn qim_embed(value: f64, bit: u8, step: f64) -> f64 {
    let offset = if bit & 1 == 1 { 0.75 * step } else { 0.25 * step };
    ((value - offset) / step).round() * step + offset
}

pub(crate) fn qim_decode(value: f64, step: f64) -> u8 {
    u8::from(value.rem_euclid(step) >= 0.5 * step)
}

/// BT.601 luma weights, as used by JPEG's YCbCr conversion. They sum to 1.
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// A square cell read as a luma plane.
///
/// The clamped colour samples are kept so a new luma plane can be written
/// back as a per-pixel shift of every colour channel.
pub(crate) struct Cell {
    x0: usize,
    y0: usize,
    side: usize,
    channels: usize,
    colour: Vec<f64>,
    pub(crate) luma: Vec<f64>,
}

/// Read unit `unit` on a grid of `side`-pixel cells, colour samples clamped
/// into `[margin, 255 - margin]`.
pub(crate) fn read_cell(
    carrier: &CarrierImage,
    samples: &[u8],
    unit: usize,
    side: usize,
    margin: f64,
) -> Cell {
    let channels = carrier.layout().color_channels();
    let cells_wide = carrier.width() as usize / side;
    let (x0, y0) = ((unit % cells_wide) * side, (unit / cells_wide) * side);

    let mut colour = Vec::with_capacity(side * side * channels);
    let mut luma = Vec::with_capacity(side * side);
    for y in 0..side {
        for x in 0..side {
            let first = colour.len();
            for c in 0..channels {
                let v = f64::from(samples[carrier.sample_index(x0 + x, y0 + y, c)]);
                colour.push(v.clamp(margin, 255.0 - margin));
            }
            let px = &colour[first..];
            luma.push(if channels == 1 {
                px[0]
            } else {
                px.iter().zip(LUMA_WEIGHTS).map(|(v, w)| v * w).sum()
            });
        }
    }
    Cell { x0, y0, side, channels, colour, luma }
}

/// Write `luma` back over `cell`, shifting every colour channel of a pixel by
/// that pixel's luma change and rounding to 8 bits.
pub(crate) fn write_cell(carrier: &CarrierImage, samples: &mut [u8], cell: &Cell, luma: &[f64]) {
    for y in 0..cell.side {
        for x in 0..cell.side {
            let i = y * cell.side + x;
            let delta = luma[i] - cell.luma[i];
            for c in 0..cell.channels {
                let v = (cell.colour[i * cell.channels + c] + delta).round().clamp(0.0, 255.0);
                samples[carrier.sample_index(cell.x0 + x, cell.y0 + y, c)] = v as u8;
            }
        }
    }
}

/// Number of full `side`-pixel cells.
pub(crate) fn cell_units(carrier: &CarrierImage, side: usize) -> usize {
    (carrier.width() as usize / side) * (carrier.height() as usize / side)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::raster::{CarrierImage, ChannelLayout};

    /// Deterministic textured RGB carrier covering the full 0..=255 range.
    pub fn textured(width: u32, height: u32) -> CarrierImage {
        let mut samples = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                samples.push(((x * 7 + y * 3) % 256) as u8);
                samples.push(((x * x + y * 11) % 256) as u8);
                samples.push(if (x / 4 + y / 4) % 2 == 0 { 0 } else { 255 });
            }
        }
        CarrierImage::from_raw(width, height, ChannelLayout::Rgb, samples).unwrap()
    }

    pub fn bits(n: usize, salt: u32) -> Vec<u8> {
        (0..n as u32).map(|i| ((i.wrapping_mul(2_654_435_761) ^ salt) >> 7) as u8 & 1).collect()
    }
}
