// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Block transforms used by the transform-domain codecs.
//!
//! - 8×8 orthonormal DCT-II and its inverse (separable, table driven).
//! - One-level orthonormal 2D Haar wavelet on square tiles.
//!
//! Both transforms are orthonormal, so a change of `d` in one coefficient
//! moves every pixel by at most `d × max|basis|`. The codecs rely on that
//! bound to size their clamping margins.

use std::sync::OnceLock;

/// Pre-computed 8×8 cosine table.
/// `COSINE[u][x] = cos((2*x + 1) * u * PI / 16)`
static COSINE: OnceLock<[[f64; 8]; 8]> = OnceLock::new();

/// Normalization constants: C(0) = 1/sqrt(8), C(u>0) = 1/2.
const NORM: [f64; 8] = [
    0.353_553_390_593_273_8,
    0.5,
    0.5,
    0.5,
    0.5,
    0.5,
    0.5,
    0.5,
];

fn cosine_table() -> &'static [[f64; 8]; 8] {
    COSINE.get_or_init(|| {
        let mut table = [[0.0f64; 8]; 8];
        for (u, row) in table.iter_mut().enumerate() {
            for (x, v) in row.iter_mut().enumerate() {
                *v = ((2 * x + 1) as f64 * u as f64 * std::f64::consts::PI / 16.0).cos();
            }
        }
        table
    })
}

/// Forward 8×8 DCT of row-major pixel values.
///
/// No level shift is applied; AC coefficients are unaffected by it.
pub fn dct_8x8(pixels: &[f64; 64]) -> [f64; 64] {
    let cos = cosine_table();

    // Rows.
    let mut temp = [0.0f64; 64];
    for row in 0..8 {
        for u in 0..8 {
            let mut sum = 0.0;
            for x in 0..8 {
                sum += pixels[row * 8 + x] * cos[u][x];
            }
            temp[row * 8 + u] = NORM[u] * sum;
        }
    }

    // Columns.
    let mut coeffs = [0.0f64; 64];
    for col in 0..8 {
        for v in 0..8 {
            let mut sum = 0.0;
            for y in 0..8 {
                sum += temp[y * 8 + col] * cos[v][y];
            }
            coeffs[v * 8 + col] = NORM[v] * sum;
        }
    }
    coeffs
}

/// Inverse 8×8 DCT back to row-major pixel values.
pub fn idct_8x8(coeffs: &[f64; 64]) -> [f64; 64] {
    let cos = cosine_table();

    // Columns.
    let mut temp = [0.0f64; 64];
    for col in 0..8 {
        for y in 0..8 {
            let mut sum = 0.0;
            for v in 0..8 {
                sum += NORM[v] * coeffs[v * 8 + col] * cos[v][y];
            }
            temp[y * 8 + col] = sum;
        }
    }

    // Rows.
    let mut pixels = [0.0f64; 64];
    for row in 0..8 {
        for x in 0..8 {
            let mut sum = 0.0;
            for u in 0..8 {
                sum += NORM[u] * temp[row * 8 + u] * cos[u][x];
            }
            pixels[row * 8 + x] = sum;
        }
    }
    pixels
}

/// Sub-bands of a one-level Haar decomposition of a square tile.
///
/// Each band is `half × half`, row-major, where `half = side / 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct HaarBands {
    pub half: usize,
    pub ll: Vec<f64>,
    /// Horizontal detail (column differences).
    pub hl: Vec<f64>,
    /// Vertical detail (row differences).
    pub lh: Vec<f64>,
    pub hh: Vec<f64>,
}

/// One-level orthonormal 2D Haar transform of a `side × side` tile.
///
/// `side` must be even.
pub fn haar_forward(tile: &[f64], side: usize) -> HaarBands {
    debug_assert!(side % 2 == 0 && tile.len() == side * side);
    let half = side / 2;
    let mut bands = HaarBands {
        half,
        ll: vec![0.0; half * half],
        hl: vec![0.0; half * half],
        lh: vec![0.0; half * half],
        hh: vec![0.0; half * half],
    };
    for r in 0..half {
        for c in 0..half {
            let a = tile[(2 * r) * side + 2 * c];
            let b = tile[(2 * r) * side + 2 * c + 1];
            let d0 = tile[(2 * r + 1) * side + 2 * c];
            let d1 = tile[(2 * r + 1) * side + 2 * c + 1];
            let i = r * half + c;
            bands.ll[i] = (a + b + d0 + d1) / 2.0;
            bands.hl[i] = (a - b + d0 - d1) / 2.0;
            bands.lh[i] = (a + b - d0 - d1) / 2.0;
            bands.hh[i] = (a - b - d0 + d1) / 2.0;
        }
    }
    bands
}

/// Inverse of [`haar_forward`].
pub fn haar_inverse(bands: &HaarBands) -> Vec<f64> {
    let half = bands.half;
    let side = half * 2;
    let mut tile = vec![0.0; side * side];
    for r in 0..half {
        for c in 0..half {
            let i = r * half + c;
            let (ll, hl, lh, hh) = (bands.ll[i], bands.hl[i], bands.lh[i], bands.hh[i]);
            tile[(2 * r) * side + 2 * c] = (ll + hl + lh + hh) / 2.0;
            tile[(2 * r) * side + 2 * c + 1] = (ll - hl + lh - hh) / 2.0;
            tile[(2 * r + 1) * side + 2 * c] = (ll + hl - lh - hh) / 2.0;
            tile[(2 * r + 1) * side + 2 * c + 1] = (ll - hl - lh + hh) / 2.0;
        }
    }
    tile
}
