// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic carriers shared by the integration tests.

#![allow(dead_code)]

use stegforge::{CarrierImage, ChannelLayout};

/// Deterministic noisy RGB carrier. Values span the full 0..=255 range,
/// including saturated runs, so clamping paths are exercised.
pub fn noisy_rgb(width: u32, height: u32, seed: u64) -> CarrierImage {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
    let mut samples = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            for c in 0..3u32 {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
                let noise = (state >> 59) as u32;
                let base = (x * 3 + y * 2 + c * 40) % 256;
                let v = if (x / 8 + y / 8) % 5 == 0 { 255 * (c % 2) } else { (base + noise) % 256 };
                samples.push(v as u8);
            }
        }
    }
    CarrierImage::from_raw(width, height, ChannelLayout::Rgb, samples).unwrap()
}

/// Smooth colour gradients with mild per-channel grain, kept inside the
/// 8-bit range so JPEG round trips do not clip.
pub fn photo_rgb(width: u32, height: u32, seed: u64) -> CarrierImage {
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    let mut samples = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let (fx, fy) = (f64::from(x), f64::from(y));
            let base = [
                90.0 + 50.0 * (fx / 23.0).sin(),
                120.0 + 40.0 * (fy / 17.0).cos(),
                110.0 + 30.0 * ((fx + fy) / 31.0).sin(),
            ];
            for b in base {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
                let grain = ((state >> 60) as f64) - 7.5;
                samples.push((b + grain).round() as u8);
            }
        }
    }
    CarrierImage::from_raw(width, height, ChannelLayout::Rgb, samples).unwrap()
}

/// RGBA carrier with a distinctive alpha ramp.
pub fn rgba(width: u32, height: u32) -> CarrierImage {
    let mut samples = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            samples.extend_from_slice(&[(x * 5) as u8, (y * 7) as u8, ((x + y) * 3) as u8, (x ^ y) as u8]);
        }
    }
    CarrierImage::from_raw(width, height, ChannelLayout::Rgba, samples).unwrap()
}

pub fn png(image: &CarrierImage) -> Vec<u8> {
    image.to_png().unwrap()
}
