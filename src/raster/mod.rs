// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Carrier and stego pixel buffers.
//!
//! [`CarrierImage`] is an immutable 8-bit interleaved pixel buffer decoded
//! from any container the `image` crate recognises. Embedding never touches
//! it in place: codecs copy the samples and return a [`StegoImage`], which is
//! exported losslessly as PNG.

pub mod quality;
pub mod transform;

use std::io::Cursor;

use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};

use crate::stego::error::StegoError;

/// Maximum pixel dimension (width or height) of a carrier.
pub const MAX_DIMENSION: u32 = 8192;

/// Maximum total pixel count (width × height) of a carrier.
pub const MAX_PIXELS: u32 = 16_000_000;

/// Validate carrier dimensions.
///
/// # Errors
/// - [`StegoError::UnsupportedFormat`] for an empty image.
/// - [`StegoError::ImageTooLarge`] if either side exceeds [`MAX_DIMENSION`]
///   or the pixel count exceeds [`MAX_PIXELS`].
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), StegoError> {
    if width == 0 || height == 0 {
        return Err(StegoError::UnsupportedFormat("image has no pixels".into()));
    }
    if width > MAX_DIMENSION
        || height > MAX_DIMENSION
        || width.checked_mul(height).map_or(true, |p| p > MAX_PIXELS)
    {
        return Err(StegoError::ImageTooLarge {
            max_dimension: MAX_DIMENSION,
            max_pixels: MAX_PIXELS,
        });
    }
    Ok(())
}

/// Interleaved channel layout of an 8-bit buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    Luma,
    LumaAlpha,
    Rgb,
    Rgba,
}

impl ChannelLayout {
    /// Total interleaved channels per pixel.
    pub fn channels(self) -> usize {
        match self {
            Self::Luma => 1,
            Self::LumaAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Channels that carry colour. Alpha is never modulated.
    pub fn color_channels(self) -> usize {
        match self {
            Self::Luma | Self::LumaAlpha => 1,
            Self::Rgb | Self::Rgba => 3,
        }
    }

    fn extended_color_type(self) -> ExtendedColorType {
        match self {
            Self::Luma => ExtendedColorType::L8,
            Self::LumaAlpha => ExtendedColorType::La8,
            Self::Rgb => ExtendedColorType::Rgb8,
            Self::Rgba => ExtendedColorType::Rgba8,
        }
    }
}

/// Container format the carrier was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierFormat {
    Png,
    Bmp,
    Jpeg,
    /// Built from a raw sample buffer, not decoded from a container.
    Raw,
}

/// Immutable 8-bit carrier pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierImage {
    width: u32,
    height: u32,
    layout: ChannelLayout,
    format: CarrierFormat,
    samples: Vec<u8>,
}

impl CarrierImage {
    /// Decode a carrier from encoded image bytes (PNG, BMP or JPEG).
    ///
    /// # Errors
    /// - [`StegoError::UnsupportedFormat`] if the container is unknown, the
    ///   data is malformed, or the pixel layout is not 8-bit.
    /// - [`StegoError::ImageTooLarge`] if the dimensions exceed the limits.
    pub fn decode(bytes: &[u8]) -> Result<Self, StegoError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| StegoError::UnsupportedFormat(e.to_string()))?;
        let format = match reader.format() {
            Some(ImageFormat::Png) => CarrierFormat::Png,
            Some(ImageFormat::Bmp) => CarrierFormat::Bmp,
            Some(ImageFormat::Jpeg) => CarrierFormat::Jpeg,
            Some(other) => {
                return Err(StegoError::UnsupportedFormat(format!("{other:?} container")))
            }
            None => return Err(StegoError::UnsupportedFormat("unrecognised container".into())),
        };

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| StegoError::UnsupportedFormat(e.to_string()))?;
        validate_dimensions(width, height)?;

        let decoded = image::load_from_memory(bytes)?;
        let (layout, samples) = match decoded {
            DynamicImage::ImageLuma8(buf) => (ChannelLayout::Luma, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (ChannelLayout::LumaAlpha, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (ChannelLayout::Rgb, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (ChannelLayout::Rgba, buf.into_raw()),
            other => {
                return Err(StegoError::UnsupportedFormat(format!(
                    "{:?} pixels (only 8-bit layouts are supported)",
                    other.color()
                )))
            }
        };

        Ok(Self { width, height, layout, format, samples })
    }

    /// Build a carrier from raw interleaved 8-bit samples.
    ///
    /// # Errors
    /// [`StegoError::UnsupportedFormat`] if the sample count does not match
    /// the dimensions and layout.
    pub fn from_raw(
        width: u32,
        height: u32,
        layout: ChannelLayout,
        samples: Vec<u8>,
    ) -> Result<Self, StegoError> {
        validate_dimensions(width, height)?;
        let expected = width as usize * height as usize * layout.channels();
        if samples.len() != expected {
            return Err(StegoError::UnsupportedFormat(format!(
                "expected {expected} samples, got {}",
                samples.len()
            )));
        }
        Ok(Self { width, height, layout, format: CarrierFormat::Raw, samples })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn format(&self) -> CarrierFormat {
        self.format
    }

    /// Always 8: wider buffers are rejected at decode time.
    pub fn bit_depth(&self) -> u8 {
        8
    }

    /// Interleaved samples in row-major order.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Flat sample index of channel `c` at pixel (`x`, `y`).
    pub fn sample_index(&self, x: usize, y: usize, c: usize) -> usize {
        (y * self.width as usize + x) * self.layout.channels() + c
    }

    /// Number of colour samples (alpha excluded).
    pub fn color_sample_count(&self) -> usize {
        self.width as usize * self.height as usize * self.layout.color_channels()
    }

    /// Derive a same-shaped image with replaced samples.
    pub(crate) fn with_samples(&self, samples: Vec<u8>) -> Self {
        debug_assert_eq!(samples.len(), self.samples.len());
        Self {
            width: self.width,
            height: self.height,
            layout: self.layout,
            format: self.format,
            samples,
        }
    }

    /// Encode losslessly as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, StegoError> {
        let mut out = Vec::new();
        image::codecs::png::PngEncoder::new(&mut out).write_image(
            &self.samples,
            self.width,
            self.height,
            self.layout.extended_color_type(),
        )?;
        Ok(out)
    }
}

/// A carrier-shaped buffer that carries an embedded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StegoImage {
    image: CarrierImage,
}

impl StegoImage {
    pub(crate) fn new(image: CarrierImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &CarrierImage {
        &self.image
    }

    pub fn into_image(self) -> CarrierImage {
        self.image
    }

    /// Lossless PNG byte stream for the export boundary.
    pub fn to_png(&self) -> Result<Vec<u8>, StegoError> {
        self.image.to_png()
    }
}
