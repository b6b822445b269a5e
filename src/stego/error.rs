// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the steganography engine.
//!
//! [`StegoError`] covers every failure from carrier decoding through
//! extraction. Errors that cross the job boundary are flattened into an
//! [`ErrorKind`] plus a human-readable message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during embedding or extraction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StegoError {
    /// The payload does not fit into the carrier with the requested config.
    #[error("payload of {size} bytes exceeds capacity of {capacity} bytes")]
    PayloadTooLarge { size: usize, capacity: usize },
    /// AEAD decryption or content digest verification failed.
    #[error("authentication failed (wrong key or corrupted data)")]
    AuthenticationFailure,
    /// No strategy found a valid embedded header.
    #[error("no embedded payload detected")]
    NoEmbeddingDetected,
    /// The carrier cannot be decoded or has an unsupported pixel layout.
    #[error("unsupported carrier format: {0}")]
    UnsupportedFormat(String),
    /// The carrier exceeds the maximum allowed dimensions.
    #[error("image too large (max {max_dimension}px per side / {max_pixels} pixels)")]
    ImageTooLarge { max_dimension: u32, max_pixels: u32 },
    /// The embed or extract configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The extracted text payload is not valid UTF-8.
    #[error("extracted text is not valid UTF-8")]
    InvalidUtf8,
    /// A structured payload could not be converted to or from JSON.
    #[error("malformed structured payload: {0}")]
    MalformedPayload(String),
    /// The operation was cancelled at a phase boundary.
    #[error("operation cancelled")]
    Cancelled,
    /// Unexpected fault inside a codec strategy.
    #[error("internal codec fault: {0}")]
    InternalCodecFault(String),
}

/// Serializable discriminant of [`StegoError`], reported on failed jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PayloadTooLarge,
    AuthenticationFailure,
    NoEmbeddingDetected,
    UnsupportedFormat,
    ImageTooLarge,
    InvalidConfig,
    InvalidUtf8,
    MalformedPayload,
    Cancelled,
    InternalCodecFault,
}

impl StegoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::AuthenticationFailure => ErrorKind::AuthenticationFailure,
            Self::NoEmbeddingDetected => ErrorKind::NoEmbeddingDetected,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::ImageTooLarge { .. } => ErrorKind::ImageTooLarge,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::InvalidUtf8 => ErrorKind::InvalidUtf8,
            Self::MalformedPayload(_) => ErrorKind::MalformedPayload,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InternalCodecFault(_) => ErrorKind::InternalCodecFault,
        }
    }
}

impl From<image::ImageError> for StegoError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::Unsupported(u) => Self::UnsupportedFormat(u.to_string()),
            image::ImageError::Decoding(d) => Self::UnsupportedFormat(d.to_string()),
            other => Self::InternalCodecFault(other.to_string()),
        }
    }
}
