// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Payload model and the envelope that wraps it before encryption.
//!
//! ```text
//! [1 byte ] flags: bits 0-1 compression, bits 2-3 payload kind
//! [M bytes] data (raw or Brotli-compressed depending on flags)
//! ```
//!
//! Compression is only kept when it makes the data strictly smaller, so the
//! envelope never exceeds `1 + data.len()` bytes.

use std::io::{self, Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::stego::error::StegoError;

const COMPRESS_NONE: u8 = 0b00;
const COMPRESS_BROTLI: u8 = 0b01;
const COMPRESS_MASK: u8 = 0b11;
const KIND_SHIFT: u8 = 2;
const KIND_MASK: u8 = 0b11 << KIND_SHIFT;

/// Brotli quality (0-11). Payloads are small, max quality is cheap.
const BROTLI_QUALITY: u32 = 11;
const BROTLI_LG_WINDOW_SIZE: u32 = 22;

/// Decompression bomb guard.
const MAX_DECOMPRESSED: u64 = 64 * 1024 * 1024;

/// Envelope overhead in bytes (the flags byte).
pub const ENVELOPE_OVERHEAD: usize = 1;

/// Logical kind of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Text,
    Binary,
    /// JSON document.
    Structured,
}

impl PayloadKind {
    fn bits(self) -> u8 {
        match self {
            Self::Text => 0,
            Self::Binary => 1,
            Self::Structured => 2,
        }
    }

    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Text),
            1 => Some(Self::Binary),
            2 => Some(Self::Structured),
            _ => None,
        }
    }
}

/// The secret data being hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub kind: PayloadKind,
    pub data: Vec<u8>,
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Self { kind: PayloadKind::Text, data: text.into().into_bytes() }
    }

    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self { kind: PayloadKind::Binary, data: data.into() }
    }

    /// Serialize `value` as JSON.
    ///
    /// # Errors
    /// [`StegoError::MalformedPayload`] if `value` cannot be serialized.
    pub fn structured<T: Serialize>(value: &T) -> Result<Self, StegoError> {
        let data = serde_json::to_vec(value).map_err(|e| StegoError::MalformedPayload(e.to_string()))?;
        Ok(Self { kind: PayloadKind::Structured, data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// # Errors
    /// [`StegoError::InvalidUtf8`] if the bytes are not UTF-8.
    pub fn as_text(&self) -> Result<&str, StegoError> {
        std::str::from_utf8(&self.data).map_err(|_| StegoError::InvalidUtf8)
    }

    /// # Errors
    /// [`StegoError::MalformedPayload`] if the bytes are not JSON of shape `T`.
    pub fn as_json<T: DeserializeOwned>(&self) -> Result<T, StegoError> {
        serde_json::from_slice(&self.data).map_err(|e| StegoError::MalformedPayload(e.to_string()))
    }
}

/// Wrap a payload into its envelope, compressing when requested and useful.
pub fn encode_envelope(payload: &Payload, compress: bool) -> Vec<u8> {
    let kind = payload.kind.bits() << KIND_SHIFT;
    if compress {
        match compress_brotli(&payload.data) {
            Ok(compressed) if compressed.len() < payload.data.len() => {
                let mut out = Vec::with_capacity(1 + compressed.len());
                out.push(kind | COMPRESS_BROTLI);
                out.extend_from_slice(&compressed);
                return out;
            }
            Ok(_) => {}
            Err(e) => warn!("brotli compression failed, storing raw: {e}"),
        }
    }
    let mut out = Vec::with_capacity(1 + payload.data.len());
    out.push(kind | COMPRESS_NONE);
    out.extend_from_slice(&payload.data);
    out
}

/// Unwrap an envelope produced by [`encode_envelope`].
///
/// # Errors
/// [`StegoError::AuthenticationFailure`] if the envelope is empty, its flags
/// are unknown, or the compressed stream is malformed. Without a digest or
/// cipher this parse is the last line of corruption detection.
pub fn decode_envelope(data: &[u8]) -> Result<Payload, StegoError> {
    let (&flags, body) = data.split_first().ok_or(StegoError::AuthenticationFailure)?;

    let kind = PayloadKind::from_bits((flags & KIND_MASK) >> KIND_SHIFT)
        .ok_or(StegoError::AuthenticationFailure)?;

    let data = match flags & COMPRESS_MASK {
        COMPRESS_NONE => body.to_vec(),
        COMPRESS_BROTLI => decompress_brotli(body)?,
        _ => return Err(StegoError::AuthenticationFailure),
    };
    Ok(Payload { kind, data })
}

fn compress_brotli(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut compressor =
        brotli::CompressorWriter::new(Vec::new(), 4096, BROTLI_QUALITY, BROTLI_LG_WINDOW_SIZE);
    compressor.write_all(data)?;
    // Finishes the stream.
    Ok(compressor.into_inner())
}

fn decompress_brotli(data: &[u8]) -> Result<Vec<u8>, StegoError> {
    let mut output = Vec::new();
    brotli::Decompressor::new(data, 4096)
        .take(MAX_DECOMPRESSED)
        .read_to_end(&mut output)
        .map_err(|_| StegoError::AuthenticationFailure)?;
    Ok(output)
}
