// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Self-describing embedded bitstream layout.
//!
//! Every strategy embeds the same bitstream:
//!
//! ```text
//! header × HEADER_COPIES   (majority-voted bitwise on extraction)
//! frame  × redundancy      (reconciled by the redundancy layer)
//! ```
//!
//! Header layout (10 bytes):
//!
//! ```text
//! [1 byte ] flags: bits 0-1 algorithm id, bit 2 encrypted, bit 3 digest,
//!           bits 4-7 format version
//! [1 byte ] redundancy factor (>= 1)
//! [4 bytes] frame length in bytes (big-endian u32)
//! [4 bytes] CRC-32 of the six bytes above
//! ```
//!
//! The header is the only thing extraction needs to size the rest of the
//! stream, so no metadata travels outside the image.

use crate::stego::config::Algorithm;
use crate::stego::redundancy;

/// Header size in bytes.
pub const HEADER_LEN: usize = 10;
/// Header copies embedded ahead of the body.
pub const HEADER_COPIES: usize = 3;
/// Bits consumed by the replicated header.
pub const HEADER_BITS: usize = HEADER_LEN * 8 * HEADER_COPIES;
/// Current bitstream format version.
pub const FORMAT_VERSION: u8 = 1;

const FLAG_ENCRYPTED: u8 = 0b0100;
const FLAG_DIGEST: u8 = 0b1000;
const ALGORITHM_MASK: u8 = 0b0011;
const VERSION_SHIFT: u8 = 4;

/// Decoded stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub algorithm: Algorithm,
    pub encrypted: bool,
    pub digest: bool,
    pub redundancy: u8,
    pub frame_len: u32,
}

impl Header {
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut flags = self.algorithm.id() & ALGORITHM_MASK;
        if self.encrypted {
            flags |= FLAG_ENCRYPTED;
        }
        if self.digest {
            flags |= FLAG_DIGEST;
        }
        flags |= FORMAT_VERSION << VERSION_SHIFT;

        let mut out = [0u8; HEADER_LEN];
        out[0] = flags;
        out[1] = self.redundancy;
        out[2..6].copy_from_slice(&self.frame_len.to_be_bytes());
        let crc = crc32fast::hash(&out[..6]);
        out[6..10].copy_from_slice(&crc.to_be_bytes());
        out
    }

    /// Parse and verify a header. `None` if the CRC, version, algorithm id or
    /// redundancy byte is invalid.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let stored_crc = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        if crc32fast::hash(&bytes[..6]) != stored_crc {
            return None;
        }
        let flags = bytes[0];
        if flags >> VERSION_SHIFT != FORMAT_VERSION {
            return None;
        }
        let algorithm = Algorithm::from_id(flags & ALGORITHM_MASK)?;
        let redundancy = bytes[1];
        if redundancy == 0 {
            return None;
        }
        Some(Self {
            algorithm,
            encrypted: flags & FLAG_ENCRYPTED != 0,
            digest: flags & FLAG_DIGEST != 0,
            redundancy,
            frame_len: u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
        })
    }

    /// Total bits of the full stream (header copies + body).
    pub fn stream_bits(&self) -> usize {
        HEADER_BITS + self.frame_len as usize * 8 * self.redundancy as usize
    }
}

/// Assemble the full bitstream for a header and its frame.
pub fn build_stream(header: &Header, frame: &[u8]) -> Vec<u8> {
    debug_assert_eq!(frame.len(), header.frame_len as usize);
    let header_bits = bytes_to_bits(&header.to_bytes());
    let frame_bits = bytes_to_bits(frame);

    let mut stream = redundancy::replicate(&header_bits, HEADER_COPIES);
    stream.extend(redundancy::replicate(&frame_bits, header.redundancy as usize));
    stream
}

/// Majority-vote the replicated header at the start of `bits` and parse it.
pub fn read_header(bits: &[u8]) -> Option<Header> {
    if bits.len() < HEADER_BITS {
        return None;
    }
    let voted = redundancy::reconcile(&bits[..HEADER_BITS], HEADER_LEN * 8, HEADER_COPIES);
    Header::parse(&bits_to_bytes(&voted.bits))
}

/// Convert bytes to a bit vector (MSB first within each byte).
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for bit_pos in (0..8).rev() {
            bits.push((byte >> bit_pos) & 1);
        }
    }
    bits
}

/// Convert a bit vector (MSB first) back to bytes.
/// Pads the last byte with zero bits if `bits.len()` is not a multiple of 8.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(bits.len().div_ceil(8));
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for (i, &bit) in chunk.iter().enumerate() {
            byte |= (bit & 1) << (7 - i);
        }
        bytes.push(byte);
    }
    bytes
}
