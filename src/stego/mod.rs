// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Steganographic embedding and extraction.
//!
//! Three strategies share one self-describing bitstream:
//!
//! - **LSB** (`Algorithm::Lsb`): spatial least-significant-bit replacement.
//!   Highest capacity, changes each sample by at most 1.
//! - **DCT** (`Algorithm::Dct`): QIM on a mid-band coefficient of each 8×8
//!   luma block. Survives JPEG recompression.
//! - **DWT** (`Algorithm::Dwt`): spread-transform dither modulation over the
//!   level-2 Haar detail band of each 16×16 luma tile. Lowest capacity.
//!
//! All strategies share the payload envelope (optional Brotli), encryption
//! (AES-256-GCM-SIV with Argon2id key derivation), the optional SHA-256
//! content digest and the redundancy layer. [`extract`] auto-detects the
//! strategy from the embedded header.

pub mod capacity;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod integrity;
pub mod payload;
pub mod permute;
mod pipeline;
pub mod progress;
pub mod redundancy;

pub use capacity::{capacity, capacity_report, encoded_payload_size, CapacityEntry, CapacityReport};
pub use config::{Algorithm, EmbedConfig, ExtractAlgorithm, ExtractConfig, Passphrase};
pub use error::{ErrorKind, StegoError};
pub use payload::{Payload, PayloadKind};
pub use pipeline::{embed, extract, EmbedOutcome, ExtractionResult};
