// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! # stegforge
//!
//! Pure-Rust steganography engine for hiding payloads in raster images,
//! with a concurrent job queue and batch coordinator on top.
//!
//! - **LSB**: spatial least-significant-bit embedding. Highest capacity.
//! - **DCT**: quantisation of a mid-band coefficient in each 8×8 luma block.
//! - **DWT**: spread-transform dither modulation over the level-2 Haar detail
//!   band of each 16×16 luma tile.
//!
//! Payloads can be compressed (Brotli), encrypted (AES-256-GCM-SIV with
//! Argon2id key derivation), protected by a SHA-256 digest and replicated
//! for majority-vote recovery. The embedded header makes every stego image
//! self-describing; extraction only needs the traversal seed and key.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use stegforge::{embed, extract, Algorithm, CarrierImage, EmbedConfig, ExtractConfig, Payload};
//! use stegforge::progress::Unobserved;
//!
//! let carrier = CarrierImage::decode(&std::fs::read("photo.png").unwrap()).unwrap();
//! let config = EmbedConfig::new(Algorithm::Lsb).with_seed("shared seed");
//! let out = embed(&carrier, &Payload::text("secret message"), &config, &Unobserved).unwrap();
//! let found = extract(out.stego.image(), &ExtractConfig::from(&config), &Unobserved).unwrap();
//! assert_eq!(found.payload.unwrap().as_text().unwrap(), "secret message");
//! ```

pub mod logging;
pub mod queue;
pub mod raster;
pub mod stego;

pub use queue::{
    BatchCoordinator, BatchId, BatchItem, BatchOptions, BatchSummary, JobId, JobOutcome, JobSnapshot,
    JobStatus, ProcessingQueue, QueueConfig, QueueError, QueueEvent, QueueHandle,
};
pub use raster::quality::QualityMetrics;
pub use raster::{validate_dimensions, CarrierImage, ChannelLayout, StegoImage, MAX_DIMENSION, MAX_PIXELS};
pub use stego::progress;
pub use stego::{
    capacity, capacity_report, embed, encoded_payload_size, extract, Algorithm, CapacityReport,
    EmbedConfig, EmbedOutcome, ErrorKind, ExtractAlgorithm, ExtractConfig, ExtractionResult,
    Passphrase, Payload, PayloadKind, StegoError,
};
