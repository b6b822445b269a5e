// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Embed and extract configuration value objects.
//!
//! Configs are immutable once built: every `with_*` method consumes and
//! returns a new value. A job captures its config in an `Arc`, so a retried
//! job sees exactly the same snapshot.

use core::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::stego::error::StegoError;

/// Embedding strategy. A closed set: capacity and robustness accounting is
/// handled exhaustively per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Spatial least-significant-bit embedding.
    Lsb,
    /// Block DCT mid-band quantisation.
    Dct,
    /// Haar wavelet detail sub-band spread embedding.
    Dwt,
}

impl Algorithm {
    /// Auto-detect priority: cheapest extraction first.
    pub const DETECT_ORDER: [Algorithm; 3] = [Algorithm::Lsb, Algorithm::Dct, Algorithm::Dwt];

    /// Two-bit identifier stored in the embedded header.
    pub fn id(self) -> u8 {
        match self {
            Self::Lsb => 0,
            Self::Dct => 1,
            Self::Dwt => 2,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Lsb),
            1 => Some(Self::Dct),
            2 => Some(Self::Dwt),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Lsb => "lsb",
            Self::Dct => "dct",
            Self::Dwt => "dwt",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key material for the cipher stage.
///
/// Zeroized on drop and redacted from `Debug`; never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

/// Configuration for one embed operation.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedConfig {
    algorithm: Algorithm,
    #[serde(skip)]
    key: Option<Passphrase>,
    encrypted: bool,
    redundancy: u8,
    compress: bool,
    content_hash: bool,
    #[serde(skip)]
    seed: String,
}

impl EmbedConfig {
    /// Plain config: no encryption, redundancy 1, no compression, no digest,
    /// empty traversal seed.
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            key: None,
            encrypted: false,
            redundancy: 1,
            compress: false,
            content_hash: false,
            seed: String::new(),
        }
    }

    /// Enable authenticated encryption with the given key.
    pub fn with_encryption(mut self, key: Passphrase) -> Self {
        self.key = Some(key);
        self.encrypted = true;
        self
    }

    pub fn with_redundancy(mut self, redundancy: u8) -> Self {
        self.redundancy = redundancy;
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_content_hash(mut self, content_hash: bool) -> Self {
        self.content_hash = content_hash;
        self
    }

    /// Traversal seed. Extraction must use the same seed.
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn key(&self) -> Option<&Passphrase> {
        self.key.as_ref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn redundancy(&self) -> u8 {
        self.redundancy
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn content_hash(&self) -> bool {
        self.content_hash
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Same config with a different algorithm (used by capacity reports).
    pub(crate) fn for_algorithm(&self, algorithm: Algorithm) -> Self {
        Self { algorithm, ..self.clone() }
    }

    /// # Errors
    /// [`StegoError::InvalidConfig`] if the redundancy factor is zero.
    pub fn validate(&self) -> Result<(), StegoError> {
        if self.redundancy == 0 {
            return Err(StegoError::InvalidConfig("redundancy factor must be >= 1".into()));
        }
        Ok(())
    }
}

/// Which strategies extraction should try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractAlgorithm {
    /// Try [`Algorithm::DETECT_ORDER`], accept the first verified match.
    Auto,
    Only(Algorithm),
}

/// Configuration for one extract operation.
///
/// Redundancy, compression, encryption and digest flags are read from the
/// embedded header; only the traversal seed and key must be supplied.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractConfig {
    algorithm: ExtractAlgorithm,
    #[serde(skip)]
    key: Option<Passphrase>,
    #[serde(skip)]
    seed: String,
}

impl ExtractConfig {
    pub fn new(algorithm: ExtractAlgorithm) -> Self {
        Self { algorithm, key: None, seed: String::new() }
    }

    pub fn auto() -> Self {
        Self::new(ExtractAlgorithm::Auto)
    }

    pub fn with_key(mut self, key: Passphrase) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    pub fn algorithm(&self) -> ExtractAlgorithm {
        self.algorithm
    }

    pub fn key(&self) -> Option<&Passphrase> {
        self.key.as_ref()
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Strategies to try, in order.
    pub fn candidates(&self) -> Vec<Algorithm> {
        match self.algorithm {
            ExtractAlgorithm::Auto => Algorithm::DETECT_ORDER.to_vec(),
            ExtractAlgorithm::Only(a) => vec![a],
        }
    }
}

impl From<&EmbedConfig> for ExtractConfig {
    /// The matching extract config for an embed config: same algorithm,
    /// key and seed.
    fn from(cfg: &EmbedConfig) -> Self {
        Self {
            algorithm: ExtractAlgorithm::Only(cfg.algorithm),
            key: cfg.key.clone(),
            seed: cfg.seed.clone(),
        }
    }
}
