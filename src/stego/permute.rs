// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Keyed traversal order over embedding units.
//!
//! Every strategy visits its units (samples, blocks, tiles) in a
//! pseudo-random order drawn from a ChaCha20 PRNG seeded by the config's
//! traversal seed. The seed is never stored in the image; encoder and
//! decoder reproduce the order from the config alone.
//!
//! The shuffle is a forward, sparse Fisher-Yates: step `i` swaps position
//! `i` with a uniform position in `i..n`. The first `k` outputs do not
//! depend on how many are requested, so extraction can read the header
//! prefix first and the full stream afterwards with the same order.
//!
//! # Cross-platform portability
//!
//! `gen_range` is drawn over `u32` (not `usize`). `usize` is 32-bit on WASM
//! and 64-bit on native, which would make `gen_range` consume different
//! amounts of entropy per step and produce a different order.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use crate::stego::config::Algorithm;

const TRAVERSAL_DOMAIN: &[u8] = b"stegforge-traversal-v1";

/// Derive the 32-byte PRNG seed for a strategy from the config seed string.
///
/// The algorithm is mixed in so the same seed yields unrelated orders per
/// strategy.
pub fn traversal_seed(seed: &str, algorithm: Algorithm) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(TRAVERSAL_DOMAIN);
    hasher.update([algorithm.id()]);
    hasher.update(seed.as_bytes());
    hasher.finalize().into()
}

/// First `k` entries of a keyed permutation of `0..n`.
///
/// `n` must fit in a `u32`; carriers are bounded well below that.
pub fn traversal_prefix(n: usize, k: usize, seed: &[u8; 32]) -> Vec<usize> {
    debug_assert!(n <= u32::MAX as usize);
    let k = k.min(n);
    let n = n as u32;
    let mut rng = ChaCha20Rng::from_seed(*seed);
    let mut displaced: HashMap<u32, u32> = HashMap::with_capacity(k);
    let mut order = Vec::with_capacity(k);

    for i in 0..k as u32 {
        let j = rng.gen_range(i..n);
        let at_i = displaced.get(&i).copied().unwrap_or(i);
        let at_j = displaced.get(&j).copied().unwrap_or(j);
        displaced.insert(j, at_i);
        displaced.remove(&i);
        order.push(at_j as usize);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let seed = [42u8; 32];
        assert_eq!(traversal_prefix(500, 500, &seed), traversal_prefix(500, 500, &seed));
    }

    #[test]
    fn full_prefix_is_a_permutation() {
        let mut order = traversal_prefix(252, 252, &[0u8; 32]);
        order.sort_unstable();
        assert_eq!(order, (0..252).collect::<Vec<_>>());
    }

    #[test]
    fn prefix_is_stable() {
        let seed = [9u8; 32];
        let long = traversal_prefix(10_000, 400, &seed);
        let short = traversal_prefix(10_000, 240, &seed);
        assert_eq!(&long[..240], &short[..]);
    }

    #[test]
    fn prefix_has_no_duplicates() {
        let mut order = traversal_prefix(1000, 600, &[3u8; 32]);
        order.sort_unstable();
        order.dedup();
        assert_eq!(order.len(), 600);
        assert!(order.iter().all(|&i| i < 1000));
    }

    #[test]
    fn different_seeds_differ() {
        let a = traversal_prefix(64, 64, &[1u8; 32]);
        let b = traversal_prefix(64, 64, &[2u8; 32]);
        assert_ne!(a, b);
    }

    #[test]
    fn k_clamped_to_n() {
        assert_eq!(traversal_prefix(5, 50, &[0u8; 32]).len(), 5);
        assert!(traversal_prefix(0, 10, &[0u8; 32]).is_empty());
    }

    #[test]
    fn seed_depends_on_algorithm() {
        assert_ne!(traversal_seed("k", Algorithm::Lsb), traversal_seed("k", Algorithm::Dct));
        assert_eq!(traversal_seed("k", Algorithm::Dwt), traversal_seed("k", Algorithm::Dwt));
    }
}
