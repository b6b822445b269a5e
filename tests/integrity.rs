// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Tamper detection, redundancy recovery and authentication failures.

mod common;

use common::noisy_rgb;
use stegforge::progress::Unobserved;
use stegforge::stego::frame::HEADER_BITS;
use stegforge::stego::permute::{traversal_prefix, traversal_seed};
use stegforge::{
    embed, extract, Algorithm, CarrierImage, EmbedConfig, ErrorKind, ExtractAlgorithm, ExtractConfig,
    Passphrase, Payload, StegoError,
};

/// Flip the LSB carrying body bit `k` of an LSB-embedded RGB image.
fn flip_body_bit(image: &CarrierImage, seed: &str, k: usize) -> CarrierImage {
    let units = image.color_sample_count();
    let order = traversal_prefix(units, HEADER_BITS + k + 1, &traversal_seed(seed, Algorithm::Lsb));
    let mut samples = image.samples().to_vec();
    // RGB has no alpha: unit index == sample index.
    samples[order[HEADER_BITS + k]] ^= 1;
    CarrierImage::from_raw(image.width(), image.height(), image.layout(), samples).unwrap()
}

#[test]
fn single_bit_flip_detected_by_digest() {
    let carrier = noisy_rgb(64, 64, 21);
    let config = EmbedConfig::new(Algorithm::Lsb).with_content_hash(true).with_seed("tamper");
    let out = embed(&carrier, &Payload::text("do not touch"), &config, &Unobserved).unwrap();

    for k in [0, 7, 50, 100] {
        let tampered = flip_body_bit(out.stego.image(), "tamper", k);
        let result = extract(&tampered, &ExtractConfig::from(&config), &Unobserved).unwrap();
        assert_eq!(result.payload, None, "flip of body bit {k} went unnoticed");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.failure, Some(ErrorKind::AuthenticationFailure));
    }
}

#[test]
fn redundancy_outvotes_a_corrupted_copy() {
    let carrier = noisy_rgb(64, 64, 22);
    let config = EmbedConfig::new(Algorithm::Lsb)
        .with_redundancy(3)
        .with_content_hash(true)
        .with_seed("vote");
    let payload = Payload::text("three copies");
    let out = embed(&carrier, &payload, &config, &Unobserved).unwrap();

    // Frame: 1 envelope + 12 text + 32 digest = 45 bytes per copy.
    let frame_bits = 45 * 8;
    let mut damaged = out.stego.image().clone();
    for k in [3, 40, 200] {
        damaged = flip_body_bit(&damaged, "vote", frame_bits + k);
    }
    let result = extract(&damaged, &ExtractConfig::from(&config), &Unobserved).unwrap();
    assert_eq!(result.payload, Some(payload));
    assert!(result.confidence < 1.0);
    assert!(result.confidence > 0.99);
}

#[test]
fn wrong_key_reports_authentication_failure() {
    let carrier = noisy_rgb(64, 64, 23);
    let config = EmbedConfig::new(Algorithm::Lsb).with_encryption(Passphrase::new("right"));
    let out = embed(&carrier, &Payload::text("classified"), &config, &Unobserved).unwrap();

    let wrong = ExtractConfig::auto().with_key(Passphrase::new("wrong"));
    let result = extract(out.stego.image(), &wrong, &Unobserved).unwrap();
    assert_eq!(result.payload, None);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.failure, Some(ErrorKind::AuthenticationFailure));

    let missing = ExtractConfig::auto();
    let result = extract(out.stego.image(), &missing, &Unobserved).unwrap();
    assert_eq!(result.failure, Some(ErrorKind::AuthenticationFailure));
}

#[test]
fn clean_carriers_have_no_embedding() {
    for seed in 0..4 {
        let result = extract(&noisy_rgb(96, 96, seed), &ExtractConfig::auto(), &Unobserved);
        assert_eq!(result, Err(StegoError::NoEmbeddingDetected));
    }
}

#[test]
fn forced_strategy_ignores_other_embeddings() {
    let carrier = noisy_rgb(256, 256, 24);
    let config = EmbedConfig::new(Algorithm::Dct);
    let out = embed(&carrier, &Payload::text("dct only"), &config, &Unobserved).unwrap();
    let lsb_only = ExtractConfig::new(ExtractAlgorithm::Only(Algorithm::Lsb));
    assert_eq!(extract(out.stego.image(), &lsb_only, &Unobserved), Err(StegoError::NoEmbeddingDetected));
}

#[test]
fn encryption_hides_plaintext_bits() {
    let carrier = noisy_rgb(64, 64, 25);
    let text = "A".repeat(64);
    let plain = embed(&carrier, &Payload::text(text.clone()), &EmbedConfig::new(Algorithm::Lsb), &Unobserved)
        .unwrap();
    let sealed = embed(
        &carrier,
        &Payload::text(text),
        &EmbedConfig::new(Algorithm::Lsb).with_encryption(Passphrase::new("k")),
        &Unobserved,
    )
    .unwrap();
    assert_ne!(plain.stego.image().samples(), sealed.stego.image().samples());
    assert_eq!(sealed.frame_bytes, 1 + 64 + 44);
}
