// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Content digest: SHA-256 appended to the frame, verified after
//! reconciliation.

use sha2::{Digest, Sha256};

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Append the SHA-256 of `body` to it.
pub fn seal(mut body: Vec<u8>) -> Vec<u8> {
    let digest = Sha256::digest(&body);
    body.extend_from_slice(&digest);
    body
}

/// Split off and verify the trailing digest. `None` on mismatch or if the
/// frame is too short to hold a digest.
pub fn verify(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < DIGEST_LEN {
        return None;
    }
    let (body, stored) = frame.split_at(frame.len() - DIGEST_LEN);
    let computed = Sha256::digest(body);
    // Not secret material; plain comparison is fine.
    if computed.as_slice() == stored {
        Some(body)
    } else {
        None
    }
}
