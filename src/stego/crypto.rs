// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Cipher stage: authenticated payload encryption.
//!
//! The payload envelope is sealed with AES-256-GCM-SIV under a key derived
//! from the passphrase and a random salt with Argon2id. Salt and nonce are
//! stored in front of the ciphertext, so the sealed blob is self-contained:
//!
//! ```text
//! [16 bytes] Argon2 salt
//! [12 bytes] AES-GCM-SIV nonce
//! [N bytes ] ciphertext (plaintext_len + 16-byte auth tag)
//! ```
//!
//! AES-256-GCM-SIV is nonce-misuse resistant, which matters because the
//! nonce is random and travels with the data.

use aes_gcm_siv::aead::Aead;
use aes_gcm_siv::{Aes256GcmSiv, KeyInit, Nonce};
use argon2::Argon2;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::stego::config::Passphrase;
use crate::stego::error::StegoError;

/// AES-GCM-SIV nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// Argon2 salt length in bytes.
pub const SALT_LEN: usize = 16;
/// AES-GCM-SIV authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Bytes added by [`seal`]: salt + nonce + tag.
pub const CIPHER_OVERHEAD: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// Derive the AES-256 key from passphrase + salt.
fn derive_key(passphrase: &Passphrase, salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, StegoError> {
    let mut key = Zeroizing::new([0u8; 32]);
    Argon2::default()
        .hash_password_into(passphrase.expose().as_bytes(), salt, &mut *key)
        .map_err(|e| StegoError::InternalCodecFault(format!("key derivation: {e}")))?;
    Ok(key)
}

fn cipher_for(passphrase: &Passphrase, salt: &[u8]) -> Result<Aes256GcmSiv, StegoError> {
    let key = derive_key(passphrase, salt)?;
    Aes256GcmSiv::new_from_slice(&*key)
        .map_err(|_| StegoError::InternalCodecFault("invalid AES key length".into()))
}

/// Encrypt `plaintext` with a fresh random salt and nonce.
///
/// Returns `salt || nonce || ciphertext_with_tag`.
pub fn seal(plaintext: &[u8], passphrase: &Passphrase) -> Result<Vec<u8>, StegoError> {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);

    let cipher = cipher_for(passphrase, &salt)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| StegoError::InternalCodecFault("AES-GCM-SIV encryption failed".into()))?;

    let mut sealed = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&salt);
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a blob produced by [`seal`].
///
/// # Errors
/// [`StegoError::AuthenticationFailure`] if the blob is truncated, the key is
/// wrong, or any byte was tampered with.
pub fn open(sealed: &[u8], passphrase: &Passphrase) -> Result<Vec<u8>, StegoError> {
    if sealed.len() < CIPHER_OVERHEAD {
        return Err(StegoError::AuthenticationFailure);
    }
    let (salt, rest) = sealed.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let cipher = cipher_for(passphrase, salt)?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| StegoError::AuthenticationFailure)
}
