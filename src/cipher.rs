//! Authenticated encryption using XChaCha20-Poly1305
//!
//! The 24-byte nonce is large enough to be drawn at random for every message
//! without tracking state. The Poly1305 tag covers the ciphertext and the
//! caller-supplied associated data (the blob header); it is verified in
//! constant time before any plaintext is produced.

use std::fmt;
use std::mem;

use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{Key, Tag, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, Result, ScryptoError};

/// Length of the cipher key in bytes
pub const KEY_LEN: usize = 32;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 24;

/// Length of the Poly1305 authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Output of a seal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

/// Draw a fresh nonce from the OS RNG.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Authenticated cipher unit bound to a single key.
pub struct Cipher {
    aead: XChaCha20Poly1305,
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

impl Cipher {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(ScryptoError::configuration(format!(
                "cipher key must be {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }
        Ok(Self {
            aead: XChaCha20Poly1305::new(Key::from_slice(key)),
        })
    }

    /// Encrypt `plaintext` under a freshly generated random nonce.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
        self.seal_with_nonce(&generate_nonce(), plaintext, aad)
    }

    /// Encrypt `plaintext` under the given nonce.
    ///
    /// Reusing a nonce under the same key breaks confidentiality and
    /// integrity. Callers outside of known-answer tests should use
    /// [`Cipher::seal`] or a nonce from [`generate_nonce`].
    pub fn seal_with_nonce(
        &self,
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Sealed> {
        let mut buffer = plaintext.to_vec();
        let tag = self
            .aead
            .encrypt_in_place_detached(XNonce::from_slice(nonce), aad, &mut buffer)
            .map_err(|_| {
                ScryptoError::new(
                    ErrorCategory::Internal,
                    ErrorKind::Configuration,
                    "encryption failed: plaintext too long",
                )
            })?;

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(&tag);

        Ok(Sealed {
            nonce: *nonce,
            ciphertext: buffer,
            tag: tag_bytes,
        })
    }

    /// Verify `tag` over `ciphertext` and `aad`, then decrypt.
    ///
    /// Fails closed: on any mismatch no plaintext is returned.
    pub fn open(
        &self,
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
        tag: &[u8; TAG_LEN],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        // Wiped when dropped on the error path.
        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        self.aead
            .decrypt_in_place_detached(
                XNonce::from_slice(nonce),
                aad,
                buffer.as_mut_slice(),
                Tag::from_slice(tag),
            )
            .map_err(|_| ScryptoError::authentication())?;
        Ok(mem::take(&mut *buffer))
    }
}
