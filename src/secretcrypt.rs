//! Encryption/decryption using scrypt + XChaCha20-Poly1305
//!
//! This module ties the pieces together:
//! - scrypt (see [`crate::kdf`]) derives a key from the passphrase and a
//!   random salt
//! - XChaCha20-Poly1305 (see [`crate::cipher`]) seals the plaintext, with the
//!   blob header as associated data
//! - [`crate::blob`] lays out header, ciphertext and tag
//!
//! A [`SecretCrypt`] is a plain value built from explicit parameters; there
//! is no process-wide state.

use rand::RngCore;
use rand::rngs::OsRng;
use tracing::debug;

use crate::blob::{self, Header, SALT_LEN};
use crate::cipher::{self, Cipher, KEY_LEN, NONCE_LEN};
use crate::error::{Result, ScryptoError};
use crate::kdf::{Kdf, KdfLimits, KdfParams};

#[derive(Debug, Clone)]
pub struct SecretCrypt {
    params: KdfParams,
    kdf: Kdf,
}

impl SecretCrypt {
    /// Validates `params` against `limits` up front so a bad configuration
    /// is reported before any input is read.
    pub fn new(params: KdfParams, limits: KdfLimits) -> Result<Self> {
        if params.key_length != KEY_LEN {
            return Err(ScryptoError::configuration(format!(
                "key length must be {} bytes for XChaCha20-Poly1305, got {}",
                KEY_LEN, params.key_length
            )));
        }
        params.validate(&limits)?;
        Ok(Self {
            params,
            kdf: Kdf::new(limits),
        })
    }

    /// An instance for decryption under `limits`. Its encryption parameters
    /// are the defaults and are only checked once a key is derived.
    pub fn with_limits(limits: KdfLimits) -> Self {
        Self {
            params: KdfParams::default(),
            kdf: Kdf::new(limits),
        }
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Encrypt plaintext with a passphrase using random salt and nonce
    pub fn encrypt(&self, passphrase: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let nonce = cipher::generate_nonce();

        self.encrypt_deterministic(passphrase, plaintext, &salt, &nonce)
    }

    /// Encrypt plaintext with a passphrase using provided salt and nonce
    ///
    /// This function is ONLY for testing purposes to generate deterministic output.
    /// NEVER use this in production - always use `encrypt()` which generates random salt/nonce.
    pub fn encrypt_deterministic(
        &self,
        passphrase: &[u8],
        plaintext: &[u8],
        salt: &[u8; SALT_LEN],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>> {
        let key = self.kdf.derive(passphrase, salt, &self.params)?;
        let cipher = Cipher::new(&key)?;

        let header = Header::new(&self.params, *salt, *nonce);
        let aad = blob::associated_data(&header, plaintext.len());
        let sealed = cipher.seal_with_nonce(nonce, plaintext, &aad)?;

        debug!(plaintext_len = plaintext.len(), "sealed payload");
        Ok(blob::encode(&header, &sealed.ciphertext, &sealed.tag))
    }

    /// Decrypt a blob with a passphrase
    ///
    /// The KDF parameters come from the blob header and are checked against
    /// this instance's limits, not its encryption parameters.
    pub fn decrypt(&self, passphrase: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let decoded = blob::decode(ciphertext)?;
        let params = decoded.header.kdf_params();
        debug!(
            cost_log2 = params.cost_log2,
            block_size = params.block_size,
            parallelism = params.parallelism,
            payload_len = decoded.ciphertext.len(),
            "decoded blob header"
        );

        let key = self
            .kdf
            .derive(passphrase, &decoded.header.salt, &params)
            .map_err(|e| e.with_context("refusing to derive key from blob header"))?;
        let cipher = Cipher::new(&key)?;

        cipher.open(
            &decoded.header.nonce,
            decoded.ciphertext,
            &decoded.tag,
            decoded.associated_data,
        )
    }
}

impl Default for SecretCrypt {
    fn default() -> Self {
        Self::with_limits(KdfLimits::default())
    }
}

/// Encrypt plaintext with a passphrase using the default parameters
pub fn encrypt(passphrase: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    SecretCrypt::default().encrypt(passphrase, plaintext)
}

/// Decrypt ciphertext with a passphrase using the default limits
pub fn decrypt(passphrase: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    SecretCrypt::default().decrypt(passphrase, ciphertext)
}
