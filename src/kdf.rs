//! Password-based key derivation using scrypt
//!
//! scrypt is memory-hard and CPU-hard: the cost factor N scales both the
//! work and the memory (`128 * r * N` bytes) needed per guess. Parameters
//! are always explicit and validated against a [`KdfLimits`] policy, both
//! when encrypting and when read back from an untrusted blob header.

use std::time::Instant;

use scrypt::{Params, scrypt};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, Result, ScryptoError};

/// Minimum salt length accepted by [`Kdf::derive`].
pub const MIN_SALT_LEN: usize = 16;

/// Default log2 of the scrypt N parameter (N = 32768)
pub const DEFAULT_COST_LOG2: u8 = 15;

/// Default scrypt r parameter (block size)
pub const DEFAULT_BLOCK_SIZE: u32 = 8;

/// Default scrypt p parameter (parallelization)
pub const DEFAULT_PARALLELISM: u32 = 1;

/// Default derived key length in bytes
pub const DEFAULT_KEY_LENGTH: usize = 32;

const MIN_KEY_LENGTH: usize = 16;
const MAX_KEY_LENGTH: usize = 64;

/// scrypt tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// log2 of the cost factor N.
    pub cost_log2: u8,
    /// Block size r.
    pub block_size: u32,
    /// Parallelism p.
    pub parallelism: u32,
    /// Length of the derived key in bytes.
    pub key_length: usize,
}

impl KdfParams {
    pub fn new(cost_log2: u8, block_size: u32, parallelism: u32, key_length: usize) -> Self {
        Self {
            cost_log2,
            block_size,
            parallelism,
            key_length,
        }
    }

    /// Bytes of memory scrypt allocates for these parameters, or `None` if
    /// the figure does not fit in a u64.
    pub fn memory_required(&self) -> Option<u64> {
        let n = 1u64.checked_shl(u32::from(self.cost_log2))?;
        let block = 128u64.checked_mul(u64::from(self.block_size))?;
        let blocks = n
            .checked_add(u64::from(self.parallelism))?
            .checked_add(1)?;
        block.checked_mul(blocks)
    }

    /// Checks the parameters against `limits`.
    ///
    /// Out-of-bounds values are rejected, never clamped.
    pub fn validate(&self, limits: &KdfLimits) -> Result<()> {
        if self.cost_log2 < limits.min_cost_log2 {
            return Err(ScryptoError::configuration(format!(
                "scrypt cost 2^{} is below the minimum of 2^{}",
                self.cost_log2, limits.min_cost_log2
            )));
        }
        if self.cost_log2 > limits.max_cost_log2 {
            return Err(ScryptoError::configuration(format!(
                "scrypt cost 2^{} exceeds the maximum of 2^{}",
                self.cost_log2, limits.max_cost_log2
            )));
        }
        if self.block_size == 0 || self.parallelism == 0 {
            return Err(ScryptoError::configuration(
                "scrypt block size and parallelism must both be at least 1",
            ));
        }
        if self.parallelism > limits.max_parallelism {
            return Err(ScryptoError::configuration(format!(
                "scrypt parallelism {} exceeds the maximum of {}",
                self.parallelism, limits.max_parallelism
            )));
        }
        let rp = u64::from(self.block_size) * u64::from(self.parallelism);
        if rp > limits.max_block_parallelism {
            return Err(ScryptoError::configuration(format!(
                "scrypt block size * parallelism = {} exceeds the maximum of {}",
                rp, limits.max_block_parallelism
            )));
        }
        match self.memory_required() {
            Some(mem) if mem <= limits.max_memory_bytes => {}
            Some(mem) => {
                return Err(ScryptoError::configuration(format!(
                    "scrypt would need {} bytes of memory, more than the configured ceiling of {}",
                    mem, limits.max_memory_bytes
                )));
            }
            None => {
                return Err(ScryptoError::configuration(
                    "scrypt memory requirement overflows",
                ));
            }
        }
        if !(MIN_KEY_LENGTH..=MAX_KEY_LENGTH).contains(&self.key_length) {
            return Err(ScryptoError::configuration(format!(
                "derived key length {} is outside {}..={}",
                self.key_length, MIN_KEY_LENGTH, MAX_KEY_LENGTH
            )));
        }
        self.scrypt_params()?;
        Ok(())
    }

    fn scrypt_params(&self) -> Result<Params> {
        Params::new(
            self.cost_log2,
            self.block_size,
            self.parallelism,
            self.key_length,
        )
        .map_err(|e| {
            ScryptoError::with_source(
                ErrorCategory::User,
                ErrorKind::Configuration,
                "scrypt rejected the parameters",
                e,
            )
        })
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::new(
            DEFAULT_COST_LOG2,
            DEFAULT_BLOCK_SIZE,
            DEFAULT_PARALLELISM,
            DEFAULT_KEY_LENGTH,
        )
    }
}

/// Bounds that [`KdfParams`] must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfLimits {
    pub min_cost_log2: u8,
    pub max_cost_log2: u8,
    /// Upper bound on `parallelism`. Each lane is a full sequential pass
    /// over `128 * r * N` bytes, so the memory ceiling alone does not bound
    /// running time.
    pub max_parallelism: u32,
    /// Upper bound on `block_size * parallelism`.
    pub max_block_parallelism: u64,
    pub max_memory_bytes: u64,
}

impl Default for KdfLimits {
    fn default() -> Self {
        Self {
            min_cost_log2: 14,
            max_cost_log2: 30,
            max_parallelism: 16,
            max_block_parallelism: 1024,
            max_memory_bytes: 1 << 30, // 1 GiB
        }
    }
}

/// Key derivation unit. Holds only the policy it enforces.
#[derive(Debug, Clone, Default)]
pub struct Kdf {
    limits: KdfLimits,
}

impl Kdf {
    pub fn new(limits: KdfLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &KdfLimits {
        &self.limits
    }

    /// Derive a key of `params.key_length` bytes from `password` and `salt`.
    ///
    /// Deterministic: the same inputs always yield the same key.
    pub fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
        params: &KdfParams,
    ) -> Result<Zeroizing<Vec<u8>>> {
        if salt.len() < MIN_SALT_LEN {
            return Err(ScryptoError::configuration(format!(
                "salt must be at least {} bytes, got {}",
                MIN_SALT_LEN,
                salt.len()
            )));
        }
        params.validate(&self.limits)?;
        let scrypt_params = params.scrypt_params()?;

        debug!(
            cost_log2 = params.cost_log2,
            block_size = params.block_size,
            parallelism = params.parallelism,
            "deriving key"
        );
        let started = Instant::now();

        let mut key = Zeroizing::new(vec![0u8; params.key_length]);
        scrypt(password, salt, &scrypt_params, key.as_mut_slice()).map_err(|e| {
            ScryptoError::with_source(
                ErrorCategory::Internal,
                ErrorKind::Configuration,
                "scrypt key derivation failed",
                e,
            )
        })?;

        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "key derived");
        Ok(key)
    }
}
