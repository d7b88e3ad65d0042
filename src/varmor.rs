//! Optional text armor for blobs
//!
//! An armored blob is the binary blob encoded as unpadded base64url behind a
//! versioned marker, e.g. `scrypto1:AQ8AAAAI...`. The result:
//! - contains no whitespace (including newlines)
//! - is safe to embed in URLs
//! - is safe to pass unescaped in a POSIX shell
//!
//! Binary blobs start with the format version byte (`0x01`), so armored and
//! binary input never collide and decryption can detect which one it got.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::error::{ErrorCategory, ErrorKind, Result, ScryptoError};

/// Magic prefix for all armor versions
const MAGIC_PREFIX: &str = "scrypto";

/// Version 1 marker
const V1_MAGIC: &str = "scrypto1:";

/// Whether `input` looks like armored data (of any version).
pub fn is_armored(input: &[u8]) -> bool {
    input.starts_with(MAGIC_PREFIX.as_bytes())
}

/// Wrap bytes in armor, returning the armored string
pub fn wrap(body: &[u8]) -> String {
    format!("{}{}", V1_MAGIC, URL_SAFE_NO_PAD.encode(body))
}

/// Unwrap an armored string, returning the original bytes
///
/// A single trailing newline is tolerated so files edited by hand still
/// decode.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    let armored = armored
        .strip_suffix("\r\n")
        .or_else(|| armored.strip_suffix('\n'))
        .unwrap_or(armored);

    if let Some(encoded) = armored.strip_prefix(V1_MAGIC) {
        URL_SAFE_NO_PAD.decode(encoded).map_err(|e| {
            ScryptoError::with_source(
                ErrorCategory::User,
                ErrorKind::Format,
                format!("base64 decoding failed: {}", e),
                e,
            )
        })
    } else if V1_MAGIC.starts_with(armored) {
        Err(ScryptoError::format(
            "input size smaller than armor marker; likely truncated",
        ))
    } else if armored.starts_with(MAGIC_PREFIX) {
        Err(ScryptoError::format(
            "input claims to be scrypto armor, but not a version we support",
        ))
    } else {
        Err(ScryptoError::format("input unrecognized as scrypto armor"))
    }
}
