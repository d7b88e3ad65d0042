//! File encryption/decryption operations
//!
//! Whole-file read, encrypt or decrypt in memory, then an atomic write: the
//! result goes to a temp file next to the target and is renamed into place
//! only once fully written and synced. A failed run never leaves a partial
//! (or any) output file behind, and never clobbers an existing one.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ErrorCategory, ErrorKind, Result, ScryptoError};
use crate::kdf::{KdfLimits, KdfParams};
use crate::passphrase::PassphraseReader;
use crate::secretcrypt::SecretCrypt;
use crate::varmor;

/// Settings for [`encrypt_file`].
#[derive(Debug, Clone, Default)]
pub struct EncryptOptions {
    pub params: KdfParams,
    pub limits: KdfLimits,
    /// Write text armor instead of the raw binary blob.
    pub armor: bool,
}

/// Settings for [`decrypt_file`].
#[derive(Debug, Clone, Default)]
pub struct DecryptOptions {
    pub limits: KdfLimits,
}

/// Encrypt a file with a passphrase
///
/// Reads plaintext from `input_path`, encrypts it using a passphrase from
/// `passphrase_reader`, and atomically writes the blob to `output_path`.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
    options: &EncryptOptions,
) -> Result<()> {
    let secretcrypt = SecretCrypt::new(options.params, options.limits)?;
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    debug!(path = %input_path.display(), len = plaintext.len(), "read plaintext");

    let passphrase = passphrase_reader.read_passphrase()?;
    let blob = secretcrypt
        .encrypt(&passphrase, &plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;

    let contents = if options.armor {
        varmor::wrap(&blob).into_bytes()
    } else {
        blob
    };
    write_atomic(output_path, &contents)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(path = %output_path.display(), armored = options.armor, "file encrypted");
    Ok(())
}

/// Decrypt a file with a passphrase
///
/// Reads a binary or armored blob from `input_path`, decrypts it using a
/// passphrase from `passphrase_reader`, and atomically writes the plaintext
/// to `output_path`.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
    options: &DecryptOptions,
) -> Result<()> {
    let raw = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let blob = if varmor::is_armored(&raw) {
        debug!("input is armored");
        let text = std::str::from_utf8(&raw).map_err(|e| {
            ScryptoError::with_source(
                ErrorCategory::User,
                ErrorKind::Format,
                "armored input is not valid UTF-8",
                e,
            )
        })?;
        varmor::unwrap(text).map_err(|e| e.with_context("failed to unarmor"))?
    } else {
        raw
    };

    let passphrase = passphrase_reader.read_passphrase()?;
    let plaintext = SecretCrypt::with_limits(options.limits)
        .decrypt(&passphrase, &blob)
        .map_err(|e| e.with_context("failed to decrypt"))?;

    write_atomic(output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(path = %output_path.display(), "file decrypted");
    Ok(())
}

/// Write `contents` to `target` via a temp file in the same directory,
/// flushed, synced and restricted to the owner (0o600 on Unix) before the
/// rename.
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = tempfile::Builder::new()
        .prefix(".scrypto-tmp")
        .tempfile_in(dir)
        .map_err(|e| io_error(ErrorCategory::User, "failed to create tempfile", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                io_error(
                    ErrorCategory::Internal,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }

    temp_file
        .write_all(contents)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to flush tempfile", e))?;
    temp_file.as_file().sync_all().map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    temp_file.persist(target).map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            format!("failed to rename to target file {}", target.display()),
            e.error,
        )
    })?;
    Ok(())
}

fn io_error(category: ErrorCategory, msg: impl Into<String>, err: io::Error) -> ScryptoError {
    ScryptoError::with_source(category, ErrorKind::Io, msg, err)
}

fn read_error(path: &Path, err: io::Error) -> ScryptoError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    io_error(category, format!("failed to read from {}", path.display()), err)
}
