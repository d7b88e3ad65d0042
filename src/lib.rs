//! scrypto - password-based file encryption with scrypt and XChaCha20-Poly1305

#![forbid(unsafe_code)]

pub mod blob;
pub mod cipher;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod passphrase;
pub mod secretcrypt;
pub mod varmor;
