use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// Use of Internal is never a guarantee the error is not, for example,
    /// due to a user error - merely that it cannot be confidently determined
    /// by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// The failure taxonomy every scrypto error belongs to.
///
/// Callers branch on this; the CLI maps each kind to its own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Key derivation parameters are outside the accepted bounds, or a
    /// component was constructed with an unusable key or salt.
    Configuration,
    /// The input is not a well-formed scrypto blob (unknown version,
    /// truncated, trailing data, bad armor).
    Format,
    /// The authentication tag did not verify. Wrong passphrase, tampering and
    /// corruption are intentionally indistinguishable.
    Authentication,
    /// Interaction with the filesystem, stdin/stdout or the terminal failed.
    Io,
}

impl ErrorKind {
    /// Process exit code used by the CLI for this kind of failure.
    ///
    /// Exit code 2 is left to clap for usage errors.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Configuration => 3,
            ErrorKind::Format => 4,
            ErrorKind::Authentication => 5,
            ErrorKind::Io => 6,
        }
    }
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct ScryptoError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Which part of the taxonomy this failure belongs to.
    pub kind: ErrorKind,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl ScryptoError {
    /// Creates a new error with a category, a kind and a display message.
    pub fn new(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::User, ErrorKind::Configuration, msg)
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::User, ErrorKind::Format, msg)
    }

    pub(crate) fn authentication() -> Self {
        Self::new(
            ErrorCategory::User,
            ErrorKind::Authentication,
            "corrupt input, tampered-with data, or bad passphrase",
        )
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving
    /// the original as source. Category and kind carry over unchanged.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    /// Renders the message followed by every source in the chain, separated
    /// by `": "`.
    pub fn chain_message(&self) -> String {
        let mut rendered = self.msg.clone();
        let mut next = StdError::source(self);
        while let Some(err) = next {
            rendered.push_str(": ");
            rendered.push_str(&err.to_string());
            next = err.source();
        }
        rendered
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ScryptoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_exit_codes_are_distinct() {
        let kinds = [
            ErrorKind::Configuration,
            ErrorKind::Format,
            ErrorKind::Authentication,
            ErrorKind::Io,
        ];
        let mut codes: Vec<i32> = kinds.iter().map(|k| k.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(codes.iter().all(|&c| c != 0 && c != 2));
    }

    #[test]
    fn test_context_preserves_kind_and_category() {
        let err = ScryptoError::format("bad header").with_context("failed to decrypt");
        assert_eq!(err.kind, ErrorKind::Format);
        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(err.message(), "failed to decrypt");
        assert_eq!(err.chain_message(), "failed to decrypt: bad header");
    }

    #[test]
    fn test_chain_includes_io_source() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let err = ScryptoError::with_source(
            ErrorCategory::User,
            ErrorKind::Io,
            "failed to read from in.txt",
            io_err,
        );
        assert!(err.source_error().is_some());
        assert_eq!(
            err.chain_message(),
            "failed to read from in.txt: no such file"
        );
    }
}
