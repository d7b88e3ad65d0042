//! Binary blob format
//!
//! Format version 1 layout (all integers big-endian):
//!
//! ```text
//! offset  size  field
//! 0       1     format_version
//! 1       1     kdf_cost_log2 (N = 2^value)
//! 2       4     kdf_block_size (r)
//! 6       4     kdf_parallelism (p)
//! 10      16    salt
//! 26      24    nonce
//! 50      8     payload length m
//! 58      m     ciphertext
//! 58+m    16    authentication tag
//! ```
//!
//! Bytes 0..58 are the associated data authenticated by the tag. Decoding
//! rejects anything malformed before a key is ever derived, so format errors
//! stay distinguishable from authentication failures.

use crate::cipher::{KEY_LEN, NONCE_LEN, TAG_LEN};
use crate::error::{Result, ScryptoError};
use crate::kdf::KdfParams;

/// The only format version this build reads and writes.
pub const FORMAT_VERSION: u8 = 1;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of the fixed header (everything before the payload length).
pub const HEADER_LEN: usize = 1 + 1 + 4 + 4 + SALT_LEN + NONCE_LEN;

/// Length of the associated data: header plus the payload length field.
pub const PREAMBLE_LEN: usize = HEADER_LEN + 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub cost_log2: u8,
    pub block_size: u32,
    pub parallelism: u32,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
}

impl Header {
    /// Creates a current-version header for the given KDF parameters.
    pub fn new(params: &KdfParams, salt: [u8; SALT_LEN], nonce: [u8; NONCE_LEN]) -> Self {
        Self {
            version: FORMAT_VERSION,
            cost_log2: params.cost_log2,
            block_size: params.block_size,
            parallelism: params.parallelism,
            salt,
            nonce,
        }
    }

    /// KDF parameters recorded in the header. Version 1 always derives a
    /// cipher-sized key.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams::new(self.cost_log2, self.block_size, self.parallelism, KEY_LEN)
    }

    fn write_preamble(&self, payload_len: u64, out: &mut Vec<u8>) {
        out.push(self.version);
        out.push(self.cost_log2);
        out.extend_from_slice(&self.block_size.to_be_bytes());
        out.extend_from_slice(&self.parallelism.to_be_bytes());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&payload_len.to_be_bytes());
    }
}

/// The bytes that precede the ciphertext for a payload of `payload_len`
/// bytes. These are authenticated but not encrypted.
pub fn associated_data(header: &Header, payload_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(PREAMBLE_LEN);
    header.write_preamble(payload_len as u64, &mut out);
    out
}

pub fn encode(header: &Header, ciphertext: &[u8], tag: &[u8; TAG_LEN]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PREAMBLE_LEN + ciphertext.len() + TAG_LEN);
    header.write_preamble(ciphertext.len() as u64, &mut out);
    out.extend_from_slice(ciphertext);
    out.extend_from_slice(tag);
    out
}

/// A parsed blob borrowing its payload from the input buffer.
#[derive(Debug)]
pub struct DecodedBlob<'a> {
    pub header: Header,
    pub associated_data: &'a [u8],
    pub ciphertext: &'a [u8],
    pub tag: [u8; TAG_LEN],
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.input.len() - self.pos < len {
            return Err(ScryptoError::format(format!(
                "input likely truncated while reading {}",
                what
            )));
        }
        let bytes = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }
}

pub fn decode(input: &[u8]) -> Result<DecodedBlob<'_>> {
    let mut reader = Reader { input, pos: 0 };

    let [version] = reader
        .take_array::<1>("format version")
        .map_err(|_| ScryptoError::format("empty input"))?;
    if version != FORMAT_VERSION {
        return Err(ScryptoError::format(format!(
            "unsupported format version {} (this build reads version {})",
            version, FORMAT_VERSION
        )));
    }

    let [cost_log2] = reader.take_array::<1>("kdf cost")?;
    let block_size = u32::from_be_bytes(reader.take_array("kdf block size")?);
    let parallelism = u32::from_be_bytes(reader.take_array("kdf parallelism")?);
    let salt = reader.take_array::<SALT_LEN>("salt")?;
    let nonce = reader.take_array::<NONCE_LEN>("nonce")?;
    let payload_len = u64::from_be_bytes(reader.take_array("payload length")?);

    // *Valid* input can fail this check if the platform's isize is small.
    if payload_len > isize::MAX as u64 {
        return Err(ScryptoError::format(
            "payload length exceeds this system's max isize",
        ));
    }
    let payload_len = payload_len as usize;
    if payload_len > reader.remaining() {
        return Err(ScryptoError::format(
            "truncated or corrupt input; claimed length greater than available input",
        ));
    }

    let associated_data = &input[..PREAMBLE_LEN];
    let ciphertext = reader.take(payload_len, "ciphertext")?;
    let tag = reader.take_array::<TAG_LEN>("authentication tag")?;

    if reader.remaining() > 0 {
        return Err(ScryptoError::format(
            "invalid input: unexpected data after authentication tag",
        ));
    }

    Ok(DecodedBlob {
        header: Header {
            version,
            cost_log2,
            block_size,
            parallelism,
            salt,
            nonce,
        },
        associated_data,
        ciphertext,
        tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample_header() -> Header {
        Header::new(&KdfParams::default(), [0x42; SALT_LEN], [0x24; NONCE_LEN])
    }

    fn sample_blob() -> Vec<u8> {
        encode(&sample_header(), b"hello", &[0xAA; TAG_LEN])
    }

    fn assert_format_err(input: &[u8], needle: &str) {
        let err = decode(input).expect_err("expected format error");
        assert_eq!(err.kind, ErrorKind::Format);
        assert!(
            err.to_string().contains(needle),
            "{:?} does not mention {:?}",
            err.to_string(),
            needle
        );
    }

    #[test]
    fn test_layout_offsets() {
        let blob = sample_blob();
        assert_eq!(HEADER_LEN, 50);
        assert_eq!(PREAMBLE_LEN, 58);
        assert_eq!(blob.len(), 58 + 5 + 16);
        assert_eq!(blob[0], FORMAT_VERSION);
        assert_eq!(blob[1], 15);
        assert_eq!(&blob[2..6], &[0, 0, 0, 8]);
        assert_eq!(&blob[6..10], &[0, 0, 0, 1]);
        assert_eq!(&blob[10..26], &[0x42; 16]);
        assert_eq!(&blob[26..50], &[0x24; 24]);
        assert_eq!(&blob[50..58], &[0, 0, 0, 0, 0, 0, 0, 5]);
        assert_eq!(&blob[58..63], b"hello");
        assert_eq!(&blob[63..], &[0xAA; 16]);
    }

    #[test]
    fn test_decode_matches_encode() {
        let blob = sample_blob();
        let decoded = decode(&blob).unwrap();
        assert_eq!(decoded.header, sample_header());
        assert_eq!(decoded.ciphertext, b"hello");
        assert_eq!(decoded.tag, [0xAA; TAG_LEN]);
        assert_eq!(decoded.associated_data, &blob[..PREAMBLE_LEN]);
        assert_eq!(
            decoded.associated_data,
            &associated_data(&sample_header(), 5)[..]
        );
        assert_eq!(decoded.header.kdf_params(), KdfParams::default());
    }

    #[test]
    fn test_empty_payload() {
        let blob = encode(&sample_header(), b"", &[0u8; TAG_LEN]);
        let decoded = decode(&blob).unwrap();
        assert!(decoded.ciphertext.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert_format_err(&[], "empty input");
    }

    #[test]
    fn test_unknown_version() {
        let mut blob = sample_blob();
        blob[0] = 2;
        assert_format_err(&blob, "unsupported format version 2");
        blob[0] = 0;
        assert_format_err(&blob, "unsupported format version 0");
    }

    #[test]
    fn test_truncated_header_fields() {
        let blob = sample_blob();
        assert_format_err(&blob[..1], "kdf cost");
        assert_format_err(&blob[..5], "kdf block size");
        assert_format_err(&blob[..9], "kdf parallelism");
        assert_format_err(&blob[..20], "salt");
        assert_format_err(&blob[..40], "nonce");
        assert_format_err(&blob[..55], "payload length");
    }

    #[test]
    fn test_truncated_tag() {
        let blob = sample_blob();
        assert_format_err(&blob[..blob.len() - 1], "authentication tag");
    }

    #[test]
    fn test_length_exceeds_available() {
        let mut blob = sample_blob();
        blob[50..58].copy_from_slice(&1_000_000u64.to_be_bytes());
        assert_format_err(&blob, "claimed length greater than available input");
    }

    #[test]
    fn test_length_exceeds_isize() {
        let mut blob = sample_blob();
        blob[50..58].copy_from_slice(&u64::MAX.to_be_bytes());
        assert_format_err(&blob, "max isize");
    }

    #[test]
    fn test_trailing_data() {
        let mut blob = sample_blob();
        blob.push(0xFF);
        assert_format_err(&blob, "unexpected data after authentication tag");
    }
}
