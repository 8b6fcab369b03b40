//! SHA-1 digest values and the two-tier local summary.
//!
//! Every digest leaves this crate as uppercase hex so it can be compared textually
//! against digests produced by `sha1sum` (or a helper script) on another machine.

use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

/// Size of the prefix block hashed on its own: 128 KiB.
pub const BLOCK_SIZE: usize = 128 * 1024;

/// Raw SHA-1 output length.
pub const DIGEST_LEN: usize = 20;

/// A 160-bit SHA-1 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DigestValue([u8; DIGEST_LEN]);

impl DigestValue {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Digest of an in-memory byte slice.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Self::from_hasher(hasher)
    }

    pub(crate) fn from_hasher(hasher: Sha1) -> Self {
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Uppercase hex, the canonical text form.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Display for DigestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Error returned when a string is not exactly 40 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid SHA-1 digest {0:?}")]
pub struct InvalidDigest(pub String);

impl FromStr for DigestValue {
    type Err = InvalidDigest;

    /// Accepts either case; `hex` decodes both.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| InvalidDigest(s.to_string()))?;
        Ok(Self(bytes))
    }
}

/// Block and whole-file digests from one local read pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDigestSummary {
    /// Covers the first `min(size, BLOCK_SIZE)` bytes.
    pub block_digest: DigestValue,
    /// Covers the entire file.
    pub total_digest: DigestValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA1: &str = "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709";

    #[test]
    fn test_empty_digest_is_well_known() {
        assert_eq!(DigestValue::of(b"").to_string(), EMPTY_SHA1);
    }

    #[test]
    fn test_display_is_uppercase() {
        // sha1("abc")
        let d = DigestValue::of(b"abc");
        assert_eq!(d.to_hex(), "A9993E364706816ABA3E25717850C26C9CD0D89D");
    }

    #[test]
    fn test_parse_accepts_lowercase() {
        let d: DigestValue = "a9993e364706816aba3e25717850c26c9cd0d89d".parse().unwrap();
        assert_eq!(d, DigestValue::of(b"abc"));
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!("abc".parse::<DigestValue>().is_err());
        assert!(format!("{EMPTY_SHA1}00").parse::<DigestValue>().is_err());
        assert!("".parse::<DigestValue>().is_err());
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let bad = "Z".repeat(40);
        assert_eq!(
            bad.parse::<DigestValue>(),
            Err(InvalidDigest(bad.clone()))
        );
    }
}
