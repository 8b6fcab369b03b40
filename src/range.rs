//! Inclusive byte ranges written as `start-end`.

use crate::backends::VerifyError;
use std::fmt;
use std::str::FromStr;

/// An inclusive byte span `[start, end]` with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// Build a range, rejecting negative bounds and `end < start`.
    pub fn new(start: i64, end: i64) -> Result<Self, VerifyError> {
        if start < 0 || end < 0 || end < start {
            return Err(VerifyError::InvertedRange { start, end });
        }
        Ok(Self {
            start: start as u64,
            end: end as u64,
        })
    }

    /// Range covering the first `len` bytes at `start`. `None` when `len` is zero.
    pub fn with_len(start: u64, len: u64) -> Option<Self> {
        let end = start.checked_add(len.checked_sub(1)?)?;
        Some(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered, `end - start + 1`.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// A range always covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for ByteRange {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_range(s)
    }
}

/// Parse `"start-end"` into a [`ByteRange`].
///
/// The separator is the first hyphen after the first character, so a leading minus
/// sign on `start` is read as a negative number (and then rejected as inverted)
/// rather than as a malformed string. A `+` sign on either field is malformed.
pub fn parse_range(spec: &str) -> Result<ByteRange, VerifyError> {
    let text = spec.trim();
    let malformed = || VerifyError::MalformedRange(spec.to_string());
    if text.contains('+') {
        return Err(malformed());
    }

    let sep = text
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '-')
        .map(|(i, _)| i)
        .ok_or_else(malformed)?;
    let (start, end) = (&text[..sep], &text[sep + 1..]);

    let start: i64 = start.parse().map_err(|_| malformed())?;
    let end: i64 = end.parse().map_err(|_| malformed())?;
    ByteRange::new(start, end)
}
