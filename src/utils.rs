use crate::digest::DigestValue;
use std::fmt;

/// Result of comparing a local file (or range) with its remote copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Match,
    Mismatch {
        local: DigestValue,
        remote: DigestValue,
    },
    MissingRemote,
    SizeMismatch {
        local: u64,
        remote: u64,
    },
}

impl Status {
    pub fn is_match(&self) -> bool {
        matches!(self, Status::Match)
    }

    /// Compare two digests.
    pub fn of(local: DigestValue, remote: DigestValue) -> Self {
        if local == remote {
            Status::Match
        } else {
            Status::Mismatch { local, remote }
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Match => write!(f, "match"),
            Status::Mismatch { local, remote } => {
                write!(f, "MISMATCH (local {}, remote {})", local, remote)
            }
            Status::MissingRemote => write!(f, "missing on remote"),
            Status::SizeMismatch { local, remote } => write!(
                f,
                "size differs (local {}, remote {})",
                size_to_human_readable(*local),
                size_to_human_readable(*remote)
            ),
        }
    }
}

/// Format a byte count with binary units, e.g. `1.50 MiB`.
pub fn size_to_human_readable(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if size < 1024 {
        return format!("{} B", size);
    }
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_readable() {
        assert_eq!(size_to_human_readable(0), "0 B");
        assert_eq!(size_to_human_readable(1023), "1023 B");
        assert_eq!(size_to_human_readable(1024), "1.00 KiB");
        assert_eq!(size_to_human_readable(128 * 1024), "128.00 KiB");
        assert_eq!(size_to_human_readable(3 * 1024 * 1024 / 2), "1.50 MiB");
    }

    #[test]
    fn test_status_of() {
        let a = DigestValue::of(b"a");
        let b = DigestValue::of(b"b");
        assert!(Status::of(a, a).is_match());
        assert_eq!(Status::of(a, b), Status::Mismatch { local: a, remote: b });
    }
}
