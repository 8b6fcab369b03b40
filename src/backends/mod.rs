pub mod local;
pub mod remote;

use crate::protocols::ChannelError;
use regex::Regex;
use std::io;
use std::sync::OnceLock;

/// Every failure the digest engines can report. Variants stay distinct so callers
/// can choose between retrying and aborting.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("malformed range {0:?}, expected start-end")]
    MalformedRange(String),
    #[error("invalid range {start}-{end}: bounds must be non-negative and start <= end")]
    InvertedRange { start: i64, end: i64 },
    #[error("failed to seek to offset {offset}: {source}")]
    Seek { offset: u64, source: io::Error },
    #[error("short read: expected {expected} bytes, got {actual} before end of file")]
    ShortRead { expected: u64, actual: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("remote channel error: {0}")]
    Channel(#[from] ChannelError),
    #[error("remote file not found: {0}")]
    RemoteFileNotFound(String),
    #[error("malformed remote output for {path}: {output:?}")]
    MalformedRemoteOutput { path: String, output: String },
    #[error("remote {operation} of {path} failed: {diagnostic}")]
    RemoteComputeFailed {
        path: String,
        operation: String,
        diagnostic: String,
    },
    #[error("unsupported remote path {0:?}: contains a double quote or newline")]
    UnsupportedPath(String),
    #[error("invalid target {0:?}")]
    InvalidTarget(String),
}

impl VerifyError {
    /// Only channel failures can succeed on a second attempt; everything else is
    /// either bad input or a protocol violation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VerifyError::Channel(_))
    }
}

/// Where a file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local(String),
    Ssh {
        user: Option<String>,
        host: String,
        port: Option<u16>,
        path: String,
    },
}

fn ssh_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:([^@/:]+)@)?([^@/:]+)(?::(\d+))?(/.*)$").expect("static regex is valid")
    })
}

/// Given a protocol-prefixed path, returns the [`Target`] it names.
/// Example: "ssh://me@host:2222/srv/a.bin" -> Ssh { .., path: "/srv/a.bin" }
/// Paths without a scheme (or with `file://`) are local.
pub fn backend_and_path(url: &str) -> Result<Target, VerifyError> {
    let Some(idx) = url.find("://") else {
        return Ok(Target::Local(url.to_string()));
    };
    let (proto, rest) = url.split_at(idx);
    let rest = &rest[3..];
    match proto {
        "file" => Ok(Target::Local(rest.to_string())),
        "ssh" | "sftp" => {
            let caps = ssh_url()
                .captures(rest)
                .ok_or_else(|| VerifyError::InvalidTarget(url.to_string()))?;
            let port = match caps.get(3) {
                Some(p) => Some(
                    p.as_str()
                        .parse()
                        .map_err(|_| VerifyError::InvalidTarget(url.to_string()))?,
                ),
                None => None,
            };
            Ok(Target::Ssh {
                user: caps.get(1).map(|m| m.as_str().to_string()),
                host: caps[2].to_string(),
                port,
                path: caps[4].to_string(),
            })
        }
        _ => Err(VerifyError::InvalidTarget(url.to_string())),
    }
}

pub use local::LocalBackend;
pub use remote::{RemoteBackend, RemoteVerificationResult};
