use log::{debug, info};

use super::VerifyError;
use crate::digest::DigestValue;
use crate::protocols::command::{exists_command, size_command};
use crate::protocols::{RemoteChannel, RemoteCommand};
use crate::range::ByteRange;

/// Outcome of [`RemoteBackend::probe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVerificationResult {
    pub exists: bool,
    /// `None` when the file is missing or the remote side reported failure.
    pub digest: Option<DigestValue>,
    /// What the remote side said when it reported failure.
    pub diagnostic: Option<String>,
}

/// A parsed `<status>,<value>` reply.
#[derive(Debug, PartialEq, Eq)]
enum Reply<'a> {
    Ok(&'a str),
    Failed(&'a str),
}

/// Split a remote reply into status and value.
///
/// The trimmed output must be one line holding exactly two comma-separated fields with
/// status `1` or `0`; anything else is a protocol violation.
fn parse_reply<'a>(path: &str, output: &'a str) -> Result<Reply<'a>, VerifyError> {
    let malformed = || VerifyError::MalformedRemoteOutput {
        path: path.to_string(),
        output: output.to_string(),
    };

    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed.contains('\n') {
        return Err(malformed());
    }
    let mut fields = trimmed.split(',');
    let (Some(status), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(malformed());
    };
    match status.trim() {
        "1" => Ok(Reply::Ok(value.trim())),
        "0" => Ok(Reply::Failed(value.trim())),
        _ => Err(malformed()),
    }
}

/// Digest engine for files on a remote host, driving a [`RemoteChannel`].
///
/// The engine owns its channel, and every method takes `&mut self`, so commands on
/// one channel never overlap.
pub struct RemoteBackend<C: RemoteChannel> {
    channel: C,
    command: RemoteCommand,
}

impl<C: RemoteChannel> RemoteBackend<C> {
    /// Engine using the inline shell pipeline.
    pub fn new(channel: C) -> Self {
        Self::with_command(channel, RemoteCommand::default())
    }

    pub fn with_command(channel: C, command: RemoteCommand) -> Self {
        Self { channel, command }
    }

    pub fn command(&self) -> &RemoteCommand {
        &self.command
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Whether a regular file exists at `path`. Issues one command.
    ///
    /// Only a trimmed reply of exactly `1` counts as present.
    pub fn check_exists(&mut self, path: &str) -> Result<bool, VerifyError> {
        let cmd = exists_command(path)?;
        let output = self.channel.exec(&cmd)?;
        let exists = output.trim() == "1";
        debug!("remote exists {}: {}", path, exists);
        Ok(exists)
    }

    /// SHA-1 of `range` of the remote file. Issues two commands: the existence
    /// check, then the digest itself.
    pub fn digest_range(&mut self, path: &str, range: ByteRange) -> Result<DigestValue, VerifyError> {
        if !self.check_exists(path)? {
            return Err(VerifyError::RemoteFileNotFound(path.to_string()));
        }
        self.digest_existing(path, range)
    }

    fn digest_existing(&mut self, path: &str, range: ByteRange) -> Result<DigestValue, VerifyError> {
        let cmd = self.command.digest_command(path, range)?;
        let output = self.channel.exec(&cmd)?;

        match parse_reply(path, &output)? {
            Reply::Ok(value) => {
                let digest: DigestValue =
                    value
                        .parse()
                        .map_err(|_| VerifyError::MalformedRemoteOutput {
                            path: path.to_string(),
                            output: output.clone(),
                        })?;
                info!("remote digest {} [{}]: {}", path, range, digest);
                Ok(digest)
            }
            Reply::Failed(diagnostic) => Err(VerifyError::RemoteComputeFailed {
                path: path.to_string(),
                operation: format!("digest of range {}", range),
                diagnostic: diagnostic.to_string(),
            }),
        }
    }

    /// Size in bytes of the remote file. Issues two commands.
    pub fn file_size(&mut self, path: &str) -> Result<u64, VerifyError> {
        if !self.check_exists(path)? {
            return Err(VerifyError::RemoteFileNotFound(path.to_string()));
        }
        self.size_existing(path)
    }

    fn size_existing(&mut self, path: &str) -> Result<u64, VerifyError> {
        let cmd = size_command(path)?;
        let output = self.channel.exec(&cmd)?;

        match parse_reply(path, &output)? {
            Reply::Ok(size) => size.parse().map_err(|_| VerifyError::MalformedRemoteOutput {
                path: path.to_string(),
                output: output.clone(),
            }),
            Reply::Failed(diagnostic) => Err(VerifyError::RemoteComputeFailed {
                path: path.to_string(),
                operation: "size".to_string(),
                diagnostic: diagnostic.to_string(),
            }),
        }
    }

    /// SHA-1 of the entire remote file. An empty file yields the digest of no bytes.
    pub fn digest_whole_file(&mut self, path: &str) -> Result<DigestValue, VerifyError> {
        if !self.check_exists(path)? {
            return Err(VerifyError::RemoteFileNotFound(path.to_string()));
        }
        let size = self.size_existing(path)?;
        match ByteRange::with_len(0, size) {
            Some(range) => self.digest_existing(path, range),
            None => Ok(DigestValue::of(&[])),
        }
    }

    /// Existence plus digest in one result. Missing files and remote compute failures
    /// are folded into the result; channel and protocol errors are still returned.
    pub fn probe(
        &mut self,
        path: &str,
        range: ByteRange,
    ) -> Result<RemoteVerificationResult, VerifyError> {
        match self.digest_range(path, range) {
            Ok(digest) => Ok(RemoteVerificationResult {
                exists: true,
                digest: Some(digest),
                diagnostic: None,
            }),
            Err(VerifyError::RemoteFileNotFound(_)) => Ok(RemoteVerificationResult {
                exists: false,
                digest: None,
                diagnostic: None,
            }),
            Err(VerifyError::RemoteComputeFailed { diagnostic, .. }) => {
                Ok(RemoteVerificationResult {
                    exists: true,
                    digest: None,
                    diagnostic: Some(diagnostic),
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_ok_trims_newline() {
        assert_eq!(parse_reply("/f", "1,abc\n").unwrap(), Reply::Ok("abc"));
    }

    #[test]
    fn test_parse_reply_failed() {
        assert_eq!(
            parse_reply("/f", "0,no such range").unwrap(),
            Reply::Failed("no such range")
        );
    }

    #[test]
    fn test_parse_reply_malformed() {
        for bad in ["", "  \n", "1", "1,a,b", "2,abc", "1,abc\n1,abc", "yes,abc"] {
            assert!(
                matches!(
                    parse_reply("/f", bad),
                    Err(VerifyError::MalformedRemoteOutput { .. })
                ),
                "{bad:?} should be malformed"
            );
        }
    }
}
