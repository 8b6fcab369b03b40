/// Project overview:
/// - Verifies that a local file and its copy on a remote host are byte-identical
///   without transferring the file: both sides compute SHA-1 digests and only the
///   digests are compared
/// - Local digests are taken straight from an open file handle; remote digests are
///   computed by a shell command sent over ssh (one ssh process per command)
/// - Ranges are inclusive `start-end` byte spans, so a large file can be checked in
///   pieces or resumed part-way
///
/// Key behaviors:
/// - Local summary: a 128 KiB prefix block digest plus a whole-file digest from one pass
/// - Remote range digest: existence probe, then a digest command answering `<status>,<hex>`
/// - Every digest is rendered as uppercase hex for textual comparison
/// - Failures are typed (`VerifyError`): bad range, local I/O, channel, missing
///   remote file, malformed remote output, remote-reported failure
/// - Chunked verification runs worker threads, each with its own file handle and session
pub mod backends;
pub mod digest;
pub mod protocols;
pub mod range;
pub mod utils;
pub mod verify;

pub use backends::{
    backend_and_path, LocalBackend, RemoteBackend, RemoteVerificationResult, Target, VerifyError,
};
pub use digest::{DigestValue, FileDigestSummary, BLOCK_SIZE};
pub use protocols::{
    ChannelError, RemoteChannel, RemoteCommand, ShellProtocol, SshConfig, SshProtocol,
};
pub use range::{parse_range, ByteRange};
pub use utils::Status;
pub use verify::{
    verify_chunks, verify_file, verify_range, ChunkReport, VerifyOptions, VerifyReport,
};
