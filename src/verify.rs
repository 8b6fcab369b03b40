//! Local-versus-remote comparison built on the two digest engines.
//!
//! Current behavior:
//! - A single range or a whole file is compared with one local pass and one remote
//!   digest command (plus the existence and size probes).
//! - Chunked mode splits the file into fixed-size ranges and hands them to worker
//!   threads through an atomic index. Each worker owns its own file handle and its
//!   own clone of the channel, so no two remote commands share a session.
//! - Results come back over a crossbeam channel; the progress bar counts verified bytes.
//!
//! Note:
//! - Sizes are compared before any digest is requested, so a truncated remote copy
//!   costs two cheap commands instead of a full remote read.

use crate::backends::local::file_size;
use crate::backends::{LocalBackend, RemoteBackend, VerifyError};
use crate::protocols::{RemoteChannel, RemoteCommand};
use crate::range::ByteRange;
use crate::utils::Status;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Default chunk size: 64 MiB. Every chunk costs two remote commands, so chunks are
/// much larger than a local read buffer.
pub const DEFAULT_CHUNK_SIZE: u64 = 64 * 1024 * 1024;

/// Options for [`verify_chunks`].
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub threads: usize,
    pub chunk_size: u64,
    pub no_progress: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            threads: num_cpus::get().max(2),
            chunk_size: DEFAULT_CHUNK_SIZE,
            no_progress: false,
        }
    }
}

/// Outcome for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    pub index: usize,
    pub range: ByteRange,
    pub status: Status,
}

/// Outcome of a chunked verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub size: u64,
    /// Overall verdict: `Match` only if every chunk matched.
    pub status: Status,
    /// Sorted by index. Empty when the sizes already disagreed or the file is empty.
    pub chunks: Vec<ChunkReport>,
}

impl VerifyReport {
    pub fn is_match(&self) -> bool {
        self.status.is_match()
    }

    pub fn mismatched(&self) -> impl Iterator<Item = &ChunkReport> {
        self.chunks.iter().filter(|c| !c.status.is_match())
    }
}

/// Compare `range` of an open local file with the same range of `remote_path`.
///
/// The local digest is computed first so that a range past the local end of file
/// fails without any remote traffic.
pub fn verify_range<F, C>(
    local: &mut F,
    remote: &mut RemoteBackend<C>,
    remote_path: &str,
    range: ByteRange,
) -> Result<Status, VerifyError>
where
    F: Read + Seek,
    C: RemoteChannel,
{
    let local_digest = LocalBackend::new().digest_range(local, range)?;
    let remote_digest = match remote.digest_range(remote_path, range) {
        Ok(d) => d,
        Err(VerifyError::RemoteFileNotFound(_)) => return Ok(Status::MissingRemote),
        Err(e) => return Err(e),
    };
    let status = Status::of(local_digest, remote_digest);
    if !status.is_match() {
        warn!("{} [{}]: {}", remote_path, range, status);
    }
    Ok(status)
}

/// Compare a whole local file with `remote_path`: sizes first, then one digest over
/// the full length.
pub fn verify_file<C: RemoteChannel>(
    local_path: &Path,
    remote: &mut RemoteBackend<C>,
    remote_path: &str,
) -> Result<Status, VerifyError> {
    let mut file = File::open(local_path)?;
    let local_size = file_size(&mut file)?;

    let status = match compare_sizes(remote, remote_path, local_size)? {
        Some(status) => status,
        None => match ByteRange::with_len(0, local_size) {
            Some(range) => verify_range(&mut file, remote, remote_path, range)?,
            None => Status::Match,
        },
    };
    info!("{} vs {}: {}", local_path.display(), remote_path, status);
    Ok(status)
}

/// `Some(status)` when the remote file is missing or its size differs.
fn compare_sizes<C: RemoteChannel>(
    remote: &mut RemoteBackend<C>,
    remote_path: &str,
    local_size: u64,
) -> Result<Option<Status>, VerifyError> {
    match remote.file_size(remote_path) {
        Ok(remote_size) if remote_size == local_size => Ok(None),
        Ok(remote_size) => Ok(Some(Status::SizeMismatch {
            local: local_size,
            remote: remote_size,
        })),
        Err(VerifyError::RemoteFileNotFound(_)) => Ok(Some(Status::MissingRemote)),
        Err(e) => Err(e),
    }
}

/// Split `size` bytes into consecutive ranges of at most `chunk_size` bytes.
pub fn chunk_ranges(size: u64, chunk_size: u64) -> Vec<ByteRange> {
    let chunk_size = chunk_size.max(1);
    let mut ranges = Vec::with_capacity(size.div_ceil(chunk_size) as usize);
    let mut start = 0u64;
    while start < size {
        let len = chunk_size.min(size - start);
        if let Some(r) = ByteRange::with_len(start, len) {
            ranges.push(r);
        }
        start += len;
    }
    ranges
}

/// Verify a file chunk by chunk using parallel workers.
/// - Each worker clones `channel` and opens `local_path` itself.
/// - A missing remote file or a size difference is reported without digesting anything.
/// - All chunks are attempted; if any fail, the error of the lowest-indexed failing
///   chunk is returned after the others are logged.
pub fn verify_chunks<C>(
    local_path: &Path,
    channel: C,
    command: RemoteCommand,
    remote_path: &str,
    options: &VerifyOptions,
) -> Result<VerifyReport, VerifyError>
where
    C: RemoteChannel + Clone + Send + 'static,
{
    let size = std::fs::metadata(local_path)?.len();

    let mut probe = RemoteBackend::with_command(channel.clone(), command.clone());
    if let Some(status) = compare_sizes(&mut probe, remote_path, size)? {
        warn!("{}: {}", remote_path, status);
        return Ok(VerifyReport {
            size,
            status,
            chunks: Vec::new(),
        });
    }

    let ranges = Arc::new(chunk_ranges(size, options.chunk_size));
    let total_chunks = ranges.len();

    // Progress bar setup
    let pb = if options.no_progress {
        None
    } else {
        let pb = ProgressBar::new(size);
        pb.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
        pb.set_message("Verifying...");
        Some(pb)
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    let index = Arc::new(AtomicUsize::new(0));
    let num_threads = options.threads.clamp(1, total_chunks.max(1));
    let mut workers = Vec::with_capacity(num_threads);

    for _ in 0..num_threads {
        let ranges = Arc::clone(&ranges);
        let index = Arc::clone(&index);
        let tx = tx.clone();
        let pb_worker = pb.clone();
        let local_path: PathBuf = local_path.to_path_buf();
        let remote_path = remote_path.to_string();
        let mut remote = RemoteBackend::with_command(channel.clone(), command.clone());

        workers.push(thread::spawn(move || -> Result<(), VerifyError> {
            let mut file = File::open(&local_path)?;
            loop {
                let i = index.fetch_add(1, Ordering::Relaxed);
                if i >= total_chunks {
                    break;
                }
                let range = ranges[i];
                let result = verify_range(&mut file, &mut remote, &remote_path, range);
                if let Some(ref pb) = pb_worker {
                    pb.inc(range.len());
                }
                if tx.send((i, result)).is_err() {
                    break;
                }
            }
            Ok(())
        }));
    }
    drop(tx);

    let mut chunks = Vec::with_capacity(total_chunks);
    let mut failures: Vec<(usize, VerifyError)> = Vec::new();
    for (i, result) in rx {
        match result {
            Ok(status) => chunks.push(ChunkReport {
                index: i,
                range: ranges[i],
                status,
            }),
            Err(e) => {
                error!("chunk {} [{}] failed: {}", i, ranges[i], e);
                failures.push((i, e));
            }
        }
    }

    for w in workers {
        match w.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("worker failed to start: {}", e);
                failures.push((usize::MAX, e));
            }
            Err(_) => failures.push((
                usize::MAX,
                VerifyError::Io(io::Error::other("verification worker panicked")),
            )),
        }
    }
    if let Some(ref pb) = pb {
        pb.finish_with_message("Verify complete");
    }

    if let Some((_, e)) = failures.into_iter().min_by_key(|(i, _)| *i) {
        return Err(e);
    }

    chunks.sort_by_key(|c| c.index);
    let status = chunks
        .iter()
        .map(|c| c.status)
        .find(|s| !s.is_match())
        .unwrap_or(Status::Match);
    info!(
        "{} vs {}: {} chunks, {}",
        local_path.display(),
        remote_path,
        chunks.len(),
        status
    );
    Ok(VerifyReport {
        size,
        status,
        chunks,
    })
}
