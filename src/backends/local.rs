use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;
use sha1::{Digest, Sha1};

use super::VerifyError;
use crate::digest::{DigestValue, FileDigestSummary, BLOCK_SIZE};
use crate::range::ByteRange;

/// Default streaming buffer: 1 MiB
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 20;

/// Digest engine for files on the local filesystem.
/// Works on any open `Read + Seek` handle; the caller keeps ownership of the handle.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    buffer_size: usize,
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBackend {
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Use a different streaming buffer. Never affects the digests, only how many
    /// bytes are held in memory at once.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Digest exactly `range.len()` bytes starting at `range.start()`.
    ///
    /// Fails with [`VerifyError::Seek`] if the handle rejects the seek and with
    /// [`VerifyError::ShortRead`] if end of file arrives before `range.end()`.
    pub fn digest_range<F: Read + Seek>(
        &self,
        file: &mut F,
        range: ByteRange,
    ) -> Result<DigestValue, VerifyError> {
        file.seek(SeekFrom::Start(range.start()))
            .map_err(|source| VerifyError::Seek {
                offset: range.start(),
                source,
            })?;

        let mut hasher = Sha1::new();
        let mut buf = vec![0u8; self.buffer_size];
        let read = stream_into(file, &mut hasher, Some(range.len()), &mut buf)?;
        if read != range.len() {
            return Err(VerifyError::ShortRead {
                expected: range.len(),
                actual: read,
            });
        }

        let digest = DigestValue::from_hasher(hasher);
        debug!("local range {} digest {}", range, digest);
        Ok(digest)
    }

    /// Block digest of the first 128 KiB plus the digest of the whole file.
    ///
    /// The handle is rewound to the start of the file when this returns, on success
    /// and on failure.
    pub fn digest_whole_file<F: Read + Seek>(
        &self,
        file: &mut F,
    ) -> Result<FileDigestSummary, VerifyError> {
        let result = self.summarize(file);
        let rewound = file.rewind();
        let summary = result?;
        rewound.map_err(|source| VerifyError::Seek { offset: 0, source })?;
        Ok(summary)
    }

    fn summarize<F: Read + Seek>(&self, file: &mut F) -> Result<FileDigestSummary, VerifyError> {
        file.rewind()
            .map_err(|source| VerifyError::Seek { offset: 0, source })?;

        let mut block = vec![0u8; BLOCK_SIZE];
        let filled = read_full(file, &mut block)?;
        let block_digest = DigestValue::of(&block[..filled]);

        file.rewind()
            .map_err(|source| VerifyError::Seek { offset: 0, source })?;

        let mut hasher = Sha1::new();
        let mut buf = block;
        buf.resize(self.buffer_size.max(BLOCK_SIZE), 0);
        let total = stream_into(file, &mut hasher, None, &mut buf)?;
        let total_digest = DigestValue::from_hasher(hasher);

        debug!(
            "local summary: {} bytes, block {} total {}",
            total, block_digest, total_digest
        );
        Ok(FileDigestSummary {
            block_digest,
            total_digest,
        })
    }

    /// Open `path` and summarize it.
    pub fn digest_file<P: AsRef<Path>>(&self, path: P) -> Result<FileDigestSummary, VerifyError> {
        let mut file = File::open(path)?;
        self.digest_whole_file(&mut file)
    }

    /// Open `path` and digest `range` of it.
    pub fn digest_path_range<P: AsRef<Path>>(
        &self,
        path: P,
        range: ByteRange,
    ) -> Result<DigestValue, VerifyError> {
        let mut file = File::open(path)?;
        self.digest_range(&mut file, range)
    }
}

/// Size of a seekable handle. Leaves the cursor where it was.
pub fn file_size<F: Seek>(file: &mut F) -> Result<u64, VerifyError> {
    let pos = file.stream_position()?;
    let size = file
        .seek(SeekFrom::End(0))
        .map_err(|source| VerifyError::Seek { offset: 0, source })?;
    file.seek(SeekFrom::Start(pos))
        .map_err(|source| VerifyError::Seek {
            offset: pos,
            source,
        })?;
    Ok(size)
}

/// Feed `reader` into `hasher` through `buf`, stopping after `limit` bytes if given
/// or at end of file. Returns the number of bytes hashed.
fn stream_into<R: Read>(
    reader: &mut R,
    hasher: &mut Sha1,
    limit: Option<u64>,
    buf: &mut [u8],
) -> io::Result<u64> {
    let mut total = 0u64;
    loop {
        let want = match limit {
            Some(limit) if total >= limit => break,
            Some(limit) => (limit - total).min(buf.len() as u64) as usize,
            None => buf.len(),
        };
        let n = match reader.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    Ok(total)
}

/// Read until `buf` is full or end of file; a single `read` may return less.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle {
        inner: Cursor<Vec<u8>>,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.step);
            self.inner.read(&mut buf[..n])
        }
    }

    impl Seek for Trickle {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_range_example() {
        let mut c = Cursor::new(b"ABCDEFGHIJ".to_vec());
        let r = ByteRange::new(2, 5).unwrap();
        let d = LocalBackend::new().digest_range(&mut c, r).unwrap();
        assert_eq!(d, DigestValue::of(b"CDEF"));
    }

    #[test]
    fn test_range_short_read() {
        let mut c = Cursor::new(b"ABCDEFGHIJ".to_vec());
        let r = ByteRange::new(8, 20).unwrap();
        match LocalBackend::new().digest_range(&mut c, r) {
            Err(VerifyError::ShortRead { expected, actual }) => {
                assert_eq!(expected, 13);
                assert_eq!(actual, 2);
            }
            other => panic!("expected short read, got {:?}", other),
        }
    }

    #[test]
    fn test_range_past_eof_is_short_read() {
        let mut c = Cursor::new(b"ABC".to_vec());
        let r = ByteRange::new(100, 100).unwrap();
        assert!(matches!(
            LocalBackend::new().digest_range(&mut c, r),
            Err(VerifyError::ShortRead { actual: 0, .. })
        ));
    }

    #[test]
    fn test_small_buffer_same_digest() {
        let data = pattern(10_000);
        let r = ByteRange::new(17, 9_000).unwrap();
        let big = LocalBackend::new()
            .digest_range(&mut Cursor::new(data.clone()), r)
            .unwrap();
        let small = LocalBackend::with_buffer_size(7)
            .digest_range(&mut Cursor::new(data.clone()), r)
            .unwrap();
        assert_eq!(big, small);
        assert_eq!(big, DigestValue::of(&data[17..=9_000]));
    }

    #[test]
    fn test_summary_small_file() {
        let mut c = Cursor::new(b"hello world".to_vec());
        let s = LocalBackend::new().digest_whole_file(&mut c).unwrap();
        assert_eq!(s.block_digest, s.total_digest);
        assert_eq!(s.total_digest, DigestValue::of(b"hello world"));
    }

    #[test]
    fn test_summary_empty() {
        let mut c = Cursor::new(Vec::new());
        let s = LocalBackend::new().digest_whole_file(&mut c).unwrap();
        assert_eq!(
            s.block_digest.to_string(),
            "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709"
        );
        assert_eq!(s.block_digest, s.total_digest);
    }

    #[test]
    fn test_summary_large_file_fills_block_across_short_reads() {
        let data = pattern(BLOCK_SIZE + 5_000);
        let mut t = Trickle {
            inner: Cursor::new(data.clone()),
            step: 4_096,
        };
        let s = LocalBackend::new().digest_whole_file(&mut t).unwrap();
        assert_eq!(s.block_digest, DigestValue::of(&data[..BLOCK_SIZE]));
        assert_eq!(s.total_digest, DigestValue::of(&data));
        assert_ne!(s.block_digest, s.total_digest);
    }

    #[test]
    fn test_summary_starts_from_zero_and_rewinds() {
        let data = pattern(1_000);
        let mut c = Cursor::new(data.clone());
        c.set_position(500);
        let s = LocalBackend::new().digest_whole_file(&mut c).unwrap();
        assert_eq!(s.total_digest, DigestValue::of(&data));
        assert_eq!(c.position(), 0);
    }

    /// Reader that fails once its cursor reaches `fail_at`.
    struct Broken {
        inner: Cursor<Vec<u8>>,
        fail_at: u64,
    }

    impl Read for Broken {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inner.position() >= self.fail_at {
                return Err(io::Error::other("disk on fire"));
            }
            let room = (self.fail_at - self.inner.position()) as usize;
            let n = buf.len().min(room);
            self.inner.read(&mut buf[..n])
        }
    }

    impl Seek for Broken {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_summary_rewinds_after_failure() {
        let mut b = Broken {
            inner: Cursor::new(pattern(BLOCK_SIZE * 2)),
            fail_at: 1_000,
        };
        assert!(matches!(
            LocalBackend::new().digest_whole_file(&mut b),
            Err(VerifyError::Io(_))
        ));
        assert_eq!(b.inner.position(), 0);
    }

    /// Readable stream that refuses every seek, like a pipe.
    struct Unseekable {
        inner: Cursor<Vec<u8>>,
    }

    impl Read for Unseekable {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for Unseekable {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "illegal seek"))
        }
    }

    #[test]
    fn test_range_seek_failure() {
        let mut u = Unseekable {
            inner: Cursor::new(pattern(100)),
        };
        let r = ByteRange::new(40, 49).unwrap();
        match LocalBackend::new().digest_range(&mut u, r) {
            Err(VerifyError::Seek { offset, source }) => {
                assert_eq!(offset, 40);
                assert_eq!(source.kind(), io::ErrorKind::Unsupported);
            }
            other => panic!("expected seek error, got {:?}", other),
        }
        assert_eq!(u.inner.position(), 0);
    }

    #[test]
    fn test_summary_seek_failure_reports_first_error() {
        let mut u = Unseekable {
            inner: Cursor::new(pattern(100)),
        };
        assert!(matches!(
            LocalBackend::new().digest_whole_file(&mut u),
            Err(VerifyError::Seek { offset: 0, .. })
        ));
        // Nothing was read once the initial rewind failed.
        assert_eq!(u.inner.position(), 0);
    }

    #[test]
    fn test_file_size_keeps_position() {
        let mut c = Cursor::new(pattern(300));
        c.set_position(42);
        assert_eq!(file_size(&mut c).unwrap(), 300);
        assert_eq!(c.position(), 42);
    }
}
