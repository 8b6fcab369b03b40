use hashverify::backends::{LocalBackend, VerifyError};
use hashverify::{parse_range, ByteRange, DigestValue, BLOCK_SIZE};
use std::fs::File;
use std::io::{Seek, Write};
use tempfile::tempdir;

fn write_file(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(data).unwrap();
    path
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

#[test]
fn test_localbackend_range_example() {
    let dir = tempdir().unwrap();
    let path = write_file(&dir, "letters.txt", b"ABCDEFGHIJ");
    let backend = LocalBackend::new();

    let digest = backend
        .digest_path_range(&path, parse_range("2-5").unwrap())
        .unwrap();
    assert_eq!(digest, DigestValue::of(b"CDEF"));
    assert_eq!(digest.to_string(), digest.to_string().to_uppercase());
}

#[test]
fn test_localbackend_empty_file() {
    let dir = tempdir().unwrap();
    let path = write_file(&dir, "empty.bin", b"");

    let summary = LocalBackend::new().digest_file(&path).unwrap();
    assert_eq!(summary.block_digest, summary.total_digest);
    assert_eq!(
        summary.total_digest.to_string(),
        "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709"
    );
}

#[test]
/// Files no larger than one block have identical block and total digests.
fn test_localbackend_block_equals_total_up_to_block_size() {
    let dir = tempdir().unwrap();
    for len in [1, 4096, BLOCK_SIZE] {
        let path = write_file(&dir, &format!("f{len}"), &pattern(len));
        let summary = LocalBackend::new().digest_file(&path).unwrap();
        assert_eq!(summary.block_digest, summary.total_digest, "len {len}");
    }
}

#[test]
fn test_localbackend_block_digest_covers_prefix_only() {
    let dir = tempdir().unwrap();
    let data = pattern(BLOCK_SIZE * 3 + 123);
    let path = write_file(&dir, "big.bin", &data);

    let summary = LocalBackend::new().digest_file(&path).unwrap();
    assert_eq!(summary.block_digest, DigestValue::of(&data[..BLOCK_SIZE]));
    assert_eq!(summary.total_digest, DigestValue::of(&data));
}

#[test]
fn test_localbackend_full_range_equals_total() {
    let dir = tempdir().unwrap();
    let data = pattern(BLOCK_SIZE + 777);
    let path = write_file(&dir, "full.bin", &data);
    let backend = LocalBackend::new();

    let summary = backend.digest_file(&path).unwrap();
    let full = ByteRange::new(0, data.len() as i64 - 1).unwrap();
    assert_eq!(backend.digest_path_range(&path, full).unwrap(), summary.total_digest);
}

#[test]
fn test_localbackend_idempotent_on_same_handle() {
    let dir = tempdir().unwrap();
    let path = write_file(&dir, "again.bin", &pattern(300_000));
    let backend = LocalBackend::new();
    let mut file = File::open(&path).unwrap();

    let first = backend.digest_whole_file(&mut file).unwrap();
    assert_eq!(file.stream_position().unwrap(), 0);
    let second = backend.digest_whole_file(&mut file).unwrap();
    assert_eq!(first, second);

    let range = ByteRange::new(1000, 250_000).unwrap();
    let a = backend.digest_range(&mut file, range).unwrap();
    let b = backend.digest_range(&mut file, range).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_localbackend_range_beyond_eof() {
    let dir = tempdir().unwrap();
    let path = write_file(&dir, "short.bin", b"0123456789");

    let err = LocalBackend::new()
        .digest_path_range(&path, ByteRange::new(5, 50).unwrap())
        .unwrap_err();
    match err {
        VerifyError::ShortRead { expected, actual } => {
            assert_eq!(expected, 46);
            assert_eq!(actual, 5);
        }
        other => panic!("expected ShortRead, got {other:?}"),
    }
}

#[test]
fn test_localbackend_inverted_range_never_reaches_io() {
    // No file is involved: the range is rejected at parse time.
    assert!(matches!(
        parse_range("5-2"),
        Err(VerifyError::InvertedRange { start: 5, end: 2 })
    ));
}

#[test]
fn test_localbackend_missing_file() {
    let dir = tempdir().unwrap();
    let err = LocalBackend::new()
        .digest_file(dir.path().join("nope"))
        .unwrap_err();
    assert!(matches!(err, VerifyError::Io(_)));
}
