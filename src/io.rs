// File-level helpers for delta encoding/decoding.
//
// `encode_file()` and `decode_file()` read the source and input files into
// memory, stream the codec output through a `BufWriter`, and report sizes.
// SHA-256 digests are computed when the `file-io` feature is enabled.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;
use thiserror::Error;

use crate::codec::{CodecOptions, Compressor, Decompressor};
use crate::error::DeltaError;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `encode_file()`.
#[derive(Debug, Clone)]
pub struct EncodeStats {
    /// Source file size in bytes.
    pub source_size: u64,
    /// Target file size in bytes.
    pub target_size: u64,
    /// Delta output size in bytes.
    pub delta_size: u64,
    /// Number of buffer flushes the session made.
    pub flushes: u64,
    /// SHA-256 of the source file (if `file-io` feature is enabled).
    pub source_sha256: Option<[u8; 32]>,
    /// SHA-256 of the target file (if `file-io` feature is enabled).
    pub target_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `decode_file()`.
#[derive(Debug, Clone)]
pub struct DecodeStats {
    /// Source file size in bytes.
    pub source_size: u64,
    /// Delta file size in bytes.
    pub delta_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// Number of buffer flushes the session made.
    pub flushes: u64,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file operations.
#[derive(Debug, Error)]
pub enum IoError {
    /// File open, read, or final flush failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The codec failed (including writes to the output file).
    #[error("delta error: {0}")]
    Delta(#[from] DeltaError),
}

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// encode_file
// ---------------------------------------------------------------------------

/// Encode the delta from `source_path` to `target_path`, writing it to
/// `delta_path`.
pub fn encode_file(
    source_path: &Path,
    target_path: &Path,
    delta_path: &Path,
    opts: CodecOptions,
) -> Result<EncodeStats, IoError> {
    let source = std::fs::read(source_path)?;
    let target = std::fs::read(target_path)?;

    let delta_file = File::create(delta_path)?;
    let mut delta_writer = BufWriter::with_capacity(BUF_SIZE, delta_file);

    let mut compressor = Compressor::with_options(opts);
    compressor.write_delta(&source, &target, &mut delta_writer)?;
    let stats = compressor.last_stats().unwrap_or_default();

    let delta_size = delta_writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .metadata()?
        .len();

    Ok(EncodeStats {
        source_size: source.len() as u64,
        target_size: target.len() as u64,
        delta_size,
        flushes: stats.flushes,
        source_sha256: sha256(&source),
        target_sha256: sha256(&target),
    })
}

// ---------------------------------------------------------------------------
// decode_file
// ---------------------------------------------------------------------------

/// Apply the delta in `delta_path` to `source_path`, writing the target to
/// `output_path`.
pub fn decode_file(
    source_path: &Path,
    delta_path: &Path,
    output_path: &Path,
    opts: CodecOptions,
) -> Result<DecodeStats, IoError> {
    let source = std::fs::read(source_path)?;
    let delta = std::fs::read(delta_path)?;

    let output_file = File::create(output_path)?;
    let mut output_writer = BufWriter::with_capacity(BUF_SIZE, output_file);

    let mut decompressor = Decompressor::with_options(opts);

    #[cfg(feature = "file-io")]
    let output_sha256 = {
        let mut hasher = sha2::Sha256::new();
        let mut hashing_writer = HashingWriter {
            inner: &mut output_writer,
            hasher: &mut hasher,
        };
        decompressor.write_target(&source, &delta, &mut hashing_writer)?;
        Some(hasher.finalize().into())
    };

    #[cfg(not(feature = "file-io"))]
    let output_sha256: Option<[u8; 32]> = {
        decompressor.write_target(&source, &delta, &mut output_writer)?;
        None
    };

    output_writer.flush()?;
    let stats = decompressor.last_stats().unwrap_or_default();

    Ok(DecodeStats {
        source_size: source.len() as u64,
        delta_size: delta.len() as u64,
        output_size: stats.produced,
        flushes: stats.flushes,
        output_sha256,
    })
}

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    Some(sha2::Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// Hashing writer (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
