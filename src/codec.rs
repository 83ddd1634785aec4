// Reusable codec objects.
//
// `Compressor` and `Decompressor` each wrap one `StreamSession`. Calling them
// repeatedly reuses the engine and the output buffer; each call starts from
// fresh session state. Reusing one object is cheaper than the pooled
// one-shot functions when the caller runs many operations in a row.

use std::io::Write;

use crate::engine::deflate::{self, DeflateEngine};
use crate::engine::CompressionEngine;
use crate::error::DeltaResult;
use crate::session::{StreamSession, StreamStats};
use crate::sizing::BufferPolicy;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for codec objects.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Compression level (0-9) for the deflate engine. Ignored when decoding.
    pub level: u32,
    /// Initial output buffer size. Zero sizes the buffer from `policy` on
    /// the first call.
    pub buffer_size: usize,
    /// Sizing bounds for the output buffer.
    pub policy: BufferPolicy,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            level: deflate::DEFAULT_LEVEL,
            buffer_size: 0,
            policy: BufferPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Compressor
// ---------------------------------------------------------------------------

/// Creates deltas. Reusable, but not from several threads at once.
///
/// # Example
/// ```no_run
/// use zdelta::codec::{Compressor, Decompressor};
///
/// let source = b"In Xanadu did Kublai Khan a stately pleasure-dome decree";
/// let target = b"In Ooo did Jake a bitchen pleasure-dome decree";
///
/// let mut compressor = Compressor::new();
/// let delta = compressor.create_delta(source, target).unwrap();
///
/// let mut decompressor = Decompressor::new();
/// assert_eq!(decompressor.apply_delta(source, &delta).unwrap(), target);
/// ```
#[derive(Debug)]
pub struct Compressor<E: CompressionEngine = DeflateEngine> {
    session: StreamSession<E>,
    last_stats: Option<StreamStats>,
}

impl Compressor<DeflateEngine> {
    /// Compressor with default options; the buffer is sized on first use.
    pub fn new() -> Self {
        Self::with_options(CodecOptions::default())
    }

    /// Compressor with an output buffer of `buffer_size` bytes.
    ///
    /// Zero falls back to sizing the buffer from the default policy on first
    /// use.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self::with_options(CodecOptions {
            buffer_size,
            ..CodecOptions::default()
        })
    }

    pub fn with_options(opts: CodecOptions) -> Self {
        Self::with_engine(DeflateEngine::new(opts.level), &opts)
    }
}

impl Default for Compressor<DeflateEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CompressionEngine> Compressor<E> {
    /// Compressor driving a custom engine.
    pub fn with_engine(engine: E, opts: &CodecOptions) -> Self {
        Self {
            session: StreamSession::with_buffer_size(engine, opts.policy, opts.buffer_size),
            last_stats: None,
        }
    }

    /// Write the delta from `source` to `target` into `sink`.
    ///
    /// Output reaches the sink incrementally; on error, bytes already written
    /// stay written.
    pub fn write_delta<W: Write + ?Sized>(
        &mut self,
        source: &[u8],
        target: &[u8],
        sink: &mut W,
    ) -> DeltaResult<()> {
        self.last_stats = None;
        let stats = self.session.run_encode(source, target, sink)?;
        self.last_stats = Some(stats);
        Ok(())
    }

    /// Return the delta from `source` to `target`.
    pub fn create_delta(&mut self, source: &[u8], target: &[u8]) -> DeltaResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.session.policy().encode_size(target.len()));
        self.write_delta(source, target, &mut out)?;
        Ok(out)
    }

    /// Output buffer size (zero until first use when sized lazily).
    pub fn buffer_capacity(&self) -> usize {
        self.session.buffer_capacity()
    }

    /// Counters from the most recent successful call.
    pub fn last_stats(&self) -> Option<StreamStats> {
        self.last_stats
    }

    pub fn engine(&self) -> &E {
        self.session.engine()
    }
}

// ---------------------------------------------------------------------------
// Decompressor
// ---------------------------------------------------------------------------

/// Applies deltas. Reusable, but not from several threads at once.
#[derive(Debug)]
pub struct Decompressor<E: CompressionEngine = DeflateEngine> {
    session: StreamSession<E>,
    last_stats: Option<StreamStats>,
}

impl Decompressor<DeflateEngine> {
    /// Decompressor with default options; the buffer is sized on first use.
    pub fn new() -> Self {
        Self::with_options(CodecOptions::default())
    }

    /// Decompressor with an output buffer of `buffer_size` bytes.
    ///
    /// Zero falls back to sizing the buffer from the default policy on first
    /// use.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self::with_options(CodecOptions {
            buffer_size,
            ..CodecOptions::default()
        })
    }

    pub fn with_options(opts: CodecOptions) -> Self {
        Self::with_engine(DeflateEngine::new(opts.level), &opts)
    }
}

impl Default for Decompressor<DeflateEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CompressionEngine> Decompressor<E> {
    /// Decompressor driving a custom engine.
    pub fn with_engine(engine: E, opts: &CodecOptions) -> Self {
        Self {
            session: StreamSession::with_buffer_size(engine, opts.policy, opts.buffer_size),
            last_stats: None,
        }
    }

    /// Apply `delta` to `source`, writing the reconstructed target to `sink`.
    pub fn write_target<W: Write + ?Sized>(
        &mut self,
        source: &[u8],
        delta: &[u8],
        sink: &mut W,
    ) -> DeltaResult<()> {
        self.last_stats = None;
        let stats = self.session.run_decode(source, delta, sink)?;
        self.last_stats = Some(stats);
        Ok(())
    }

    /// Apply `delta` to `source`, returning the reconstructed target.
    pub fn apply_delta(&mut self, source: &[u8], delta: &[u8]) -> DeltaResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write_target(source, delta, &mut out)?;
        Ok(out)
    }

    /// Output buffer size (zero until first use when sized lazily).
    pub fn buffer_capacity(&self) -> usize {
        self.session.buffer_capacity()
    }

    /// Counters from the most recent successful call.
    pub fn last_stats(&self) -> Option<StreamStats> {
        self.last_stats
    }

    pub fn engine(&self) -> &E {
        self.session.engine()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
