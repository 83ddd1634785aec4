// Integration tests for codecs, sessions, and the pooled API.
//
// Covers round trips over edge-case inputs, streaming vs. buffered
// equivalence, codec reuse, the bounded output buffer, corrupt-delta
// rejection, and sink failures.

use std::io::{self, Write};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zdelta::codec::{CodecOptions, Compressor, Decompressor};
use zdelta::engine::deflate::{Z_BUF_ERROR, Z_DATA_ERROR};
use zdelta::sizing::{BufferPolicy, MAX_WORKING_SET};
use zdelta::{DeltaError, apply_delta, create_delta, write_delta, write_target};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const XANADU: &[u8] = b"In Xanadu did Kublai Khan a stately pleasure-dome decree";
const OOO: &[u8] = b"In Ooo did Jake a bitchen pleasure-dome decree";

fn roundtrip(source: &[u8], target: &[u8]) -> Vec<u8> {
    let delta = create_delta(source, target).unwrap();
    let decoded = apply_delta(source, &delta).unwrap();
    assert_eq!(
        decoded,
        target,
        "roundtrip mismatch (source={}, target={}, delta={})",
        source.len(),
        target.len(),
        delta.len()
    );
    delta
}

fn random_data(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; size];
    rng.fill(&mut data[..]);
    data
}

fn mutate_data(source: &[u8], changes: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut target = source.to_vec();
    for _ in 0..changes {
        let pos = rng.random_range(0..target.len());
        target[pos] = rng.random();
    }
    target
}

/// Sink that counts writes and remembers the largest chunk.
#[derive(Default)]
struct CountingSink {
    data: Vec<u8>,
    writes: usize,
    largest_write: usize,
}

impl Write for CountingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes += 1;
        self.largest_write = self.largest_write.max(buf.len());
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that accepts `budget` bytes and then fails.
struct FailingSink {
    budget: usize,
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
        }
        let n = buf.len().min(self.budget);
        self.budget -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn xanadu_delta_is_materially_smaller() {
    let delta = roundtrip(XANADU, OOO);
    assert!(
        delta.len() * 10 < OOO.len() * 9,
        "delta={} target={}",
        delta.len(),
        OOO.len()
    );
}

#[test]
fn empty_inputs() {
    roundtrip(b"", b"");
    roundtrip(b"some source", b"");
    roundtrip(b"", b"target without any source");
}

#[test]
fn unrelated_inputs() {
    let source = random_data(4096, 1);
    let target = random_data(4096, 2);
    roundtrip(&source, &target);
}

#[test]
fn identical_inputs_compress_well() {
    let source = random_data(16 * 1024, 3);
    let delta = roundtrip(&source, &source);
    assert!(
        delta.len() < source.len() / 10,
        "delta={} source={}",
        delta.len(),
        source.len()
    );
}

#[test]
fn small_mutations_compress_well() {
    let source = random_data(16 * 1024, 4);
    let target = mutate_data(&source, 16, 5);
    let delta = roundtrip(&source, &target);
    assert!(delta.len() < target.len() / 4);
}

#[test]
fn source_larger_than_deflate_window() {
    // Only the tail of the source is reachable; the round trip still holds.
    let source = random_data(256 * 1024, 6);
    let mut target = source[..1024].to_vec();
    target.extend_from_slice(&source[source.len() - 4096..]);
    roundtrip(&source, &target);
}

#[test]
fn all_levels_roundtrip() {
    let source = random_data(8 * 1024, 7);
    let target = mutate_data(&source, 40, 8);
    for level in 0..=9 {
        let opts = CodecOptions {
            level,
            ..CodecOptions::default()
        };
        let delta = Compressor::with_options(opts.clone())
            .create_delta(&source, &target)
            .unwrap();
        let decoded = Decompressor::with_options(opts)
            .apply_delta(&source, &delta)
            .unwrap();
        assert_eq!(decoded, target, "level {level} roundtrip failed");
    }
}

// ---------------------------------------------------------------------------
// Streaming equivalence and reuse
// ---------------------------------------------------------------------------

#[test]
fn streaming_matches_buffered() {
    let source = random_data(32 * 1024, 9);
    let target = mutate_data(&source, 100, 10);

    let delta = create_delta(&source, &target).unwrap();
    let mut streamed_delta = Vec::new();
    write_delta(&source, &target, &mut streamed_delta).unwrap();
    assert_eq!(streamed_delta, delta);

    let rebuilt = apply_delta(&source, &delta).unwrap();
    let mut streamed_target = Vec::new();
    write_target(&source, &delta, &mut streamed_target).unwrap();
    assert_eq!(streamed_target, rebuilt);
    assert_eq!(rebuilt, target);
}

#[test]
fn small_buffer_matches_large_buffer() {
    let source = random_data(64 * 1024, 11);
    let target = mutate_data(&source, 64, 12);

    let tiny = CodecOptions {
        buffer_size: 64,
        ..CodecOptions::default()
    };
    let delta_tiny = Compressor::with_options(tiny.clone())
        .create_delta(&source, &target)
        .unwrap();
    let delta_big = Compressor::with_buffer_size(MAX_WORKING_SET)
        .create_delta(&source, &target)
        .unwrap();
    assert_eq!(delta_tiny, delta_big);

    let mut decompressor = Decompressor::with_options(tiny);
    assert_eq!(decompressor.apply_delta(&source, &delta_tiny).unwrap(), target);
    assert!(decompressor.last_stats().unwrap().flushes > 1);
}

#[test]
fn reused_codecs_are_deterministic() {
    let mut compressor = Compressor::new();
    let mut decompressor = Decompressor::new();

    let first = compressor.create_delta(XANADU, OOO).unwrap();
    let second = compressor.create_delta(XANADU, OOO).unwrap();
    assert_eq!(first, second);

    // Interleave other work; the same inputs still give the same delta.
    let other_source = random_data(2048, 13);
    let other_target = mutate_data(&other_source, 8, 14);
    let other = compressor.create_delta(&other_source, &other_target).unwrap();
    assert_eq!(
        decompressor.apply_delta(&other_source, &other).unwrap(),
        other_target
    );
    assert_eq!(compressor.create_delta(XANADU, OOO).unwrap(), first);
    assert_eq!(decompressor.apply_delta(XANADU, &first).unwrap(), OOO);
}

// ---------------------------------------------------------------------------
// Bounded working set
// ---------------------------------------------------------------------------

#[test]
fn large_target_stays_within_working_set() {
    let target = random_data(10 * MAX_WORKING_SET, 15);
    let source = target[..4096].to_vec();

    let mut compressor = Compressor::new();
    let mut delta_sink = CountingSink::default();
    compressor
        .write_delta(&source, &target, &mut delta_sink)
        .unwrap();

    assert!(compressor.buffer_capacity() <= MAX_WORKING_SET);
    assert!(delta_sink.largest_write <= MAX_WORKING_SET);
    assert!(delta_sink.writes > 1, "writes={}", delta_sink.writes);

    let mut decompressor = Decompressor::new();
    let mut target_sink = CountingSink::default();
    decompressor
        .write_target(&source, &delta_sink.data, &mut target_sink)
        .unwrap();

    assert!(decompressor.buffer_capacity() <= MAX_WORKING_SET);
    assert!(target_sink.largest_write <= MAX_WORKING_SET);
    assert!(target_sink.writes >= 10, "writes={}", target_sink.writes);
    assert_eq!(target_sink.data, target);
}

#[test]
fn custom_working_set_is_respected() {
    let policy = BufferPolicy::with_max_working_set(1024);
    let opts = CodecOptions {
        policy,
        ..CodecOptions::default()
    };
    let target = random_data(64 * 1024, 16);

    let mut compressor = Compressor::with_options(opts);
    let mut sink = CountingSink::default();
    compressor.write_delta(b"", &target, &mut sink).unwrap();

    assert_eq!(compressor.buffer_capacity(), 1024);
    assert!(sink.largest_write <= 1024);
    assert_eq!(compressor.last_stats().unwrap().flushes, sink.writes as u64);
}

// ---------------------------------------------------------------------------
// Corrupt deltas
// ---------------------------------------------------------------------------

#[test]
fn every_byte_corruption_is_rejected() {
    let delta = create_delta(XANADU, OOO).unwrap();
    for i in 0..delta.len() {
        let mut tampered = delta.clone();
        tampered[i] ^= 0x55;
        match apply_delta(XANADU, &tampered) {
            Err(e) => assert!(e.is_engine_error(), "byte {i}: unexpected error kind {e:?}"),
            Ok(out) => panic!("byte {i}: tampered delta decoded to {out:?}"),
        }
    }
}

#[test]
fn truncated_delta_is_rejected() {
    let delta = create_delta(XANADU, OOO).unwrap();
    for cut in [0, 1, 2, 6, delta.len() / 2, delta.len() - 1] {
        let err = apply_delta(XANADU, &delta[..cut]).unwrap_err();
        assert!(err.is_engine_error(), "cut {cut}: {err:?}");
    }
    assert_eq!(
        apply_delta(XANADU, &[]).unwrap_err().code(),
        Some(Z_BUF_ERROR)
    );
}

#[test]
fn wrong_source_is_rejected() {
    let delta = create_delta(XANADU, OOO).unwrap();
    let err = apply_delta(b"some other source entirely", &delta).unwrap_err();
    assert_eq!(err.code(), Some(Z_DATA_ERROR));

    let err = apply_delta(b"", &delta).unwrap_err();
    assert_eq!(err.code(), Some(Z_DATA_ERROR));
}

// ---------------------------------------------------------------------------
// Sink failures
// ---------------------------------------------------------------------------

#[test]
fn sink_failure_surfaces_unchanged() {
    let target = random_data(8 * 1024, 17);
    let mut compressor = Compressor::with_buffer_size(1024);
    let mut sink = FailingSink { budget: 2048 };

    let err = compressor
        .write_delta(b"", &target, &mut sink)
        .unwrap_err();
    match err {
        DeltaError::Sink(e) => assert_eq!(e.kind(), io::ErrorKind::StorageFull),
        other => panic!("expected sink error, got {other:?}"),
    }
    assert!(compressor.last_stats().is_none());

    // The compressor is usable again afterwards.
    let delta = compressor.create_delta(b"", &target).unwrap();
    assert_eq!(apply_delta(b"", &delta).unwrap(), target);
}

#[test]
fn decode_sink_failure_is_not_an_engine_error() {
    let delta = create_delta(XANADU, OOO).unwrap();
    let mut sink = FailingSink { budget: 0 };
    let err = write_target(XANADU, &delta, &mut sink).unwrap_err();
    assert!(err.is_sink_error());
    assert!(!err.is_engine_error());
}
