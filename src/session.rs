// Stream session: drives a compression engine with a bounded output buffer.
//
// One session owns one engine and one output buffer. Each run:
//   1. sizes the buffer (first run only; the buffer is reused and never shrunk)
//   2. opens the engine through `EngineGuard`, whose Drop ends the engine
//      session on every exit path
//   3. loops: drain into the buffer, stop on engine error, flush the bytes
//      produced this iteration to the sink, stop on stream end
//
// Memory use is O(buffer size), independent of input and output sizes.

use std::io::Write;

use log::{debug, trace, warn};

use crate::engine::{CompressionEngine, Drain, Mode};
use crate::error::{Completion, DeltaError, DeltaResult, translate};
use crate::sizing::BufferPolicy;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counters describing one completed session run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Input bytes consumed by the engine.
    pub consumed: u64,
    /// Output bytes written to the sink.
    pub produced: u64,
    /// Engine drain calls.
    pub iterations: u64,
    /// Sink writes (one per iteration that produced output).
    pub flushes: u64,
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Per-run cursor state. Created when a run starts, dropped when it ends.
#[derive(Debug)]
struct SessionState<'a> {
    input: &'a [u8],
    next_in: usize,
    total_out: u64,
    iterations: u64,
    flushes: u64,
    finished: bool,
}

impl<'a> SessionState<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            next_in: 0,
            total_out: 0,
            iterations: 0,
            flushes: 0,
            finished: false,
        }
    }

    fn pending(&self) -> &'a [u8] {
        &self.input[self.next_in..]
    }

    fn stats(&self) -> StreamStats {
        StreamStats {
            consumed: self.next_in as u64,
            produced: self.total_out,
            iterations: self.iterations,
            flushes: self.flushes,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine guard
// ---------------------------------------------------------------------------

/// An initialized engine session. Dropping the guard ends the session.
struct EngineGuard<'e, E: CompressionEngine> {
    engine: &'e mut E,
}

impl<'e, E: CompressionEngine> EngineGuard<'e, E> {
    /// Initialize the engine. Nothing is acquired if init fails, so no guard
    /// is returned and `end` is not called.
    fn open(engine: &'e mut E, mode: Mode, dictionary: &[u8]) -> DeltaResult<Self> {
        translate(engine.init(mode, dictionary))?;
        Ok(Self { engine })
    }

    fn drain(&mut self, dictionary: &[u8], input: &[u8], output: &mut [u8]) -> Drain {
        self.engine.drain(dictionary, input, output)
    }
}

impl<E: CompressionEngine> Drop for EngineGuard<'_, E> {
    fn drop(&mut self) {
        self.engine.end();
    }
}

// ---------------------------------------------------------------------------
// StreamSession
// ---------------------------------------------------------------------------

/// Drives a [`CompressionEngine`] to completion through a reusable buffer.
///
/// Not safe for concurrent use; `&mut self` on every run enforces that.
#[derive(Debug)]
pub struct StreamSession<E> {
    engine: E,
    buffer: Vec<u8>,
    policy: BufferPolicy,
}

impl<E: CompressionEngine> StreamSession<E> {
    /// Create a session whose buffer is sized by `policy` on the first run.
    pub fn new(engine: E, policy: BufferPolicy) -> Self {
        Self {
            engine,
            buffer: Vec::new(),
            policy,
        }
    }

    /// Create a session with a buffer allocated up front.
    ///
    /// `size` is clamped to the policy bounds. Zero defers sizing to the
    /// policy on the first run.
    pub fn with_buffer_size(engine: E, policy: BufferPolicy, size: usize) -> Self {
        let buffer = if size == 0 {
            Vec::new()
        } else {
            vec![0u8; policy.clamp(size)]
        };
        Self {
            engine,
            buffer,
            policy,
        }
    }

    /// Current output buffer size (zero until the first run).
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn policy(&self) -> &BufferPolicy {
        &self.policy
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Encode `target` against `dictionary`, streaming the delta to `sink`.
    pub fn run_encode<W: Write + ?Sized>(
        &mut self,
        dictionary: &[u8],
        target: &[u8],
        sink: &mut W,
    ) -> DeltaResult<StreamStats> {
        self.run(Mode::Encode, dictionary, target, sink)
    }

    /// Decode `delta` against `dictionary`, streaming the target to `sink`.
    pub fn run_decode<W: Write + ?Sized>(
        &mut self,
        dictionary: &[u8],
        delta: &[u8],
        sink: &mut W,
    ) -> DeltaResult<StreamStats> {
        self.run(Mode::Decode, dictionary, delta, sink)
    }

    fn ensure_buffer(&mut self, mode: Mode, dictionary_len: usize, input_len: usize) {
        if !self.buffer.is_empty() {
            return;
        }
        let size = match mode {
            Mode::Encode => self.policy.encode_size(input_len),
            Mode::Decode => self.policy.decode_size(dictionary_len, input_len),
        };
        debug!("allocating {size}-byte output buffer for {mode:?}");
        self.buffer = vec![0u8; size];
    }

    fn run<W: Write + ?Sized>(
        &mut self,
        mode: Mode,
        dictionary: &[u8],
        input: &[u8],
        sink: &mut W,
    ) -> DeltaResult<StreamStats> {
        self.ensure_buffer(mode, dictionary.len(), input.len());

        let mut state = SessionState::new(input);
        let mut engine = EngineGuard::open(&mut self.engine, mode, dictionary)?;
        let buffer = self.buffer.as_mut_slice();

        while !state.finished {
            state.iterations += 1;
            let pending = state.pending();
            let drain = engine.drain(dictionary, pending, buffer);
            trace!(
                "{mode:?} iteration {}: consumed {} produced {} status {:?}",
                state.iterations, drain.consumed, drain.produced, drain.status
            );

            let completion = translate(drain.status)?;

            if drain.consumed > pending.len() || drain.produced > buffer.len() {
                return Err(violation(
                    state.iterations,
                    format!(
                        "reported {} consumed of {} pending and {} produced into {} bytes",
                        drain.consumed,
                        pending.len(),
                        drain.produced,
                        buffer.len()
                    ),
                ));
            }
            if completion == Completion::Continue && drain.consumed == 0 && drain.produced == 0 {
                return Err(violation(
                    state.iterations,
                    format!("no progress with {} bytes pending", pending.len()),
                ));
            }

            state.next_in += drain.consumed;
            if drain.produced > 0 {
                sink.write_all(&buffer[..drain.produced])
                    .map_err(DeltaError::Sink)?;
                state.total_out += drain.produced as u64;
                state.flushes += 1;
            }
            state.finished = completion == Completion::Finished;
        }

        let stats = state.stats();
        debug!(
            "{mode:?} session done: {} bytes in, {} bytes out, {} iterations",
            stats.consumed, stats.produced, stats.iterations
        );
        Ok(stats)
    }
}

fn violation(iteration: u64, detail: String) -> DeltaError {
    warn!("engine protocol violation at iteration {iteration}: {detail}");
    DeltaError::InvariantViolation { iteration, detail }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
