// Compression engine seam.
//
// The session loop drives an engine through three calls:
//   - `init`  - start a session in encode or decode mode, primed with a
//               dictionary (the delta source)
//   - `drain` - consume pending input and fill an output buffer, reporting
//               exact byte counts and a status
//   - `end`   - release per-session resources
//
// `deflate` provides the production engine. Tests plug in scripted engines.

pub mod deflate;

pub use deflate::DeflateEngine;

/// Direction of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Produce a delta from a target.
    Encode,
    /// Reconstruct a target from a delta.
    Decode,
}

/// Engine-reported status after `init` or `drain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// Progress was made; more calls are needed.
    Ok,
    /// The stream is complete.
    StreamEnd,
    /// The engine rejected the input or hit an internal limit.
    Error {
        code: i32,
        message: Option<String>,
    },
}

impl EngineStatus {
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: Some(message.into()),
        }
    }
}

/// Result of one `drain` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drain {
    /// Input bytes consumed from the front of the pending input.
    pub consumed: usize,
    /// Output bytes written to the front of the output buffer.
    pub produced: usize,
    pub status: EngineStatus,
}

impl Drain {
    pub fn new(consumed: usize, produced: usize, status: EngineStatus) -> Self {
        Self {
            consumed,
            produced,
            status,
        }
    }
}

/// A dictionary-aware byte-stream compressor driven by a `StreamSession`.
///
/// One engine serves one session at a time. The session guarantees that
/// every successful `init` is paired with exactly one `end`, on every exit
/// path.
pub trait CompressionEngine {
    /// Start a new session. Any state from a previous session is discarded.
    fn init(&mut self, mode: Mode, dictionary: &[u8]) -> EngineStatus;

    /// Consume from `input` and write into `output`.
    ///
    /// `input` is the not-yet-consumed remainder of the session input; no
    /// more input will arrive after it. `dictionary` is the same slice passed
    /// to `init`, available for engines that only learn they need it
    /// mid-stream.
    fn drain(&mut self, dictionary: &[u8], input: &[u8], output: &mut [u8]) -> Drain;

    /// Release per-session resources.
    fn end(&mut self);
}

impl<E: CompressionEngine + ?Sized> CompressionEngine for Box<E> {
    fn init(&mut self, mode: Mode, dictionary: &[u8]) -> EngineStatus {
        (**self).init(mode, dictionary)
    }

    fn drain(&mut self, dictionary: &[u8], input: &[u8], output: &mut [u8]) -> Drain {
        (**self).drain(dictionary, input, output)
    }

    fn end(&mut self) {
        (**self).end();
    }
}
