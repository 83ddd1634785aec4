// Deflate engine: zlib streams primed with a preset dictionary.
//
// Encoding a delta is deflate with the source installed as the preset
// dictionary, so repeated substrings of the target become back-references
// into the source. Decoding is inflate with the same dictionary supplied
// when the stream header asks for it.
//
// Delta layout (RFC 1950):
//   - 2-byte zlib header; FDICT is set when the source is non-empty
//   - 4-byte Adler-32 of the source (only with FDICT)
//   - deflate body
//   - 4-byte Adler-32 of the target
//
// Only the last 32 KiB of the source are reachable (deflate window size).

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use super::{CompressionEngine, Drain, EngineStatus, Mode};

/// zlib `Z_STREAM_ERROR`: invalid engine state or parameters.
pub const Z_STREAM_ERROR: i32 = -2;
/// zlib `Z_DATA_ERROR`: corrupt input or wrong dictionary.
pub const Z_DATA_ERROR: i32 = -3;
/// zlib `Z_BUF_ERROR`: no progress possible (truncated input).
pub const Z_BUF_ERROR: i32 = -5;

/// Default compression level (zlib default).
pub const DEFAULT_LEVEL: u32 = 6;

/// Deflate-backed [`CompressionEngine`].
///
/// The underlying zlib streams are allocated on first use and reset on every
/// `init`, so a long-lived engine does not reallocate its window per session.
pub struct DeflateEngine {
    level: Compression,
    compress: Option<Compress>,
    decompress: Option<Decompress>,
    active: Option<Mode>,
}

impl DeflateEngine {
    /// Create an engine with the given compression level (0-9).
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
            compress: None,
            decompress: None,
            active: None,
        }
    }

    /// Compression level used for encoding.
    pub fn level(&self) -> u32 {
        self.level.level()
    }

    /// Mode of the session in progress, if any.
    pub fn active_mode(&self) -> Option<Mode> {
        self.active
    }

    fn init_encode(&mut self, dictionary: &[u8]) -> EngineStatus {
        let level = self.level;
        let compress = self
            .compress
            .get_or_insert_with(|| Compress::new(level, true));
        compress.reset();

        // An empty dictionary would still set FDICT with a useless id.
        if !dictionary.is_empty()
            && let Err(e) = compress.set_dictionary(dictionary)
        {
            return EngineStatus::error(Z_STREAM_ERROR, e.to_string());
        }
        EngineStatus::Ok
    }

    fn init_decode(&mut self) -> EngineStatus {
        let decompress = self
            .decompress
            .get_or_insert_with(|| Decompress::new(true));
        decompress.reset(true);
        EngineStatus::Ok
    }

    fn drain_encode(&mut self, input: &[u8], output: &mut [u8]) -> Drain {
        let Some(compress) = self.compress.as_mut() else {
            return not_initialized();
        };

        let (in_before, out_before) = (compress.total_in(), compress.total_out());
        let result = compress.compress(input, output, FlushCompress::Finish);
        let consumed = (compress.total_in() - in_before) as usize;
        let produced = (compress.total_out() - out_before) as usize;

        let status = match result {
            Ok(Status::StreamEnd) => EngineStatus::StreamEnd,
            // BufError without progress is caught by the session's progress check.
            Ok(Status::Ok | Status::BufError) => EngineStatus::Ok,
            Err(e) => EngineStatus::error(Z_STREAM_ERROR, e.to_string()),
        };
        Drain::new(consumed, produced, status)
    }

    fn drain_decode(&mut self, dictionary: &[u8], input: &[u8], output: &mut [u8]) -> Drain {
        let Some(decompress) = self.decompress.as_mut() else {
            return not_initialized();
        };

        let (in_before, out_before) = (decompress.total_in(), decompress.total_out());
        let mut dictionary_supplied = false;

        let status = loop {
            let offset = (decompress.total_in() - in_before) as usize;
            let written = (decompress.total_out() - out_before) as usize;

            match decompress.decompress(
                &input[offset..],
                &mut output[written..],
                FlushDecompress::Sync,
            ) {
                Ok(Status::StreamEnd) => break EngineStatus::StreamEnd,
                Ok(Status::Ok) => break EngineStatus::Ok,
                Ok(Status::BufError) => {
                    let remaining = input.len() - (decompress.total_in() - in_before) as usize;
                    if remaining == 0 {
                        break EngineStatus::error(Z_BUF_ERROR, "delta is truncated");
                    }
                    if decompress.total_in() == in_before && decompress.total_out() == out_before {
                        break EngineStatus::error(Z_BUF_ERROR, "inflate made no progress");
                    }
                    break EngineStatus::Ok;
                }
                Err(e) if e.needs_dictionary().is_some() => {
                    if dictionary_supplied {
                        break EngineStatus::error(Z_DATA_ERROR, "dictionary requested twice");
                    }
                    if decompress.set_dictionary(dictionary).is_err() {
                        break EngineStatus::error(
                            Z_DATA_ERROR,
                            "source does not match delta dictionary",
                        );
                    }
                    dictionary_supplied = true;
                }
                Err(e) => break EngineStatus::error(Z_DATA_ERROR, e.to_string()),
            }
        };

        let consumed = (decompress.total_in() - in_before) as usize;
        let produced = (decompress.total_out() - out_before) as usize;
        Drain::new(consumed, produced, status)
    }
}

impl Default for DeflateEngine {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

impl std::fmt::Debug for DeflateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateEngine")
            .field("level", &self.level.level())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl CompressionEngine for DeflateEngine {
    fn init(&mut self, mode: Mode, dictionary: &[u8]) -> EngineStatus {
        let status = match mode {
            Mode::Encode => self.init_encode(dictionary),
            Mode::Decode => self.init_decode(),
        };
        if status == EngineStatus::Ok {
            self.active = Some(mode);
        }
        status
    }

    fn drain(&mut self, dictionary: &[u8], input: &[u8], output: &mut [u8]) -> Drain {
        match self.active {
            Some(Mode::Encode) => self.drain_encode(input, output),
            Some(Mode::Decode) => self.drain_decode(dictionary, input, output),
            None => not_initialized(),
        }
    }

    fn end(&mut self) {
        // Streams stay allocated; the next init resets them.
        self.active = None;
    }
}

fn not_initialized() -> Drain {
    Drain::new(
        0,
        0,
        EngineStatus::error(Z_STREAM_ERROR, "engine used without init"),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
