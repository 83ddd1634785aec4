// Output buffer sizing policy.
//
// Picks the capacity of a session's output buffer from the sizes known
// before the loop starts:
//   - encode: target_len / ratio + overhead (deltas are expected to shrink)
//   - decode: source_len + ratio * delta_len (targets are expected to grow)
// Both are clamped to [min_size, max_working_set]. The session loop
// iterates instead of growing the buffer, so the cap bounds peak memory.

/// Expected delta compression ratio.
pub const EXPECTED_RATIO: usize = 4;

/// Fixed overhead added to the encode estimate so small targets still get a
/// useful buffer.
pub const ENCODE_OVERHEAD: usize = 64;

/// Smallest buffer the policy will hand out.
pub const MIN_BUFFER_SIZE: usize = 64;

/// Largest output buffer a session allocates, regardless of input size.
pub const MAX_WORKING_SET: usize = 256 * 1024; // 256 KiB

/// Buffer size used by pooled codecs and by the CLI.
pub const DEFAULT_BUFFER_SIZE: usize = MAX_WORKING_SET;

/// Constants driving the initial output-buffer size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    /// Assumed compression ratio between target and delta.
    pub ratio: usize,
    /// Added to the encode estimate.
    pub overhead: usize,
    /// Lower clamp.
    pub min_size: usize,
    /// Upper clamp: the maximum working set of one session.
    pub max_working_set: usize,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            ratio: EXPECTED_RATIO,
            overhead: ENCODE_OVERHEAD,
            min_size: MIN_BUFFER_SIZE,
            max_working_set: MAX_WORKING_SET,
        }
    }
}

impl BufferPolicy {
    /// Policy with a different working-set cap and default ratio/overhead.
    pub fn with_max_working_set(max_working_set: usize) -> Self {
        Self {
            max_working_set,
            ..Self::default()
        }
    }

    /// Buffer size for encoding a target of `target_len` bytes.
    pub fn encode_size(&self, target_len: usize) -> usize {
        let estimate = (target_len / self.ratio.max(1)).saturating_add(self.overhead);
        self.clamp(estimate)
    }

    /// Buffer size for decoding `delta_len` bytes against a source of
    /// `source_len` bytes.
    pub fn decode_size(&self, source_len: usize, delta_len: usize) -> usize {
        let estimate = source_len.saturating_add(self.ratio.saturating_mul(delta_len));
        self.clamp(estimate)
    }

    /// Clamp an explicit size hint into the policy's bounds.
    pub fn clamp(&self, size: usize) -> usize {
        // A misconfigured policy (min > max) still yields a usable buffer.
        let max = self.max_working_set.max(1);
        size.max(self.min_size).min(max)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
