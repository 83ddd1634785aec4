// Parallel batch helpers (feature `parallel`).
//
// Each pair is an independent one-shot operation on rayon's thread pool,
// borrowing a codec from the global pools. A single operation never runs on
// more than one thread.

use rayon::prelude::*;

use crate::error::DeltaResult;
use crate::pool;

/// Create one delta per `(source, target)` pair. Results keep input order.
pub fn create_deltas(pairs: &[(&[u8], &[u8])]) -> Vec<DeltaResult<Vec<u8>>> {
    pairs
        .par_iter()
        .map(|(source, target)| pool::create_delta(source, target))
        .collect()
}

/// Apply one delta per `(source, delta)` pair. Results keep input order.
pub fn apply_deltas(pairs: &[(&[u8], &[u8])]) -> Vec<DeltaResult<Vec<u8>>> {
    pairs
        .par_iter()
        .map(|(source, delta)| pool::apply_delta(source, delta))
        .collect()
}
