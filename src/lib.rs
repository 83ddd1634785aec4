//! zdelta: compact binary deltas between two byte sequences.
//!
//! A delta from `source` to `target` is the target compressed with the
//! source as a preset dictionary, so substrings shared with the source cost
//! a back-reference instead of their bytes.
//!
//! The crate provides:
//! - One-shot pooled functions (`create_delta`, `apply_delta`, `write_delta`,
//!   `write_target`)
//! - Reusable codec objects (`codec::Compressor`, `codec::Decompressor`)
//! - The bounded-memory session loop (`session`) over a pluggable
//!   compression engine (`engine`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature) and parallel batch helpers (`parallel`
//!   feature)
//!
//! # Quick Start
//!
//! ```no_run
//! let source = b"In Xanadu did Kublai Khan a stately pleasure-dome decree";
//! let target = b"In Ooo did Jake a bitchen pleasure-dome decree";
//!
//! let delta = zdelta::create_delta(source, target).unwrap();
//! assert!(delta.len() < target.len());
//! assert_eq!(zdelta::apply_delta(source, &delta).unwrap(), target);
//! ```

pub mod codec;
pub mod engine;
pub mod error;
pub mod io;
pub mod pool;
pub mod session;
pub mod sizing;

#[cfg(feature = "parallel")]
pub mod batch;

#[cfg(feature = "cli")]
pub mod cli;

pub use codec::{CodecOptions, Compressor, Decompressor};
pub use error::{DeltaError, DeltaResult};
pub use pool::{apply_delta, create_delta, write_delta, write_target};
