// Pooled one-shot API.
//
// `CodecPool<T>` hands out reusable codec objects: `checkout` pops an idle
// object (or builds one with the pool's factory), and the returned guard puts
// it back when dropped, whether the operation succeeded or not. The lock is
// held only for the pop/push, never during the operation itself.
//
// Two process-wide pools back `create_delta` / `apply_delta` /
// `write_delta` / `write_target`, so one-shot callers pay buffer and engine
// allocation only on cold start.

use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, Mutex, PoisonError};

use log::debug;

use crate::codec::{Compressor, Decompressor};
use crate::error::DeltaResult;
use crate::sizing::DEFAULT_BUFFER_SIZE;

/// Idle objects kept by each global pool; extras are dropped on return.
pub const DEFAULT_MAX_IDLE: usize = 16;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

// ---------------------------------------------------------------------------
// CodecPool
// ---------------------------------------------------------------------------

/// A pool of reusable objects built on demand by a factory.
pub struct CodecPool<T> {
    idle: Mutex<Vec<T>>,
    factory: Factory<T>,
    max_idle: Option<usize>,
    created: AtomicUsize,
}

impl<T> CodecPool<T> {
    /// Unbounded pool: every returned object is kept.
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            factory: Box::new(factory),
            max_idle: None,
            created: AtomicUsize::new(0),
        }
    }

    /// Pool that keeps at most `max_idle` objects between checkouts.
    pub fn bounded(factory: impl Fn() -> T + Send + Sync + 'static, max_idle: usize) -> Self {
        Self {
            max_idle: Some(max_idle),
            ..Self::new(factory)
        }
    }

    /// Take an object out of the pool, creating one if none is idle.
    pub fn checkout(&self) -> Pooled<'_, T> {
        let reused = self.lock().pop();
        let item = reused.unwrap_or_else(|| {
            let total = self.created.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("codec pool empty, creating object #{total}");
            (self.factory)()
        });
        Pooled {
            pool: self,
            item: Some(item),
        }
    }

    /// Objects currently waiting in the pool.
    pub fn idle_count(&self) -> usize {
        self.lock().len()
    }

    /// Objects built by the factory so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    fn checkin(&self, item: T) {
        let mut idle = self.lock();
        if self.max_idle.is_none_or(|max| idle.len() < max) {
            idle.push(item);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
        // The idle list stays consistent even if a holder panicked.
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for CodecPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecPool")
            .field("idle", &self.idle_count())
            .field("created", &self.created())
            .field("max_idle", &self.max_idle)
            .finish_non_exhaustive()
    }
}

/// A checked-out object. Returns to its pool on drop.
pub struct Pooled<'p, T> {
    pool: &'p CodecPool<T>,
    item: Option<T>,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("pooled object present until drop")
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("pooled object present until drop")
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.checkin(item);
        }
    }
}

// ---------------------------------------------------------------------------
// Global pools and one-shot functions
// ---------------------------------------------------------------------------

static COMPRESSORS: LazyLock<CodecPool<Compressor>> = LazyLock::new(|| {
    CodecPool::bounded(
        || Compressor::with_buffer_size(DEFAULT_BUFFER_SIZE),
        DEFAULT_MAX_IDLE,
    )
});

static DECOMPRESSORS: LazyLock<CodecPool<Decompressor>> = LazyLock::new(|| {
    CodecPool::bounded(
        || Decompressor::with_buffer_size(DEFAULT_BUFFER_SIZE),
        DEFAULT_MAX_IDLE,
    )
});

/// Process-wide pool behind `create_delta` and `write_delta`.
pub fn compressor_pool() -> &'static CodecPool<Compressor> {
    &COMPRESSORS
}

/// Process-wide pool behind `apply_delta` and `write_target`.
pub fn decompressor_pool() -> &'static CodecPool<Decompressor> {
    &DECOMPRESSORS
}

/// Return the delta from `source` to `target`, using a pooled compressor.
pub fn create_delta(source: &[u8], target: &[u8]) -> DeltaResult<Vec<u8>> {
    COMPRESSORS.checkout().create_delta(source, target)
}

/// Apply `delta` to `source`, using a pooled decompressor.
pub fn apply_delta(source: &[u8], delta: &[u8]) -> DeltaResult<Vec<u8>> {
    DECOMPRESSORS.checkout().apply_delta(source, delta)
}

/// Stream the delta from `source` to `target` into `sink`, using a pooled
/// compressor.
pub fn write_delta<W: Write + ?Sized>(source: &[u8], target: &[u8], sink: &mut W) -> DeltaResult<()> {
    COMPRESSORS.checkout().write_delta(source, target, sink)
}

/// Stream the target reconstructed from `source` and `delta` into `sink`,
/// using a pooled decompressor.
pub fn write_target<W: Write + ?Sized>(source: &[u8], delta: &[u8], sink: &mut W) -> DeltaResult<()> {
    DECOMPRESSORS.checkout().write_target(source, delta, sink)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
