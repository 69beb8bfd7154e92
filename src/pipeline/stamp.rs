//! Modification stamps.
//!
//! A single process-wide counter hands out strictly increasing values.
//! Comparing two stamps tells which of two events happened later, which is
//! all the cache logic needs.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static GLOBAL_STAMP: AtomicU64 = AtomicU64::new(0);

/// A point in modification time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Stamp(pub u64);

impl Stamp {
    /// Older than every stamp handed out by [`Stamp::next`].
    pub const ZERO: Stamp = Stamp(0);

    /// Take the next value of the global counter.
    pub fn next() -> Stamp {
        Stamp(GLOBAL_STAMP.fetch_add(1, Ordering::Relaxed) + 1)
    }

    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stamp({})", self.0)
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
