use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use once_cell::sync::Lazy;

/// A best-effort cache of the last successful process-snapshot size.
///
/// The snapshot query grows its buffer until the OS accepts it; starting
/// from the size that worked last time usually saves those retries.
/// Updates are relaxed and unsynchronized: a stale value costs at most an
/// extra retry and never affects the result.
#[derive(Debug)]
pub struct SnapshotSizeHint {
    initial: AtomicU32,
    ceiling: u32,
}

impl SnapshotSizeHint {
    /// The size the first query starts from.
    pub const DEFAULT_INITIAL: u32 = 0x4000;

    /// Sizes above this are not remembered.
    pub const DEFAULT_CEILING: u32 = 0x20000;

    /// Creates a hint with the default initial size and ceiling.
    pub const fn new() -> Self {
        Self::with_limits(Self::DEFAULT_INITIAL, Self::DEFAULT_CEILING)
    }

    /// Creates a hint with a custom initial size and ceiling.
    pub const fn with_limits(initial: u32, ceiling: u32) -> Self {
        Self {
            initial: AtomicU32::new(initial),
            ceiling,
        }
    }

    /// Returns the process-wide shared hint.
    pub fn shared() -> Arc<Self> {
        static SHARED: Lazy<Arc<SnapshotSizeHint>> =
            Lazy::new(|| Arc::new(SnapshotSizeHint::new()));

        Arc::clone(&SHARED)
    }

    /// Returns the size to start the next query from.
    pub fn get(&self) -> u32 {
        self.initial.load(Ordering::Relaxed)
    }

    /// Records the size of a successful query.
    ///
    /// Sizes above the ceiling are ignored.
    pub fn record(&self, size: u32) {
        if size <= self.ceiling {
            self.initial.store(size, Ordering::Relaxed);
        }
    }
}

impl Default for SnapshotSizeHint {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_sizes_up_to_the_ceiling() {
        let hint = SnapshotSizeHint::with_limits(0x100, 0x1000);
        assert_eq!(hint.get(), 0x100);

        hint.record(0x800);
        assert_eq!(hint.get(), 0x800);

        hint.record(0x1000);
        assert_eq!(hint.get(), 0x1000);

        hint.record(0x1001);
        assert_eq!(hint.get(), 0x1000);
    }

    #[test]
    fn shared_hint_is_one_instance() {
        assert!(Arc::ptr_eq(
            &SnapshotSizeHint::shared(),
            &SnapshotSizeHint::shared()
        ));
    }
}
