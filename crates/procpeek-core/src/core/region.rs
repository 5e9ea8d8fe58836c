use super::ids::Va;

/// A committed or reserved region of a target's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    /// The base address of the region.
    pub base: Va,

    /// The size of the region in bytes.
    pub size: u64,
}

impl MemoryRegion {
    /// Returns the number of bytes readable from `va` up to the end of the
    /// region, or `None` if `va` lies outside of it.
    pub fn extent_from(&self, va: Va) -> Option<u64> {
        if va < self.base {
            return None;
        }

        let offset = va - self.base;
        if offset > self.size {
            return None;
        }

        Some(self.size - offset)
    }
}
