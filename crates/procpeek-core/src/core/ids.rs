use serde::{Deserialize, Serialize};

use super::macros::impl_address;

impl_address!(Va, u64, "virtual address in the target process");

/// A process identifier.
///
/// Identifiers are reused by the OS over time; a `Pid` only names "the
/// process with this id" at the moment it is used.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Pid(pub u32);

impl Pid {
    /// The System Idle Process placeholder.
    pub const IDLE: Pid = Pid(0);

    /// Checks if this is the reserved idle placeholder.
    pub const fn is_idle(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Pid {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Pid> for u32 {
    fn from(value: Pid) -> Self {
        value.0
    }
}

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque, OS-granted handle value.
///
/// Ownership lives in [`ProcessHandle`]; this is only the raw value passed
/// through the driver.
///
/// [`ProcessHandle`]: crate::ProcessHandle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(pub usize);
