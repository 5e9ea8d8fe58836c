use serde::{Deserialize, Serialize};

/// The pointer width of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerWidth {
    /// 32-bit pointers.
    Bits32,

    /// 64-bit pointers.
    Bits64,
}

impl PointerWidth {
    /// The pointer width of the running process.
    pub const fn native() -> Self {
        #[cfg(target_pointer_width = "64")]
        {
            Self::Bits64
        }

        #[cfg(not(target_pointer_width = "64"))]
        {
            Self::Bits32
        }
    }
}

impl std::fmt::Display for PointerWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Bits32 => f.write_str("32-bit"),
            Self::Bits64 => f.write_str("64-bit"),
        }
    }
}
