//! Process environment block resolution.
//!
//! A target's control block is read with one of two layouts and one of two
//! read primitives, depending on how the target's pointer width relates to
//! the inspector's. [`ControlBlock::locate`] settles that relationship once;
//! every subsequent read of the same extraction goes through the returned
//! value, so the layout and primitive cannot be mixed within one call.

mod layout;
mod process_parameters;

use procpeek_core::{OsError, PointerWidth, ProcDriver, ProcError, ProcessHandle, Va};
use zerocopy::{FromBytes, IntoBytes};

pub use self::{
    layout::{
        _PEB32, _PEB64, _RTL_USER_PROCESS_PARAMETERS32, _RTL_USER_PROCESS_PARAMETERS64,
        _UNICODE_STRING32, _UNICODE_STRING64,
    },
    process_parameters::{ProcessDataKind, ProcessParameters, RemoteRegion},
};
use self::layout::{ControlBlockLayout, Layout32, Layout64};

/// The pointer-width relationship between the inspector and a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitness {
    /// Both have the same width.
    Native,

    /// A 64-bit inspector and a 32-bit target running under WoW64.
    InspectorWiderThanTarget,

    /// A 32-bit inspector under WoW64 and a 64-bit target.
    InspectorNarrowerThanTarget,
}

impl std::fmt::Display for Bitness {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::InspectorWiderThanTarget => f.write_str("wider"),
            Self::InspectorNarrowerThanTarget => f.write_str("narrower"),
        }
    }
}

/// The located process environment block of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlBlock {
    /// Same width on both sides; read with the inspector's own layout.
    Native {
        /// Address of the `_PEB`.
        peb: Va,

        /// The shared pointer width.
        width: PointerWidth,
    },

    /// A 32-bit target seen from a 64-bit inspector.
    Wider {
        /// Address of the `_PEB32`.
        peb: Va,
    },

    /// A 64-bit target seen from a 32-bit inspector.
    ///
    /// Every read has to go through the width-crossing primitive.
    Narrower {
        /// Address of the `_PEB64`.
        peb: Va,
    },
}

impl ControlBlock {
    /// Determines the bitness relationship and locates the target's
    /// process environment block.
    pub fn locate<Driver>(handle: &ProcessHandle<Driver>) -> Result<Self, ProcError>
    where
        Driver: ProcDriver,
    {
        let driver = handle.driver();
        let width = driver.pointer_width();

        let result = match width {
            PointerWidth::Bits64 => match driver.wow64_information(handle.raw())? {
                Some(peb) => Self::Wider { peb },
                None => Self::Native {
                    peb: driver.basic_information(handle.raw())?,
                    width,
                },
            },
            PointerWidth::Bits32 => {
                let inspector_wow64 = driver.is_wow64(None)?;
                let target_wow64 = driver.is_wow64(Some(handle.raw()))?;

                if inspector_wow64 && !target_wow64 {
                    Self::Narrower {
                        peb: driver.basic_information64(handle.raw())?,
                    }
                }
                else {
                    Self::Native {
                        peb: driver.basic_information(handle.raw())?,
                        width,
                    }
                }
            }
        };

        tracing::debug!(
            pid = %handle.pid(),
            bitness = %result.bitness(),
            peb = %result.peb(),
            "control block located"
        );

        Ok(result)
    }

    /// Returns the bitness relationship.
    pub fn bitness(&self) -> Bitness {
        match self {
            Self::Native { .. } => Bitness::Native,
            Self::Wider { .. } => Bitness::InspectorWiderThanTarget,
            Self::Narrower { .. } => Bitness::InspectorNarrowerThanTarget,
        }
    }

    /// Returns the address of the process environment block.
    pub fn peb(&self) -> Va {
        match self {
            Self::Native { peb, .. } | Self::Wider { peb } | Self::Narrower { peb } => *peb,
        }
    }

    /// Returns the pointer width of the target.
    pub fn target_width(&self) -> PointerWidth {
        match self {
            Self::Native { width, .. } => *width,
            Self::Wider { .. } => PointerWidth::Bits32,
            Self::Narrower { .. } => PointerWidth::Bits64,
        }
    }

    /// Reads the process parameters with the layout matching the target.
    pub fn parameters<Driver>(
        &self,
        handle: &ProcessHandle<Driver>,
    ) -> Result<ProcessParameters, ProcError>
    where
        Driver: ProcDriver,
    {
        match self.target_width() {
            PointerWidth::Bits32 => self.parameters_with::<Layout32, _>(handle),
            PointerWidth::Bits64 => self.parameters_with::<Layout64, _>(handle),
        }
    }

    /// Copies target memory at `va` into `buffer` with the read primitive
    /// matching the target.
    pub fn read<Driver>(
        &self,
        handle: &ProcessHandle<Driver>,
        va: Va,
        buffer: &mut [u8],
    ) -> Result<(), OsError>
    where
        Driver: ProcDriver,
    {
        match self {
            Self::Narrower { .. } => handle.read64(va, buffer),
            _ => handle.read(va, buffer),
        }
    }

    /// Returns the number of readable bytes from `va` to the end of the
    /// memory region containing it.
    ///
    /// Not available across the narrower boundary: there is no 64-bit
    /// region query reachable from a 32-bit inspector.
    pub fn extent<Driver>(&self, handle: &ProcessHandle<Driver>, va: Va) -> Result<u64, ProcError>
    where
        Driver: ProcDriver,
    {
        if let Self::Narrower { .. } = self {
            return Err(ProcError::access_denied(
                "can't query 64-bit process in 32-bit-WoW mode",
            ));
        }

        let region = handle.driver().query_region(handle.raw(), va)?;
        tracing::trace!(%va, base = %region.base, size = region.size, "region queried");

        region
            .extent_from(va)
            .ok_or(ProcError::Corrupted("address outside of its memory region"))
    }

    fn parameters_with<Layout, Driver>(
        &self,
        handle: &ProcessHandle<Driver>,
    ) -> Result<ProcessParameters, ProcError>
    where
        Layout: ControlBlockLayout,
        Driver: ProcDriver,
    {
        debug_assert_eq!(Layout::WIDTH, self.target_width());

        let peb = self.read_struct::<Layout::Peb, _>(handle, self.peb())?;
        let va = Layout::process_parameters(&peb);
        if va.is_null() {
            return Err(ProcError::Corrupted("process parameters pointer is NULL"));
        }

        let parameters = self.read_struct::<Layout::Parameters, _>(handle, va)?;
        Ok(Layout::fields(&parameters))
    }

    fn read_struct<T, Driver>(&self, handle: &ProcessHandle<Driver>, va: Va) -> Result<T, OsError>
    where
        T: FromBytes + IntoBytes,
        Driver: ProcDriver,
    {
        match self {
            Self::Narrower { .. } => handle.read_struct64(va),
            _ => handle.read_struct(va),
        }
    }
}
