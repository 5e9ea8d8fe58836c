//! Pointer-width specific layouts of the process control block.
//!
//! Only the leading part of each structure is declared; everything past the
//! last field used here is never read.

#![allow(non_camel_case_types, non_snake_case)]

use std::mem::{offset_of, size_of};

use procpeek_core::{PointerWidth, Va};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::process_parameters::{ProcessParameters, RemoteRegion};

/// `_UNICODE_STRING` of a 32-bit process.
#[expect(missing_docs)]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct _UNICODE_STRING32 {
    pub Length: u16,
    pub MaximumLength: u16,
    pub Buffer: u32,
}

/// `_UNICODE_STRING` of a 64-bit process.
#[expect(missing_docs)]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct _UNICODE_STRING64 {
    pub Length: u16,
    pub MaximumLength: u16,
    pub _Padding: u32,
    pub Buffer: u64,
}

/// `_PEB32`, up to `ProcessParameters`.
#[expect(missing_docs)]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct _PEB32 {
    pub InheritedAddressSpace: u8,
    pub ReadImageFileExecOptions: u8,
    pub BeingDebugged: u8,
    pub BitField: u8,
    pub Mutant: u32,
    pub ImageBaseAddress: u32,
    pub Ldr: u32,
    pub ProcessParameters: u32,
}

/// `_PEB64`, up to `ProcessParameters`.
#[expect(missing_docs)]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct _PEB64 {
    pub InheritedAddressSpace: u8,
    pub ReadImageFileExecOptions: u8,
    pub BeingDebugged: u8,
    pub BitField: u8,
    pub _Padding0: [u8; 4],
    pub Mutant: u64,
    pub ImageBaseAddress: u64,
    pub Ldr: u64,
    pub ProcessParameters: u64,
}

/// `_RTL_USER_PROCESS_PARAMETERS32`, up to `Environment`.
#[expect(missing_docs)]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct _RTL_USER_PROCESS_PARAMETERS32 {
    pub MaximumLength: u32,
    pub Length: u32,
    pub Flags: u32,
    pub DebugFlags: u32,
    pub ConsoleHandle: u32,
    pub ConsoleFlags: u32,
    pub StandardInput: u32,
    pub StandardOutput: u32,
    pub StandardError: u32,
    pub CurrentDirectoryPath: _UNICODE_STRING32,
    pub CurrentDirectoryHandle: u32,
    pub DllPath: _UNICODE_STRING32,
    pub ImagePathName: _UNICODE_STRING32,
    pub CommandLine: _UNICODE_STRING32,
    pub Environment: u32,
}

/// `_RTL_USER_PROCESS_PARAMETERS64`, up to `Environment`.
#[expect(missing_docs)]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct _RTL_USER_PROCESS_PARAMETERS64 {
    pub MaximumLength: u32,
    pub Length: u32,
    pub Flags: u32,
    pub DebugFlags: u32,
    pub ConsoleHandle: u64,
    pub ConsoleFlags: u32,
    pub _Padding0: u32,
    pub StandardInput: u64,
    pub StandardOutput: u64,
    pub StandardError: u64,
    pub CurrentDirectoryPath: _UNICODE_STRING64,
    pub CurrentDirectoryHandle: u64,
    pub DllPath: _UNICODE_STRING64,
    pub ImagePathName: _UNICODE_STRING64,
    pub CommandLine: _UNICODE_STRING64,
    pub Environment: u64,
}

const _: () = {
    assert!(size_of::<_UNICODE_STRING32>() == 0x08);
    assert!(size_of::<_UNICODE_STRING64>() == 0x10);

    assert!(offset_of!(_PEB32, ProcessParameters) == 0x10);
    assert!(offset_of!(_PEB64, ProcessParameters) == 0x20);

    assert!(offset_of!(_RTL_USER_PROCESS_PARAMETERS32, CurrentDirectoryPath) == 0x24);
    assert!(offset_of!(_RTL_USER_PROCESS_PARAMETERS32, DllPath) == 0x30);
    assert!(offset_of!(_RTL_USER_PROCESS_PARAMETERS32, ImagePathName) == 0x38);
    assert!(offset_of!(_RTL_USER_PROCESS_PARAMETERS32, CommandLine) == 0x40);
    assert!(offset_of!(_RTL_USER_PROCESS_PARAMETERS32, Environment) == 0x48);

    assert!(offset_of!(_RTL_USER_PROCESS_PARAMETERS64, CurrentDirectoryPath) == 0x38);
    assert!(offset_of!(_RTL_USER_PROCESS_PARAMETERS64, DllPath) == 0x50);
    assert!(offset_of!(_RTL_USER_PROCESS_PARAMETERS64, ImagePathName) == 0x60);
    assert!(offset_of!(_RTL_USER_PROCESS_PARAMETERS64, CommandLine) == 0x70);
    assert!(offset_of!(_RTL_USER_PROCESS_PARAMETERS64, Environment) == 0x80);
};

/// A pointer-width specific description of the process control block.
pub(crate) trait ControlBlockLayout {
    /// The width this layout describes.
    const WIDTH: PointerWidth;

    /// The `_PEB` structure.
    type Peb: FromBytes + IntoBytes;

    /// The `_RTL_USER_PROCESS_PARAMETERS` structure.
    type Parameters: FromBytes + IntoBytes;

    /// Returns `_PEB.ProcessParameters`.
    fn process_parameters(peb: &Self::Peb) -> Va;

    /// Extracts the remote location of every field this crate reads.
    fn fields(parameters: &Self::Parameters) -> ProcessParameters;
}

/// The layout of a 32-bit process.
pub(crate) struct Layout32;

/// The layout of a 64-bit process.
pub(crate) struct Layout64;

impl ControlBlockLayout for Layout32 {
    const WIDTH: PointerWidth = PointerWidth::Bits32;

    type Peb = _PEB32;
    type Parameters = _RTL_USER_PROCESS_PARAMETERS32;

    fn process_parameters(peb: &Self::Peb) -> Va {
        Va(u64::from(peb.ProcessParameters))
    }

    fn fields(parameters: &Self::Parameters) -> ProcessParameters {
        ProcessParameters {
            command_line: RemoteRegion::from(parameters.CommandLine),
            current_directory: RemoteRegion::from(parameters.CurrentDirectoryPath),
            environment: Va(u64::from(parameters.Environment)),
        }
    }
}

impl ControlBlockLayout for Layout64 {
    const WIDTH: PointerWidth = PointerWidth::Bits64;

    type Peb = _PEB64;
    type Parameters = _RTL_USER_PROCESS_PARAMETERS64;

    fn process_parameters(peb: &Self::Peb) -> Va {
        Va(peb.ProcessParameters)
    }

    fn fields(parameters: &Self::Parameters) -> ProcessParameters {
        ProcessParameters {
            command_line: RemoteRegion::from(parameters.CommandLine),
            current_directory: RemoteRegion::from(parameters.CurrentDirectoryPath),
            environment: Va(parameters.Environment),
        }
    }
}

impl From<_UNICODE_STRING32> for RemoteRegion {
    fn from(value: _UNICODE_STRING32) -> Self {
        Self {
            va: Va(u64::from(value.Buffer)),
            len: u64::from(value.Length),
        }
    }
}

impl From<_UNICODE_STRING64> for RemoteRegion {
    fn from(value: _UNICODE_STRING64) -> Self {
        Self {
            va: Va(value.Buffer),
            len: u64::from(value.Length),
        }
    }
}
