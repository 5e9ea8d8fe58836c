use std::borrow::Cow;

use crate::{Hex, Pid};

/// `ERROR_ACCESS_DENIED`.
pub const ERROR_ACCESS_DENIED: u32 = 5;

/// `ERROR_INVALID_PARAMETER`.
///
/// Returned by `OpenProcess` for an id that names no process.
pub const ERROR_INVALID_PARAMETER: u32 = 87;

/// `STATUS_BUFFER_OVERFLOW`.
pub const STATUS_BUFFER_OVERFLOW: u32 = 0x8000_0005;

/// `STATUS_INFO_LENGTH_MISMATCH`.
pub const STATUS_INFO_LENGTH_MISMATCH: u32 = 0xC000_0004;

/// `STATUS_INVALID_PARAMETER`.
pub const STATUS_INVALID_PARAMETER: u32 = 0xC000_000D;

/// `STATUS_ACCESS_DENIED`.
pub const STATUS_ACCESS_DENIED: u32 = 0xC000_0022;

/// `STATUS_BUFFER_TOO_SMALL`.
pub const STATUS_BUFFER_TOO_SMALL: u32 = 0xC000_0023;

/// A native status code reported by a failed system call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsStatus {
    /// A Win32 last-error code.
    Win32(u32),

    /// An `NTSTATUS` value.
    Nt(u32),
}

impl OsStatus {
    /// The raw numeric code.
    pub fn code(self) -> u32 {
        match self {
            Self::Win32(code) | Self::Nt(code) => code,
        }
    }
}

impl std::fmt::Display for OsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Win32(code) => write!(f, "error {code}"),
            Self::Nt(status) => write!(f, "NTSTATUS {}", Hex(*status)),
        }
    }
}

/// A failed system call, as reported by a [`ProcDriver`].
///
/// [`ProcDriver`]: crate::ProcDriver
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{call} failed: {status}")]
pub struct OsError {
    /// The name of the failed call.
    pub call: &'static str,

    /// The status the call failed with.
    pub status: OsStatus,
}

impl OsError {
    /// Creates an error from a Win32 last-error code.
    pub const fn win32(call: &'static str, code: u32) -> Self {
        Self {
            call,
            status: OsStatus::Win32(code),
        }
    }

    /// Creates an error from an `NTSTATUS`.
    pub const fn nt(call: &'static str, status: u32) -> Self {
        Self {
            call,
            status: OsStatus::Nt(status),
        }
    }

    /// Checks whether the call was refused for lack of privilege.
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self.status,
            OsStatus::Win32(ERROR_ACCESS_DENIED) | OsStatus::Nt(STATUS_ACCESS_DENIED)
        )
    }

    /// Checks whether the call rejected its arguments.
    ///
    /// For `OpenProcess` this is how "no such process" is reported.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self.status,
            OsStatus::Win32(ERROR_INVALID_PARAMETER) | OsStatus::Nt(STATUS_INVALID_PARAMETER)
        )
    }

    /// Checks whether the call failed only because the output buffer was
    /// too small.
    pub fn is_buffer_too_small(&self) -> bool {
        matches!(
            self.status,
            OsStatus::Nt(
                STATUS_INFO_LENGTH_MISMATCH | STATUS_BUFFER_TOO_SMALL | STATUS_BUFFER_OVERFLOW
            )
        )
    }
}

/// An error that can occur while inspecting a process.
#[derive(thiserror::Error, Debug)]
pub enum ProcError {
    /// The process does not currently exist.
    #[error("no such process (pid {0})")]
    NotFound(Pid),

    /// Insufficient privilege, or an unsupported bitness combination.
    #[error("access denied: {0}")]
    AccessDenied(Cow<'static, str>),

    /// Any other OS-reported failure, with the original code.
    #[error(transparent)]
    Syscall(OsError),

    /// A local allocation could not be satisfied.
    #[error("out of memory ({requested} bytes requested)")]
    OutOfMemory {
        /// The number of bytes that could not be allocated.
        requested: u64,
    },

    /// Two liveness probes disagreed (assertion mode only).
    #[error("inconsistent state: {0}")]
    InconsistentState(&'static str),

    /// A structure returned by the OS is self-inconsistent.
    #[error("corrupted structure: {0}")]
    Corrupted(&'static str),
}

impl ProcError {
    /// Creates an access-denied error with a static reason.
    pub const fn access_denied(reason: &'static str) -> Self {
        Self::AccessDenied(Cow::Borrowed(reason))
    }

    /// Returns the native status code, if this error carries one.
    pub fn os_status(&self) -> Option<OsStatus> {
        match self {
            Self::Syscall(error) => Some(error.status),
            _ => None,
        }
    }
}

impl From<OsError> for ProcError {
    fn from(value: OsError) -> Self {
        if value.is_access_denied() {
            Self::AccessDenied(Cow::Owned(value.to_string()))
        }
        else {
            Self::Syscall(value)
        }
    }
}
