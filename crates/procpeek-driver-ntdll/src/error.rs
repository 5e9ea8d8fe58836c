use procpeek_core::{OsError, STATUS_ACCESS_DENIED};

/// `ERROR_PARTIAL_COPY`.
const ERROR_PARTIAL_COPY: u32 = 299;

/// Error type for the ntdll driver.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A Win32 call failed with a last-error code.
    #[error("{call} failed: error {code}")]
    Win32 {
        /// The failed call.
        call: &'static str,

        /// The last-error code.
        code: u32,
    },

    /// An ntdll call returned a failure status.
    #[error("{call} failed: NTSTATUS {status:#010x}")]
    Nt {
        /// The failed call.
        call: &'static str,

        /// The returned status.
        status: u32,
    },

    /// A function needed for this inspector/target combination is not
    /// exported by `ntdll.dll`.
    #[error("{0} is not available")]
    Unavailable(&'static str),

    /// Fewer bytes were read than requested.
    #[error("{call} read {read} of {requested} bytes")]
    PartialRead {
        /// The failed call.
        call: &'static str,

        /// Bytes actually read.
        read: u64,

        /// Bytes requested.
        requested: u64,
    },

    /// An address does not fit the inspector's pointer width.
    #[error("address {0:#x} is not addressable from this process")]
    Unaddressable(u64),
}

impl Error {
    /// Captures the calling thread's last-error code.
    #[cfg(windows)]
    pub(crate) fn last_win32(call: &'static str) -> Self {
        // SAFETY: `GetLastError` has no preconditions.
        let code = unsafe { windows_sys::Win32::Foundation::GetLastError() };
        Self::Win32 { call, code }
    }

    /// Wraps a failed `NTSTATUS`.
    #[cfg_attr(not(windows), allow(dead_code))]
    pub(crate) fn nt(call: &'static str, status: i32) -> Self {
        Self::Nt {
            call,
            status: status as u32,
        }
    }
}

impl From<Error> for OsError {
    fn from(value: Error) -> Self {
        match value {
            Error::Win32 { call, code } => Self::win32(call, code),
            Error::Nt { call, status } => Self::nt(call, status),
            Error::Unavailable(call) => Self::nt(call, STATUS_ACCESS_DENIED),
            Error::PartialRead { call, .. } => Self::win32(call, ERROR_PARTIAL_COPY),
            Error::Unaddressable(_) => Self::win32("ReadProcessMemory", ERROR_PARTIAL_COPY),
        }
    }
}
