//! Run-time resolution of the WoW64 64-bit primitives.
//!
//! `NtWow64QueryInformationProcess64` and `NtWow64ReadVirtualMemory64` are
//! undocumented and only exported by the 32-bit `ntdll.dll` of a 64-bit
//! system, so they are looked up once and cached for the process lifetime.

use std::ffi::c_void;

use once_cell::sync::OnceCell;
use windows_sys::{
    Win32::{
        Foundation::{HANDLE, NTSTATUS},
        System::LibraryLoader::{GetModuleHandleA, GetProcAddress},
    },
    core::PCSTR,
};

use crate::Error;

type QueryInformationProcess64 = unsafe extern "system" fn(
    process: HANDLE,
    class: u32,
    information: *mut c_void,
    length: u32,
    return_length: *mut u32,
) -> NTSTATUS;

type ReadVirtualMemory64 = unsafe extern "system" fn(
    process: HANDLE,
    base: u64,
    buffer: *mut c_void,
    size: u64,
    read: *mut u64,
) -> NTSTATUS;

/// The resolved functions.
#[derive(Clone, Copy)]
pub(crate) struct Wow64Functions {
    pub query_information_process64: Option<QueryInformationProcess64>,
    pub read_virtual_memory64: Option<ReadVirtualMemory64>,
}

impl Wow64Functions {
    /// Returns the functions, resolving them on first use.
    pub fn get() -> &'static Self {
        static FUNCTIONS: OnceCell<Wow64Functions> = OnceCell::new();
        FUNCTIONS.get_or_init(Self::resolve)
    }

    pub fn query_information_process64(&self) -> Result<QueryInformationProcess64, Error> {
        self.query_information_process64
            .ok_or(Error::Unavailable("NtWow64QueryInformationProcess64"))
    }

    pub fn read_virtual_memory64(&self) -> Result<ReadVirtualMemory64, Error> {
        self.read_virtual_memory64
            .ok_or(Error::Unavailable("NtWow64ReadVirtualMemory64"))
    }

    fn resolve() -> Self {
        // SAFETY: The module name is a valid NUL-terminated string; ntdll is
        // mapped into every process and never unloaded.
        let ntdll = unsafe { GetModuleHandleA(c"ntdll.dll".as_ptr() as PCSTR) };
        if ntdll.is_null() {
            tracing::warn!("ntdll.dll is not loaded");
            return Self {
                query_information_process64: None,
                read_virtual_memory64: None,
            };
        }

        // SAFETY: Both names are valid NUL-terminated strings, and the
        // exported functions have the signatures declared above.
        let result = unsafe {
            Self {
                query_information_process64: GetProcAddress(
                    ntdll,
                    c"NtWow64QueryInformationProcess64".as_ptr() as PCSTR,
                )
                .map(|function| {
                    std::mem::transmute::<_, QueryInformationProcess64>(function)
                }),
                read_virtual_memory64: GetProcAddress(
                    ntdll,
                    c"NtWow64ReadVirtualMemory64".as_ptr() as PCSTR,
                )
                .map(|function| std::mem::transmute::<_, ReadVirtualMemory64>(function)),
            }
        };

        tracing::debug!(
            query = result.query_information_process64.is_some(),
            read = result.read_virtual_memory64.is_some(),
            "WoW64 primitives resolved"
        );

        result
    }
}
