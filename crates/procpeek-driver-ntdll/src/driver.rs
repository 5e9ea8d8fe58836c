#![allow(non_snake_case)]

use std::ffi::c_void;

use procpeek_core::{MemoryRegion, Pid, ProcessAccess, Queried, RawHandle, Va};
use windows_sys::{
    Wdk::System::{
        SystemInformation::{NtQuerySystemInformation, SYSTEM_INFORMATION_CLASS},
        Threading::{NtQueryInformationProcess, PROCESSINFOCLASS},
    },
    Win32::{
        Foundation::{CloseHandle, FALSE, HANDLE},
        System::{
            Diagnostics::Debug::ReadProcessMemory,
            Memory::{MEMORY_BASIC_INFORMATION, VirtualQueryEx},
            ProcessStatus::EnumProcesses,
            Threading::{GetCurrentProcess, GetExitCodeProcess, IsWow64Process, OpenProcess},
        },
    },
};
use zerocopy::{FromBytes, FromZeros as _, Immutable, IntoBytes, KnownLayout};

use crate::{Error, wow64::Wow64Functions};

const PROCESS_BASIC_INFORMATION_CLASS: PROCESSINFOCLASS = 0;
const PROCESS_WOW64_INFORMATION_CLASS: PROCESSINFOCLASS = 26;
const PROCESS_COMMAND_LINE_INFORMATION_CLASS: PROCESSINFOCLASS = 60;
const SYSTEM_PROCESS_INFORMATION_CLASS: SYSTEM_INFORMATION_CLASS = 5;

/// `PROCESS_BASIC_INFORMATION` with native-width fields.
#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
struct ProcessBasicInformation {
    ExitStatus: i32,
    #[cfg(target_pointer_width = "64")]
    _Padding0: u32,
    PebBaseAddress: usize,
    AffinityMask: usize,
    BasePriority: i32,
    #[cfg(target_pointer_width = "64")]
    _Padding1: u32,
    UniqueProcessId: usize,
    InheritedFromUniqueProcessId: usize,
}

/// `PROCESS_BASIC_INFORMATION` of a 64-bit process, as returned by
/// `NtWow64QueryInformationProcess64`.
#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
struct ProcessBasicInformation64 {
    ExitStatus: i32,
    _Padding0: u32,
    PebBaseAddress: u64,
    AffinityMask: u64,
    BasePriority: i32,
    _Padding1: u32,
    UniqueProcessId: u64,
    InheritedFromUniqueProcessId: u64,
}

fn handle(raw: RawHandle) -> HANDLE {
    raw.0 as HANDLE
}

fn buffer_length(buffer: &[u8]) -> u32 {
    u32::try_from(buffer.len()).unwrap_or(u32::MAX)
}

/// The native system-call layer.
pub(crate) struct Ntdll;

impl Ntdll {
    pub fn open_process(&self, pid: Pid, access: ProcessAccess) -> Result<RawHandle, Error> {
        // SAFETY: `OpenProcess` has no pointer arguments.
        let result = unsafe { OpenProcess(access.bits(), FALSE, pid.0) };
        if result.is_null() {
            return Err(Error::last_win32("OpenProcess"));
        }

        Ok(RawHandle(result as usize))
    }

    pub fn close_handle(&self, raw: RawHandle) {
        // SAFETY: The handle was returned by `OpenProcess` and is closed once.
        if unsafe { CloseHandle(handle(raw)) } == FALSE {
            let err = Error::last_win32("CloseHandle");
            tracing::warn!(handle = ?raw, %err, "failed to close handle");
        }
    }

    pub fn exit_code(&self, raw: RawHandle) -> Result<u32, Error> {
        let mut code = 0;

        // SAFETY: `code` is a valid out-pointer.
        if unsafe { GetExitCodeProcess(handle(raw), &mut code) } == FALSE {
            return Err(Error::last_win32("GetExitCodeProcess"));
        }

        Ok(code)
    }

    pub fn is_wow64(&self, raw: Option<RawHandle>) -> Result<bool, Error> {
        let process = match raw {
            Some(raw) => handle(raw),
            // SAFETY: Returns a pseudo-handle that needs no closing.
            None => unsafe { GetCurrentProcess() },
        };

        let mut result = FALSE;

        // SAFETY: `result` is a valid out-pointer.
        if unsafe { IsWow64Process(process, &mut result) } == FALSE {
            return Err(Error::last_win32("IsWow64Process"));
        }

        Ok(result != FALSE)
    }

    pub fn enum_processes(&self, buffer: &mut [u32]) -> Result<usize, Error> {
        let size = u32::try_from(std::mem::size_of_val(buffer)).unwrap_or(u32::MAX);
        let mut written = 0;

        // SAFETY: `buffer` is valid for `size` bytes.
        if unsafe { EnumProcesses(buffer.as_mut_ptr(), size, &mut written) } == FALSE {
            return Err(Error::last_win32("EnumProcesses"));
        }

        Ok(written as usize)
    }

    pub fn query_system_processes(&self, buffer: &mut [u8]) -> Queried {
        let mut required = 0;

        // SAFETY: `buffer` is valid for its length.
        let status = unsafe {
            NtQuerySystemInformation(
                SYSTEM_PROCESS_INFORMATION_CLASS,
                buffer.as_mut_ptr().cast(),
                buffer_length(buffer),
                &mut required,
            )
        };

        queried("NtQuerySystemInformation", status, required)
    }

    pub fn query_command_line(&self, raw: RawHandle, buffer: &mut [u8]) -> Queried {
        let mut required = 0;

        // SAFETY: `buffer` is valid for its length.
        let status = unsafe {
            NtQueryInformationProcess(
                handle(raw),
                PROCESS_COMMAND_LINE_INFORMATION_CLASS,
                buffer.as_mut_ptr().cast(),
                buffer_length(buffer),
                &mut required,
            )
        };

        queried("NtQueryInformationProcess", status, required)
    }

    pub fn basic_information(&self, raw: RawHandle) -> Result<Va, Error> {
        let mut information = ProcessBasicInformation::new_zeroed();
        self.query_information(
            raw,
            PROCESS_BASIC_INFORMATION_CLASS,
            information.as_mut_bytes(),
        )?;

        Ok(Va(information.PebBaseAddress as u64))
    }

    pub fn wow64_information(&self, raw: RawHandle) -> Result<Option<Va>, Error> {
        let mut peb32 = 0usize;
        self.query_information(
            raw,
            PROCESS_WOW64_INFORMATION_CLASS,
            peb32.as_mut_bytes(),
        )?;

        Ok((peb32 != 0).then_some(Va(peb32 as u64)))
    }

    pub fn basic_information64(&self, raw: RawHandle) -> Result<Va, Error> {
        let query = Wow64Functions::get().query_information_process64()?;

        let mut information = ProcessBasicInformation64::new_zeroed();
        let buffer = information.as_mut_bytes();
        let mut returned = 0;

        // SAFETY: `buffer` is valid for its length; `query` was resolved
        // from ntdll with this signature.
        let status = unsafe {
            query(
                handle(raw),
                PROCESS_BASIC_INFORMATION_CLASS as u32,
                buffer.as_mut_ptr().cast(),
                buffer_length(buffer),
                &mut returned,
            )
        };

        if status < 0 {
            return Err(Error::nt("NtWow64QueryInformationProcess64", status));
        }

        Ok(Va(information.PebBaseAddress))
    }

    pub fn read_memory(&self, raw: RawHandle, va: Va, buffer: &mut [u8]) -> Result<(), Error> {
        let address = usize::try_from(va.0).map_err(|_| Error::Unaddressable(va.0))?;
        let mut read = 0;

        // SAFETY: `buffer` is valid for its length; the remote address is
        // only interpreted by the kernel.
        let success = unsafe {
            ReadProcessMemory(
                handle(raw),
                address as *const c_void,
                buffer.as_mut_ptr().cast(),
                buffer.len(),
                &mut read,
            )
        };

        if success == FALSE {
            return Err(Error::last_win32("ReadProcessMemory"));
        }

        if read != buffer.len() {
            return Err(Error::PartialRead {
                call: "ReadProcessMemory",
                read: read as u64,
                requested: buffer.len() as u64,
            });
        }

        Ok(())
    }

    pub fn read_memory64(&self, raw: RawHandle, va: Va, buffer: &mut [u8]) -> Result<(), Error> {
        let read_memory = Wow64Functions::get().read_virtual_memory64()?;
        let mut read = 0;

        // SAFETY: `buffer` is valid for its length; `read_memory` was
        // resolved from ntdll with this signature.
        let status = unsafe {
            read_memory(
                handle(raw),
                va.0,
                buffer.as_mut_ptr().cast(),
                buffer.len() as u64,
                &mut read,
            )
        };

        if status < 0 {
            return Err(Error::nt("NtWow64ReadVirtualMemory64", status));
        }

        if read != buffer.len() as u64 {
            return Err(Error::PartialRead {
                call: "NtWow64ReadVirtualMemory64",
                read,
                requested: buffer.len() as u64,
            });
        }

        Ok(())
    }

    pub fn query_region(&self, raw: RawHandle, va: Va) -> Result<MemoryRegion, Error> {
        let address = usize::try_from(va.0).map_err(|_| Error::Unaddressable(va.0))?;

        // SAFETY: All-zero is a valid `MEMORY_BASIC_INFORMATION`.
        let mut information: MEMORY_BASIC_INFORMATION = unsafe { std::mem::zeroed() };

        // SAFETY: `information` is valid for its size.
        let written = unsafe {
            VirtualQueryEx(
                handle(raw),
                address as *const c_void,
                &mut information,
                size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };

        if written == 0 {
            return Err(Error::last_win32("VirtualQueryEx"));
        }

        Ok(MemoryRegion {
            base: Va(information.BaseAddress as u64),
            size: information.RegionSize as u64,
        })
    }

    fn query_information(
        &self,
        raw: RawHandle,
        class: PROCESSINFOCLASS,
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        let mut returned = 0;

        // SAFETY: `buffer` is valid for its length.
        let status = unsafe {
            NtQueryInformationProcess(
                handle(raw),
                class,
                buffer.as_mut_ptr().cast(),
                buffer_length(buffer),
                &mut returned,
            )
        };

        if status < 0 {
            return Err(Error::nt("NtQueryInformationProcess", status));
        }

        Ok(())
    }
}

fn queried(call: &'static str, status: i32, required: u32) -> Queried {
    if status < 0 {
        return Queried::Failed {
            error: Error::nt(call, status).into(),
            required: required as usize,
        };
    }

    Queried::Filled(required as usize)
}
