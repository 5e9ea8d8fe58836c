//! procpeek driver for the native Windows process APIs.
//!
//! [`NtdllDriver`] implements [`ProcDriver`] with `kernel32`, `psapi` and
//! `ntdll` calls. The WoW64 64-bit primitives are resolved from `ntdll.dll`
//! at run time; where they are missing, the calls that need them fail with
//! an access-denied status.
//!
//! On other platforms only the error type is available.
//!
//! [`ProcDriver`]: procpeek_core::ProcDriver

mod error;
pub use self::error::Error;

#[cfg(windows)]
mod driver;
#[cfg(windows)]
mod wow64;

#[cfg(windows)]
pub use self::windows::NtdllDriver;

#[cfg(windows)]
mod windows {
    use procpeek_core::{
        MemoryRegion, OsError, Pid, PointerWidth, ProcDriver, ProcessAccess, Queried, RawHandle,
        Va,
    };

    use crate::driver::Ntdll;

    /// Driver for the live Windows process table.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NtdllDriver {
        _private: (),
    }

    impl NtdllDriver {
        /// Creates a new driver.
        pub fn new() -> Self {
            tracing::trace!(width = %PointerWidth::native(), "ntdll driver created");
            Self { _private: () }
        }
    }

    impl ProcDriver for NtdllDriver {
        fn pointer_width(&self) -> PointerWidth {
            PointerWidth::native()
        }

        fn open_process(&self, pid: Pid, access: ProcessAccess) -> Result<RawHandle, OsError> {
            Ok(Ntdll.open_process(pid, access)?)
        }

        fn close_handle(&self, handle: RawHandle) {
            Ntdll.close_handle(handle)
        }

        fn exit_code(&self, handle: RawHandle) -> Result<u32, OsError> {
            Ok(Ntdll.exit_code(handle)?)
        }

        fn is_wow64(&self, handle: Option<RawHandle>) -> Result<bool, OsError> {
            Ok(Ntdll.is_wow64(handle)?)
        }

        fn enum_processes(&self, buffer: &mut [u32]) -> Result<usize, OsError> {
            Ok(Ntdll.enum_processes(buffer)?)
        }

        fn query_system_processes(&self, buffer: &mut [u8]) -> Queried {
            Ntdll.query_system_processes(buffer)
        }

        fn query_command_line(&self, handle: RawHandle, buffer: &mut [u8]) -> Queried {
            Ntdll.query_command_line(handle, buffer)
        }

        fn basic_information(&self, handle: RawHandle) -> Result<Va, OsError> {
            Ok(Ntdll.basic_information(handle)?)
        }

        fn wow64_information(&self, handle: RawHandle) -> Result<Option<Va>, OsError> {
            Ok(Ntdll.wow64_information(handle)?)
        }

        fn basic_information64(&self, handle: RawHandle) -> Result<Va, OsError> {
            Ok(Ntdll.basic_information64(handle)?)
        }

        fn read_memory(
            &self,
            handle: RawHandle,
            va: Va,
            buffer: &mut [u8],
        ) -> Result<(), OsError> {
            Ok(Ntdll.read_memory(handle, va, buffer)?)
        }

        fn read_memory64(
            &self,
            handle: RawHandle,
            va: Va,
            buffer: &mut [u8],
        ) -> Result<(), OsError> {
            Ok(Ntdll.read_memory64(handle, va, buffer)?)
        }

        fn query_region(&self, handle: RawHandle, va: Va) -> Result<MemoryRegion, OsError> {
            Ok(Ntdll.query_region(handle, va)?)
        }
    }
}
