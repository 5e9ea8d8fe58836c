use crate::{MemoryRegion, OsError, Pid, PointerWidth, ProcessAccess, RawHandle, Va};

/// Outcome of a query that fills a caller-provided buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queried {
    /// The query succeeded and wrote this many bytes.
    Filled(usize),

    /// The query failed.
    ///
    /// `required` is the length the OS reported it needs; it is only
    /// meaningful when the error is a "buffer too small" status.
    Failed {
        /// The error the query failed with.
        error: OsError,

        /// The buffer length reported by the OS.
        required: usize,
    },
}

/// A trait for implementing a process-inspection driver.
///
/// Every method is one system call (or a fixed sequence the OS exposes as
/// one operation). Drivers translate native failures into [`OsError`] but
/// make no policy decisions: retries, fallbacks and liveness corroboration
/// are the caller's business.
pub trait ProcDriver {
    /// Returns the pointer width of the inspecting process.
    fn pointer_width(&self) -> PointerWidth;

    /// Opens a process by id with the requested access rights.
    fn open_process(&self, pid: Pid, access: ProcessAccess) -> Result<RawHandle, OsError>;

    /// Releases a handle previously returned by [`open_process`].
    ///
    /// [`open_process`]: Self::open_process
    fn close_handle(&self, handle: RawHandle);

    /// Retrieves the termination status of a process.
    fn exit_code(&self, handle: RawHandle) -> Result<u32, OsError>;

    /// Checks whether a process runs under the 32-on-64 compatibility
    /// layer.
    ///
    /// `None` queries the inspecting process itself.
    fn is_wow64(&self, handle: Option<RawHandle>) -> Result<bool, OsError>;

    /// Fills `buffer` with the ids of all live processes and returns the
    /// number of bytes written.
    ///
    /// A result equal to the buffer's byte size means the list may have
    /// been truncated; the OS gives no other signal.
    fn enum_processes(&self, buffer: &mut [u32]) -> Result<usize, OsError>;

    /// Fills `buffer` with the system process information records.
    fn query_system_processes(&self, buffer: &mut [u8]) -> Queried;

    /// Fills `buffer` with the command line the OS recorded when the
    /// process was created.
    ///
    /// The buffer starts with a native-width `UNICODE_STRING` header whose
    /// `Buffer` pointer points into `buffer` itself.
    fn query_command_line(&self, handle: RawHandle, buffer: &mut [u8]) -> Queried;

    /// Returns the address of the process environment block, using the
    /// inspector's native width.
    fn basic_information(&self, handle: RawHandle) -> Result<Va, OsError>;

    /// Returns the address of the 32-bit process environment block of a
    /// process running under the compatibility layer, or `None` if the
    /// process is native.
    fn wow64_information(&self, handle: RawHandle) -> Result<Option<Va>, OsError>;

    /// Returns the address of the 64-bit process environment block from a
    /// 32-bit inspector.
    fn basic_information64(&self, handle: RawHandle) -> Result<Va, OsError>;

    /// Reads `buffer.len()` bytes of the target's memory at `va`.
    fn read_memory(&self, handle: RawHandle, va: Va, buffer: &mut [u8]) -> Result<(), OsError>;

    /// Reads `buffer.len()` bytes of a 64-bit target's memory at `va` from
    /// a 32-bit inspector.
    fn read_memory64(&self, handle: RawHandle, va: Va, buffer: &mut [u8])
        -> Result<(), OsError>;

    /// Returns the memory region that contains `va`.
    fn query_region(&self, handle: RawHandle, va: Va) -> Result<MemoryRegion, OsError>;
}

impl<T> ProcDriver for &T
where
    T: ProcDriver + ?Sized,
{
    fn pointer_width(&self) -> PointerWidth {
        (**self).pointer_width()
    }

    fn open_process(&self, pid: Pid, access: ProcessAccess) -> Result<RawHandle, OsError> {
        (**self).open_process(pid, access)
    }

    fn close_handle(&self, handle: RawHandle) {
        (**self).close_handle(handle)
    }

    fn exit_code(&self, handle: RawHandle) -> Result<u32, OsError> {
        (**self).exit_code(handle)
    }

    fn is_wow64(&self, handle: Option<RawHandle>) -> Result<bool, OsError> {
        (**self).is_wow64(handle)
    }

    fn enum_processes(&self, buffer: &mut [u32]) -> Result<usize, OsError> {
        (**self).enum_processes(buffer)
    }

    fn query_system_processes(&self, buffer: &mut [u8]) -> Queried {
        (**self).query_system_processes(buffer)
    }

    fn query_command_line(&self, handle: RawHandle, buffer: &mut [u8]) -> Queried {
        (**self).query_command_line(handle, buffer)
    }

    fn basic_information(&self, handle: RawHandle) -> Result<Va, OsError> {
        (**self).basic_information(handle)
    }

    fn wow64_information(&self, handle: RawHandle) -> Result<Option<Va>, OsError> {
        (**self).wow64_information(handle)
    }

    fn basic_information64(&self, handle: RawHandle) -> Result<Va, OsError> {
        (**self).basic_information64(handle)
    }

    fn read_memory(&self, handle: RawHandle, va: Va, buffer: &mut [u8]) -> Result<(), OsError> {
        (**self).read_memory(handle, va, buffer)
    }

    fn read_memory64(
        &self,
        handle: RawHandle,
        va: Va,
        buffer: &mut [u8],
    ) -> Result<(), OsError> {
        (**self).read_memory64(handle, va, buffer)
    }

    fn query_region(&self, handle: RawHandle, va: Va) -> Result<MemoryRegion, OsError> {
        (**self).query_region(handle, va)
    }
}
