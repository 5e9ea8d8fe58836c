use zerocopy::{FromBytes, IntoBytes};

use crate::{OsError, Pid, ProcDriver, ProcessAccess, RawHandle, Va};

/// An exclusively owned handle to a process.
///
/// The handle is released exactly once, when this value is dropped, on
/// every exit path of the code holding it.
pub struct ProcessHandle<'a, Driver>
where
    Driver: ProcDriver,
{
    /// The driver that granted the handle.
    driver: &'a Driver,

    /// The raw handle value.
    raw: RawHandle,

    /// The process the handle refers to.
    pid: Pid,

    /// The access rights the handle was opened with.
    access: ProcessAccess,
}

impl<'a, Driver> ProcessHandle<'a, Driver>
where
    Driver: ProcDriver,
{
    /// Takes ownership of a raw handle returned by
    /// [`ProcDriver::open_process`].
    pub fn new(driver: &'a Driver, raw: RawHandle, pid: Pid, access: ProcessAccess) -> Self {
        tracing::trace!(%pid, handle = ?raw, %access, "process handle opened");

        Self {
            driver,
            raw,
            pid,
            access,
        }
    }

    /// Returns the driver that granted the handle.
    pub fn driver(&self) -> &'a Driver {
        self.driver
    }

    /// Returns the raw handle value.
    ///
    /// The value must not outlive `self`.
    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Returns the process id the handle was opened for.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Returns the access rights the handle was opened with.
    pub fn access(&self) -> ProcessAccess {
        self.access
    }

    /// Reads memory of the target using the inspector's native primitive.
    pub fn read(&self, va: Va, buffer: &mut [u8]) -> Result<(), OsError> {
        self.driver.read_memory(self.raw, va, buffer)
    }

    /// Reads memory of a 64-bit target from a 32-bit inspector.
    pub fn read64(&self, va: Va, buffer: &mut [u8]) -> Result<(), OsError> {
        self.driver.read_memory64(self.raw, va, buffer)
    }

    /// Reads a structure from the target using the native primitive.
    pub fn read_struct<T>(&self, va: Va) -> Result<T, OsError>
    where
        T: FromBytes + IntoBytes,
    {
        let mut result = T::new_zeroed();
        self.read(va, result.as_mut_bytes())?;
        Ok(result)
    }

    /// Reads a structure from a 64-bit target from a 32-bit inspector.
    pub fn read_struct64<T>(&self, va: Va) -> Result<T, OsError>
    where
        T: FromBytes + IntoBytes,
    {
        let mut result = T::new_zeroed();
        self.read64(va, result.as_mut_bytes())?;
        Ok(result)
    }
}

impl<Driver> Drop for ProcessHandle<'_, Driver>
where
    Driver: ProcDriver,
{
    fn drop(&mut self) {
        tracing::trace!(pid = %self.pid, handle = ?self.raw, "process handle closed");
        self.driver.close_handle(self.raw);
    }
}

impl<Driver> std::fmt::Debug for ProcessHandle<'_, Driver>
where
    Driver: ProcDriver,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("raw", &self.raw)
            .field("access", &self.access)
            .finish()
    }
}
