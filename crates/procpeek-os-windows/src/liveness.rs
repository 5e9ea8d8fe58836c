use procpeek_core::{Pid, ProcDriver, ProcError, ProcessAccess, ProcessHandle};

use crate::WindowsProcesses;

/// The exit code reported for a process that has not terminated.
pub const STILL_ACTIVE: u32 = 259;

/// Whether a process id names a live process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    /// The process exists.
    Running,

    /// No process with this id exists.
    NotRunning,
}

impl ProcessState {
    /// Checks whether the state is [`ProcessState::Running`].
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl From<bool> for ProcessState {
    fn from(value: bool) -> Self {
        if value { Self::Running } else { Self::NotRunning }
    }
}

impl<Driver> WindowsProcesses<Driver>
where
    Driver: ProcDriver,
{
    /// Determines whether `pid` names a live process.
    ///
    /// The idle placeholder (pid 0) is always running. Otherwise the process
    /// is opened and its exit code examined; where either step is ambiguous
    /// the process table is consulted.
    pub fn is_running(&self, pid: Pid) -> Result<ProcessState, ProcError> {
        if pid.is_idle() {
            return Ok(ProcessState::Running);
        }

        let access = ProcessAccess::QUERY_AND_READ;
        let raw = match self.driver.open_process(pid, access) {
            Ok(raw) => raw,
            Err(err) if err.is_invalid_parameter() => {
                self.corroborate(pid, false, "open reported no such process")?;
                return Ok(ProcessState::NotRunning);
            }
            Err(err) if err.is_access_denied() => {
                self.corroborate(pid, true, "open was denied")?;
                return Ok(ProcessState::Running);
            }
            Err(err) => return Err(ProcError::Syscall(err)),
        };

        let handle = ProcessHandle::new(&self.driver, raw, pid, access);
        let exit_code = self.driver.exit_code(handle.raw());
        drop(handle);

        match exit_code {
            Ok(STILL_ACTIVE) => {
                self.corroborate(pid, true, "exit code is STILL_ACTIVE")?;
                Ok(ProcessState::Running)
            }
            Ok(code) => {
                tracing::trace!(%pid, code, "process reported an exit code");
                Ok(ProcessState::from(self.is_listed(pid)?))
            }
            Err(err) if err.is_access_denied() => {
                self.corroborate(pid, true, "exit code query was denied")?;
                Ok(ProcessState::Running)
            }
            Err(err) => Err(ProcError::Syscall(err)),
        }
    }

    /// Opens `pid` with `access` and checks that the process is still alive.
    ///
    /// The idle placeholder can never be opened and is reported as
    /// [`ProcError::AccessDenied`].
    pub fn open_handle(
        &self,
        pid: Pid,
        access: ProcessAccess,
    ) -> Result<ProcessHandle<'_, Driver>, ProcError> {
        if pid.is_idle() {
            return Err(ProcError::access_denied("pid 0 can't be opened"));
        }

        match self.driver.open_process(pid, access) {
            Ok(raw) => self.check_handle(ProcessHandle::new(&self.driver, raw, pid, access)),
            Err(err) if err.is_invalid_parameter() => {
                if !self.is_listed(pid)? {
                    return Err(ProcError::NotFound(pid));
                }

                if self.assertions {
                    tracing::warn!(%pid, %err, "open rejected a listed process");
                    return Err(ProcError::InconsistentState(
                        "open reported no such process for a listed pid",
                    ));
                }

                Err(ProcError::Syscall(err))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Passes `handle` through if its process has not exited.
    ///
    /// A handle can outlive its process, so a successful open alone proves
    /// nothing.
    pub fn check_handle<'a>(
        &self,
        handle: ProcessHandle<'a, Driver>,
    ) -> Result<ProcessHandle<'a, Driver>, ProcError> {
        let pid = handle.pid();

        match self.driver.exit_code(handle.raw()) {
            Ok(STILL_ACTIVE) => {
                self.corroborate(pid, true, "exit code is STILL_ACTIVE")?;
                Ok(handle)
            }
            Ok(code) => {
                if self.is_listed(pid)? {
                    return Ok(handle);
                }

                tracing::debug!(%pid, code, "process has exited");
                Err(ProcError::NotFound(pid))
            }
            Err(err) => {
                drop(handle);
                self.corroborate(pid, false, "exit code query failed")?;
                Err(err.into())
            }
        }
    }

    /// Checks whether `pid` is in the process table.
    pub fn is_listed(&self, pid: Pid) -> Result<bool, ProcError> {
        Ok(self.pids()?.contains(&pid))
    }

    /// In assertion mode, checks that table membership agrees with a
    /// conclusion drawn from another probe.
    fn corroborate(&self, pid: Pid, expected: bool, probe: &'static str) -> Result<(), ProcError> {
        if !self.assertions {
            return Ok(());
        }

        let listed = self.is_listed(pid)?;
        if listed != expected {
            tracing::warn!(%pid, listed, probe, "liveness probes disagree");
            return Err(ProcError::InconsistentState(probe));
        }

        Ok(())
    }
}
