//! # Windows process inspection
//!
//! This crate implements the process-inspection algorithms on top of a
//! [`ProcDriver`]: liveness resolution, process enumeration, the system
//! process snapshot, and copying command line, working directory and
//! environment out of a target's process parameters, including targets
//! whose pointer width differs from the inspector's.
//!
//! Everything here is generic over the driver, so the algorithms are
//! platform independent; the native binding lives in
//! `procpeek-driver-ntdll`.
//!
//! ## Example
//!
//! ```no_run
//! # use procpeek_core::{Pid, ProcDriver};
//! # use procpeek_os_windows::WindowsProcesses;
//! #
//! # fn example<Driver: ProcDriver>(driver: Driver) -> Result<(), Box<dyn std::error::Error>> {
//! let processes = WindowsProcesses::new(driver);
//!
//! for pid in processes.pids()? {
//!     match processes.arguments(pid) {
//!         Ok(arguments) => println!("{pid}: {arguments:?}"),
//!         Err(err) => println!("{pid}: {err}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use procpeek_core::{Pid, ProcDriver, ProcError, SnapshotSizeHint};

mod cmdline;
mod liveness;
mod peb;
mod pids;
mod remote;
mod snapshot;
mod text;

pub use self::{
    cmdline::{CommandLineSource, LiveCommandLine, RecordedCommandLine, split_command_line},
    liveness::{ProcessState, STILL_ACTIVE},
    peb::{
        _PEB32, _PEB64, _RTL_USER_PROCESS_PARAMETERS32, _RTL_USER_PROCESS_PARAMETERS64,
        _UNICODE_STRING32, _UNICODE_STRING64, Bitness, ControlBlock, ProcessDataKind,
        ProcessParameters, RemoteRegion,
    },
    pids::PID_BUFFER_INCREMENT,
    remote::RemoteBuffer,
    snapshot::{
        _SYSTEM_PROCESS_INFORMATION32, _SYSTEM_PROCESS_INFORMATION64, ProcessSnapshot,
        ProcessSnapshotEntries, ProcessSnapshotEntry,
    },
};

/// The environment variable that enables assertion mode by default.
pub const TESTING_ENV: &str = "PROCPEEK_TESTING";

/// Windows process inspector.
///
/// All operations are synchronous and hold no state between calls apart
/// from the shared snapshot size hint. Every handle opened by an operation
/// is closed before the operation returns.
pub struct WindowsProcesses<Driver>
where
    Driver: ProcDriver,
{
    driver: Driver,
    size_hint: Arc<SnapshotSizeHint>,
    assertions: bool,
    live_command_line: bool,
}

impl<Driver> WindowsProcesses<Driver>
where
    Driver: ProcDriver,
{
    /// Creates a new inspector.
    ///
    /// Assertion mode is enabled if the `PROCPEEK_TESTING` environment
    /// variable is set to a non-empty value.
    pub fn new(driver: Driver) -> Self {
        let assertions = std::env::var_os(TESTING_ENV).is_some_and(|value| !value.is_empty());
        if assertions {
            tracing::debug!("assertion mode enabled");
        }

        Self {
            driver,
            size_hint: SnapshotSizeHint::shared(),
            assertions,
            live_command_line: true,
        }
    }

    /// Enables or disables assertion mode.
    ///
    /// In assertion mode every liveness conclusion is cross-checked against
    /// the process table, and a disagreement is reported as
    /// [`ProcError::InconsistentState`].
    pub fn with_assertions(self, assertions: bool) -> Self {
        Self { assertions, ..self }
    }

    /// Replaces the snapshot size hint.
    pub fn with_size_hint(self, size_hint: Arc<SnapshotSizeHint>) -> Self {
        Self { size_hint, ..self }
    }

    /// Selects the command line [`arguments`] reads: the live one from the
    /// process parameters (`true`, the default), or the one recorded at
    /// creation (`false`).
    ///
    /// [`arguments`]: Self::arguments
    pub fn with_live_command_line(self, live_command_line: bool) -> Self {
        Self {
            live_command_line,
            ..self
        }
    }

    /// Returns the driver.
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Returns the snapshot size hint.
    pub fn size_hint(&self) -> &Arc<SnapshotSizeHint> {
        &self.size_hint
    }

    /// Checks whether assertion mode is enabled.
    pub fn assertions(&self) -> bool {
        self.assertions
    }

    /// Returns the raw command line of `pid` from `source`.
    pub fn raw_command_line(
        &self,
        pid: Pid,
        source: &impl CommandLineSource,
    ) -> Result<String, ProcError> {
        source.raw_command_line(self, pid)
    }

    /// Returns the arguments of `pid`.
    ///
    /// With `use_live_block` the command line is read from the process
    /// parameters, otherwise the one recorded at creation is used.
    pub fn command_line(&self, pid: Pid, use_live_block: bool) -> Result<Vec<String>, ProcError> {
        let line = if use_live_block {
            self.raw_command_line(pid, &LiveCommandLine)?
        }
        else {
            self.raw_command_line(pid, &RecordedCommandLine)?
        };

        Ok(split_command_line(&line))
    }

    /// Returns the arguments of `pid` from the configured source.
    pub fn arguments(&self, pid: Pid) -> Result<Vec<String>, ProcError> {
        self.command_line(pid, self.live_command_line)
    }

    /// Returns the current working directory of `pid`.
    pub fn current_directory(&self, pid: Pid) -> Result<String, ProcError> {
        let data = self.read_process_data(pid, ProcessDataKind::CurrentDirectory)?;
        Ok(text::decode_string(data.as_bytes()))
    }

    /// Returns the environment block of `pid`.
    ///
    /// The result is the decoded block: `KEY=VALUE` entries, each followed
    /// by a NUL.
    pub fn environment(&self, pid: Pid) -> Result<String, ProcError> {
        let data = self.read_process_data(pid, ProcessDataKind::Environment)?;
        Ok(text::decode_environment(data.as_bytes()))
    }
}

impl<Driver> std::fmt::Debug for WindowsProcesses<Driver>
where
    Driver: ProcDriver,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowsProcesses")
            .field("width", &self.driver.pointer_width())
            .field("size_hint", &self.size_hint.get())
            .field("assertions", &self.assertions)
            .field("live_command_line", &self.live_command_line)
            .finish()
    }
}

#[cfg(test)]
mod tests;
