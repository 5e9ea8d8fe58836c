use once_cell::sync::Lazy;
use procpeek_core::{Pid, ProcError, ProcessAccess, ProcessHandle};
use procpeek_driver_ntdll::NtdllDriver;
use procpeek_os_windows::{ProcessState, WindowsProcesses};

static PROCESSES: Lazy<WindowsProcesses<NtdllDriver>> = Lazy::new(|| {
    let processes = WindowsProcesses::new(NtdllDriver::new());
    tracing::debug!(?processes, "native inspector initialized");
    processes
});

/// Returns the process-wide inspector bound to the native driver.
///
/// The snapshot size hint it carries is shared by every call made through
/// this crate's free functions.
pub fn processes() -> &'static WindowsProcesses<NtdllDriver> {
    &PROCESSES
}

/// Determines whether `pid` names a live process.
pub fn is_running(pid: Pid) -> Result<ProcessState, ProcError> {
    PROCESSES.is_running(pid)
}

/// Returns the ids of all processes in the process table.
pub fn list_pids() -> Result<Vec<Pid>, ProcError> {
    PROCESSES.pids()
}

/// Returns the arguments of `pid`.
///
/// With `use_live_block` the command line is read from the target's
/// process parameters, otherwise the one recorded at process creation is
/// used.
pub fn command_line(pid: Pid, use_live_block: bool) -> Result<Vec<String>, ProcError> {
    PROCESSES.command_line(pid, use_live_block)
}

/// Returns the current working directory of `pid`.
pub fn current_directory(pid: Pid) -> Result<String, ProcError> {
    PROCESSES.current_directory(pid)
}

/// Returns the environment block of `pid`.
pub fn environment(pid: Pid) -> Result<String, ProcError> {
    PROCESSES.environment(pid)
}

/// Opens `pid` with `access`, failing with [`ProcError::NotFound`] if the
/// process has already exited.
pub fn open_handle(
    pid: Pid,
    access: ProcessAccess,
) -> Result<ProcessHandle<'static, NtdllDriver>, ProcError> {
    PROCESSES.open_handle(pid, access)
}
