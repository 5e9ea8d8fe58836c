//! # procpeek
//!
//! Reads per-process metadata from the live process table: liveness, the
//! process id list, command line, current working directory and
//! environment block. Targets with a different pointer width than the
//! inspecting process (WoW64 in either direction) are handled
//! transparently.
//!
//! The workspace is split the same way on every layer:
//!
//! - [`procpeek_core`] (re-exported at the crate root) holds the shared
//!   types, the error model and the [`ProcDriver`] trait.
//! - [`os::windows`] holds the algorithms, generic over the driver.
//! - [`driver::ntdll`] is the native binding.
//!
//! With the default features on Windows, the free functions of this crate
//! operate on a process-wide [`WindowsProcesses`] bound to the native
//! driver:
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> Result<(), procpeek::ProcError> {
//! use procpeek::Pid;
//!
//! let pid = Pid(std::process::id());
//! assert!(procpeek::is_running(pid)?.is_running());
//!
//! println!("{:?}", procpeek::command_line(pid, true)?);
//! println!("{}", procpeek::current_directory(pid)?);
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! [`WindowsProcesses`]: os::windows::WindowsProcesses

pub use procpeek_core::*;

/// Process-inspection algorithms, per operating system.
pub mod os {
    #[cfg(feature = "os-windows")]
    pub use procpeek_os_windows as windows;
}

/// System-call drivers.
pub mod driver {
    #[cfg(feature = "driver-ntdll")]
    pub use procpeek_driver_ntdll as ntdll;
}

#[cfg(all(windows, feature = "driver-ntdll", feature = "os-windows"))]
mod native;

#[cfg(all(windows, feature = "driver-ntdll", feature = "os-windows"))]
pub use self::native::{
    command_line, current_directory, environment, is_running, list_pids, open_handle, processes,
};
