//! Core procpeek functionality.
//!
//! This crate holds the types shared by the inspection engine and its
//! drivers: process ids and remote addresses, access rights, the error
//! model, the [`ProcDriver`] trait through which every system call is
//! made, and the owning [`ProcessHandle`].
//!
//! It contains no OS-specific code. Algorithms live in
//! `procpeek-os-windows`, native bindings in `procpeek-driver-ntdll`.

mod buffer;
mod core;
mod driver;
mod error;
mod handle;
mod hint;

pub use self::{
    buffer::zeroed_buffer,
    core::{Hex, MemoryRegion, Pid, PointerWidth, ProcessAccess, RawHandle, Va},
    driver::{ProcDriver, Queried},
    error::{
        ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER, OsError, OsStatus, ProcError,
        STATUS_ACCESS_DENIED, STATUS_BUFFER_OVERFLOW, STATUS_BUFFER_TOO_SMALL,
        STATUS_INFO_LENGTH_MISMATCH, STATUS_INVALID_PARAMETER,
    },
    handle::ProcessHandle,
    hint::SnapshotSizeHint,
};
