use procpeek_core::{Pid, ProcDriver, ProcError, ProcessAccess, zeroed_buffer};

use crate::{
    WindowsProcesses,
    peb::{ControlBlock, ProcessDataKind, RemoteRegion},
};

/// Bytes copied out of a target's address space.
///
/// The backing storage is two bytes longer than the copied data and the
/// excess is zeroed, so the contents always end in a UTF-16 NUL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBuffer {
    bytes: Vec<u8>,
    len: usize,
}

impl RemoteBuffer {
    /// Returns the copied bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Returns the copied bytes followed by the zeroed terminator.
    pub fn as_terminated_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the number of copied bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether nothing was copied.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consumes the buffer, returning the copied bytes.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.bytes.truncate(self.len);
        self.bytes
    }
}

impl<Driver> WindowsProcesses<Driver>
where
    Driver: ProcDriver,
{
    /// Copies one field of a process's parameters into local memory.
    ///
    /// The handle is opened, the control block layout is chosen once, and
    /// the handle is released before returning on every path.
    pub fn read_process_data(
        &self,
        pid: Pid,
        kind: ProcessDataKind,
    ) -> Result<RemoteBuffer, ProcError> {
        let handle = self.open_handle(pid, ProcessAccess::QUERY_AND_READ)?;
        let block = ControlBlock::locate(&handle)?;
        let parameters = block.parameters(&handle)?;

        let region = match kind {
            ProcessDataKind::CommandLine => parameters.command_line,
            ProcessDataKind::CurrentDirectory => parameters.current_directory,
            ProcessDataKind::Environment => RemoteRegion {
                va: parameters.environment,
                len: block.extent(&handle, parameters.environment)?,
            },
        };

        let total = region
            .len
            .checked_add(2)
            .ok_or(ProcError::OutOfMemory {
                requested: region.len,
            })?;

        let mut bytes = zeroed_buffer(total)?;
        let len = bytes.len() - 2;

        if len > 0 {
            block.read(&handle, region.va, &mut bytes[..len])?;
        }

        tracing::trace!(
            %pid,
            %kind,
            bitness = %block.bitness(),
            va = %region.va,
            len,
            "process data copied"
        );

        Ok(RemoteBuffer { bytes, len })
    }
}
