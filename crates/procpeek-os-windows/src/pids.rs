use procpeek_core::{Pid, ProcDriver, ProcError};

use crate::WindowsProcesses;

/// How many entries the pid buffer grows by on each attempt.
pub const PID_BUFFER_INCREMENT: usize = 1024;

impl<Driver> WindowsProcesses<Driver>
where
    Driver: ProcDriver,
{
    /// Returns the ids of all live processes, in enumeration order.
    ///
    /// The OS signals a truncated list only by filling the buffer exactly,
    /// so the buffer grows until the result is strictly shorter than it.
    pub fn pids(&self) -> Result<Vec<Pid>, ProcError> {
        let mut capacity = 0;

        loop {
            capacity += PID_BUFFER_INCREMENT;
            let size = capacity * size_of::<u32>();

            let mut buffer = Vec::new();
            buffer
                .try_reserve_exact(capacity)
                .map_err(|_| ProcError::OutOfMemory {
                    requested: size as u64,
                })?;
            buffer.resize(capacity, 0u32);

            let written = self.driver.enum_processes(&mut buffer)?;
            if written > size {
                return Err(ProcError::Corrupted("process list larger than its buffer"));
            }

            if written < size {
                let count = written / size_of::<u32>();
                tracing::debug!(count, capacity, "processes enumerated");

                buffer.truncate(count);
                return Ok(buffer.into_iter().map(Pid).collect());
            }

            tracing::trace!(capacity, "process list filled the buffer, growing");
        }
    }
}
