use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Access rights requested when opening a process.
    ///
    /// The bit values are the native process access masks, so a driver can
    /// pass [`bits`] straight to the open call.
    ///
    /// [`bits`]: Self::bits
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ProcessAccess: u32 {
        /// Read memory of the process.
        const VM_READ = 0x0010;

        /// Query general information (exit code, basic information, WoW64 status).
        const QUERY_INFORMATION = 0x0400;

        /// Query the subset of information available to less privileged callers.
        const QUERY_LIMITED_INFORMATION = 0x1000;

        /// Wait on the process object.
        const SYNCHRONIZE = 0x0010_0000;

        /// Rights needed to walk the process control block.
        const QUERY_AND_READ = Self::QUERY_INFORMATION.bits() | Self::VM_READ.bits();
    }
}

impl std::fmt::Display for ProcessAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut result = [b'-'; 3];

        if self.contains(ProcessAccess::QUERY_INFORMATION) {
            result[0] = b'q';
        }
        else if self.contains(ProcessAccess::QUERY_LIMITED_INFORMATION) {
            result[0] = b'l';
        }
        if self.contains(ProcessAccess::VM_READ) {
            result[1] = b'r';
        }
        if self.contains(ProcessAccess::SYNCHRONIZE) {
            result[2] = b's';
        }

        // SAFETY: The `result` array is always valid UTF-8.
        f.write_str(unsafe { std::str::from_utf8_unchecked(&result) })
    }
}
