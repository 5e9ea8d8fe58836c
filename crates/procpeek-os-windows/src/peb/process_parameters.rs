use procpeek_core::Va;

/// A remote string location: where it starts and how many bytes it spans.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RemoteRegion {
    /// Address of the first byte in the target.
    pub va: Va,

    /// Length in bytes.
    pub len: u64,
}

/// The fields of `_RTL_USER_PROCESS_PARAMETERS` this crate reads,
/// normalized to 64-bit addresses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessParameters {
    /// `CommandLine`.
    pub command_line: RemoteRegion,

    /// `CurrentDirectory.DosPath`.
    pub current_directory: RemoteRegion,

    /// `Environment`.
    ///
    /// The block carries no length; its extent is bounded by the memory
    /// region that contains it.
    pub environment: Va,
}

/// Which field of the process parameters to copy out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessDataKind {
    /// The command line.
    CommandLine,

    /// The current working directory.
    CurrentDirectory,

    /// The environment block.
    Environment,
}

impl std::fmt::Display for ProcessDataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::CommandLine => f.write_str("cmdline"),
            Self::CurrentDirectory => f.write_str("cwd"),
            Self::Environment => f.write_str("environ"),
        }
    }
}
