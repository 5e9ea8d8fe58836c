//! Command-line retrieval and tokenization.

use procpeek_core::{
    Pid, PointerWidth, ProcDriver, ProcError, ProcessAccess, Queried, Va, zeroed_buffer,
};
use zerocopy::FromBytes as _;

use crate::{
    WindowsProcesses,
    peb::{_UNICODE_STRING32, _UNICODE_STRING64, ProcessDataKind, RemoteRegion},
    text::decode_string,
};

/// A way of obtaining the raw command line of a process.
pub trait CommandLineSource {
    /// Returns the untokenized command line of `pid`.
    fn raw_command_line<Driver>(
        &self,
        processes: &WindowsProcesses<Driver>,
        pid: Pid,
    ) -> Result<String, ProcError>
    where
        Driver: ProcDriver;
}

/// Reads the command line from the target's process parameters.
///
/// Reflects the value the process currently holds, including changes made
/// after it was created.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveCommandLine;

/// Asks the OS for the command line it recorded when the process was
/// created.
///
/// Needs only limited query rights, and no memory access to the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordedCommandLine;

impl CommandLineSource for LiveCommandLine {
    fn raw_command_line<Driver>(
        &self,
        processes: &WindowsProcesses<Driver>,
        pid: Pid,
    ) -> Result<String, ProcError>
    where
        Driver: ProcDriver,
    {
        let data = processes.read_process_data(pid, ProcessDataKind::CommandLine)?;
        Ok(decode_string(data.as_bytes()))
    }
}

impl CommandLineSource for RecordedCommandLine {
    fn raw_command_line<Driver>(
        &self,
        processes: &WindowsProcesses<Driver>,
        pid: Pid,
    ) -> Result<String, ProcError>
    where
        Driver: ProcDriver,
    {
        let handle = processes.open_handle(pid, ProcessAccess::QUERY_LIMITED_INFORMATION)?;
        let driver = processes.driver();

        let mut size = RECORDED_COMMAND_LINE_INITIAL_SIZE;
        loop {
            let mut buffer = zeroed_buffer(size)?;

            match driver.query_command_line(handle.raw(), &mut buffer) {
                Queried::Filled(length) => {
                    tracing::trace!(%pid, size, length, "recorded command line queried");
                    return recorded_string(&buffer, length, driver.pointer_width());
                }
                Queried::Failed { error, required } if error.is_buffer_too_small() => {
                    let required = required as u64;
                    size = if required > size { required } else { size.saturating_mul(2) };
                    tracing::trace!(%pid, size, "growing command line buffer");
                }
                Queried::Failed { error, .. } => return Err(error.into()),
            }
        }
    }
}

/// The size of the first command-line query buffer.
const RECORDED_COMMAND_LINE_INITIAL_SIZE: u64 = 4096;

const TRUNCATED_HEADER: ProcError = ProcError::Corrupted("command line header truncated");

/// Extracts the string described by the `UNICODE_STRING` header at the start
/// of `buffer`, whose pointer refers into `buffer` itself.
fn recorded_string(
    buffer: &[u8],
    length: usize,
    width: PointerWidth,
) -> Result<String, ProcError> {
    let filled = &buffer[..length.min(buffer.len())];

    let region = match width {
        PointerWidth::Bits32 => _UNICODE_STRING32::read_from_prefix(filled)
            .map(|(header, _)| RemoteRegion::from(header))
            .map_err(|_| TRUNCATED_HEADER)?,
        PointerWidth::Bits64 => _UNICODE_STRING64::read_from_prefix(filled)
            .map(|(header, _)| RemoteRegion::from(header))
            .map_err(|_| TRUNCATED_HEADER)?,
    };

    if region.len == 0 {
        return Ok(String::new());
    }

    let base = Va(buffer.as_ptr() as u64);
    let (start, end) = region
        .va
        .0
        .checked_sub(base.0)
        .and_then(|start| Some((start, start.checked_add(region.len)?)))
        .filter(|&(_, end)| end <= filled.len() as u64)
        .ok_or(ProcError::Corrupted("command line outside of its buffer"))?;

    Ok(decode_string(&filled[start as usize..end as usize]))
}

/// Splits a command line into arguments with the platform's argv rules.
///
/// The program name ends at its closing quote if it starts with one, and at
/// the first blank otherwise; backslashes in it are literal. In every later
/// argument, `2n` backslashes followed by a quote produce `n` backslashes and
/// toggle quoting, `2n + 1` backslashes followed by a quote produce `n`
/// backslashes and a literal quote, and `""` inside a quoted region produces
/// a literal quote.
///
/// # Examples
///
/// ```
/// # use procpeek_os_windows::split_command_line;
/// assert_eq!(
///     split_command_line(r#""C:\Program Files\app.exe" -x "a b""#),
///     ["C:\\Program Files\\app.exe", "-x", "a b"],
/// );
/// ```
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    if line.is_empty() {
        return result;
    }

    let mut chars = line.chars().peekable();

    let mut program = String::new();
    if chars.next_if_eq(&'"').is_some() {
        for c in chars.by_ref() {
            if c == '"' {
                break;
            }
            program.push(c);
        }
    }
    else {
        while let Some(c) = chars.next_if(|&c| !is_blank(c)) {
            program.push(c);
        }
    }
    result.push(program);

    let mut current = String::new();
    let mut started = false;
    let mut quoted = false;
    let mut backslashes = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                backslashes += 1;
                started = true;
            }
            '"' => {
                current.extend(std::iter::repeat_n('\\', backslashes / 2));

                if backslashes % 2 == 1 {
                    current.push('"');
                }
                else if quoted && chars.next_if_eq(&'"').is_some() {
                    current.push('"');
                }
                else {
                    quoted = !quoted;
                }

                backslashes = 0;
                started = true;
            }
            c if is_blank(c) && !quoted => {
                current.extend(std::iter::repeat_n('\\', backslashes));
                backslashes = 0;

                if started {
                    result.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.extend(std::iter::repeat_n('\\', backslashes));
                backslashes = 0;

                current.push(c);
                started = true;
            }
        }
    }

    current.extend(std::iter::repeat_n('\\', backslashes));
    if started {
        result.push(current);
    }

    result
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}
