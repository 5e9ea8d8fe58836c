//! System-wide process information snapshot.
//!
//! Used when a process can't be opened at all: the system process list is
//! readable without any rights on the individual processes.

#![allow(non_camel_case_types, non_snake_case)]

use std::mem::{offset_of, size_of};

use procpeek_core::{Pid, PointerWidth, ProcDriver, ProcError, Queried, zeroed_buffer};
use serde::{Deserialize, Serialize};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    WindowsProcesses,
    peb::{_UNICODE_STRING32, _UNICODE_STRING64, RemoteRegion},
    text::decode_string,
};

/// `_SYSTEM_PROCESS_INFORMATION` of a 32-bit system, up to
/// `UniqueProcessKey`.
#[expect(missing_docs)]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct _SYSTEM_PROCESS_INFORMATION32 {
    pub NextEntryOffset: u32,
    pub NumberOfThreads: u32,
    pub WorkingSetPrivateSize: i64,
    pub HardFaultCount: u32,
    pub NumberOfThreadsHighWatermark: u32,
    pub CycleTime: u64,
    pub CreateTime: i64,
    pub UserTime: i64,
    pub KernelTime: i64,
    pub ImageName: _UNICODE_STRING32,
    pub BasePriority: i32,
    pub UniqueProcessId: u32,
    pub InheritedFromUniqueProcessId: u32,
    pub HandleCount: u32,
    pub SessionId: u32,
    pub UniqueProcessKey: u32,
}

/// `_SYSTEM_PROCESS_INFORMATION` of a 64-bit system, up to
/// `UniqueProcessKey`.
#[expect(missing_docs)]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct _SYSTEM_PROCESS_INFORMATION64 {
    pub NextEntryOffset: u32,
    pub NumberOfThreads: u32,
    pub WorkingSetPrivateSize: i64,
    pub HardFaultCount: u32,
    pub NumberOfThreadsHighWatermark: u32,
    pub CycleTime: u64,
    pub CreateTime: i64,
    pub UserTime: i64,
    pub KernelTime: i64,
    pub ImageName: _UNICODE_STRING64,
    pub BasePriority: i32,
    pub _Padding0: u32,
    pub UniqueProcessId: u64,
    pub InheritedFromUniqueProcessId: u64,
    pub HandleCount: u32,
    pub SessionId: u32,
    pub UniqueProcessKey: u64,
}

const _: () = {
    assert!(offset_of!(_SYSTEM_PROCESS_INFORMATION32, ImageName) == 0x38);
    assert!(offset_of!(_SYSTEM_PROCESS_INFORMATION32, UniqueProcessId) == 0x44);
    assert!(offset_of!(_SYSTEM_PROCESS_INFORMATION32, SessionId) == 0x50);
    assert!(size_of::<_SYSTEM_PROCESS_INFORMATION32>() == 0x58);

    assert!(offset_of!(_SYSTEM_PROCESS_INFORMATION64, ImageName) == 0x38);
    assert!(offset_of!(_SYSTEM_PROCESS_INFORMATION64, UniqueProcessId) == 0x50);
    assert!(offset_of!(_SYSTEM_PROCESS_INFORMATION64, SessionId) == 0x64);
    assert!(size_of::<_SYSTEM_PROCESS_INFORMATION64>() == 0x70);
};

/// One process as described by the system snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSnapshotEntry {
    /// The process id.
    pub pid: Pid,

    /// The id of the process this one was created by.
    pub parent_pid: Pid,

    /// Number of threads.
    pub threads: u32,

    /// Number of open handles.
    pub handles: u32,

    /// Terminal services session id.
    pub session_id: u32,

    /// Base scheduling priority.
    pub base_priority: i32,

    /// Creation time, in 100ns intervals since January 1, 1601 (UTC).
    pub create_time: i64,

    /// The image file name, without its directory.
    pub image_name: String,
}

/// The system process list, as returned by one query.
#[derive(Debug)]
pub struct ProcessSnapshot {
    buffer: Vec<u8>,
    length: usize,
    width: PointerWidth,
}

impl ProcessSnapshot {
    /// Returns an iterator over the records of the snapshot.
    pub fn entries(&self) -> ProcessSnapshotEntries<'_> {
        ProcessSnapshotEntries {
            snapshot: self,
            offset: if self.length > 0 { Some(0) } else { None },
        }
    }

    /// Returns the record of `pid`.
    pub fn find(&self, pid: Pid) -> Result<ProcessSnapshotEntry, ProcError> {
        for entry in self.entries() {
            let entry = entry?;
            if entry.pid == pid {
                return Ok(entry);
            }
        }

        Err(ProcError::NotFound(pid))
    }

    fn data(&self) -> &[u8] {
        &self.buffer[..self.length]
    }

    /// Parses the record at `offset`, returning it along with the offset of
    /// the next record.
    fn record_at(&self, offset: usize) -> Result<(ProcessSnapshotEntry, u32), ProcError> {
        let data = self.data();
        let record = data
            .get(offset..)
            .ok_or(ProcError::Corrupted("snapshot record outside of its buffer"))?;

        let (next, mut entry, image_name) = match self.width {
            PointerWidth::Bits32 => {
                let (record, _) = _SYSTEM_PROCESS_INFORMATION32::read_from_prefix(record)
                    .map_err(|_| ProcError::Corrupted("snapshot record truncated"))?;

                let entry = ProcessSnapshotEntry {
                    pid: Pid(record.UniqueProcessId),
                    parent_pid: Pid(record.InheritedFromUniqueProcessId),
                    threads: record.NumberOfThreads,
                    handles: record.HandleCount,
                    session_id: record.SessionId,
                    base_priority: record.BasePriority,
                    create_time: record.CreateTime,
                    image_name: String::new(),
                };

                (
                    record.NextEntryOffset,
                    entry,
                    RemoteRegion::from(record.ImageName),
                )
            }
            PointerWidth::Bits64 => {
                let (record, _) = _SYSTEM_PROCESS_INFORMATION64::read_from_prefix(record)
                    .map_err(|_| ProcError::Corrupted("snapshot record truncated"))?;

                let entry = ProcessSnapshotEntry {
                    pid: Pid(record.UniqueProcessId as u32),
                    parent_pid: Pid(record.InheritedFromUniqueProcessId as u32),
                    threads: record.NumberOfThreads,
                    handles: record.HandleCount,
                    session_id: record.SessionId,
                    base_priority: record.BasePriority,
                    create_time: record.CreateTime,
                    image_name: String::new(),
                };

                (
                    record.NextEntryOffset,
                    entry,
                    RemoteRegion::from(record.ImageName),
                )
            }
        };

        if image_name.len > 0 {
            let base = self.buffer.as_ptr() as u64;
            let bytes = image_name
                .va
                .0
                .checked_sub(base)
                .and_then(|start| {
                    let end = start.checked_add(image_name.len)?;
                    data.get(start as usize..end as usize)
                })
                .ok_or(ProcError::Corrupted("image name outside of the snapshot"))?;

            entry.image_name = decode_string(bytes);
        }

        Ok((entry, next))
    }
}

/// An iterator over the records of a [`ProcessSnapshot`].
///
/// A malformed record ends the iteration after yielding its error.
pub struct ProcessSnapshotEntries<'a> {
    snapshot: &'a ProcessSnapshot,
    offset: Option<usize>,
}

impl Iterator for ProcessSnapshotEntries<'_> {
    type Item = Result<ProcessSnapshotEntry, ProcError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offset.take()?;

        match self.snapshot.record_at(offset) {
            Ok((entry, next)) => {
                if next != 0 {
                    self.offset = offset.checked_add(next as usize);
                }

                Some(Ok(entry))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

impl<Driver> WindowsProcesses<Driver>
where
    Driver: ProcDriver,
{
    /// Queries the system process list.
    ///
    /// The buffer starts at the size hint and grows until the OS accepts
    /// it; the size that worked is fed back into the hint.
    pub fn snapshot(&self) -> Result<ProcessSnapshot, ProcError> {
        let mut size = u64::from(self.size_hint.get());

        loop {
            let mut buffer = zeroed_buffer(size)?;

            match self.driver.query_system_processes(&mut buffer) {
                Queried::Filled(length) => {
                    let length = length.min(buffer.len());
                    tracing::debug!(size, length, "process snapshot taken");

                    if let Ok(length) = u32::try_from(length) {
                        self.size_hint.record(length);
                    }

                    return Ok(ProcessSnapshot {
                        buffer,
                        length,
                        width: self.driver.pointer_width(),
                    });
                }
                Queried::Failed { error, required } if error.is_buffer_too_small() => {
                    let required = required as u64;
                    size = if required > size { required } else { size.saturating_mul(2) };
                    tracing::trace!(size, "growing snapshot buffer");
                }
                Queried::Failed { error, .. } => return Err(error.into()),
            }
        }
    }

    /// Returns the snapshot record of `pid`.
    ///
    /// Needs no rights on the process itself.
    pub fn process_info(&self, pid: Pid) -> Result<ProcessSnapshotEntry, ProcError> {
        self.snapshot()?.find(pid)
    }
}

#[cfg(test)]
mod tests {
    use zerocopy::IntoBytes as _;

    use super::*;

    fn snapshot32(records: &[_SYSTEM_PROCESS_INFORMATION32]) -> ProcessSnapshot {
        let stride = size_of::<_SYSTEM_PROCESS_INFORMATION32>();
        let mut buffer = vec![0u8; stride * records.len()];

        for (index, record) in records.iter().enumerate() {
            let next = if index + 1 == records.len() { 0 } else { stride as u32 };
            let record = _SYSTEM_PROCESS_INFORMATION32 {
                NextEntryOffset: next,
                ..*record
            };

            buffer[index * stride..][..stride].copy_from_slice(record.as_bytes());
        }

        ProcessSnapshot {
            length: buffer.len(),
            buffer,
            width: PointerWidth::Bits32,
        }
    }

    #[test]
    fn walks_32_bit_records() {
        let snapshot = snapshot32(&[
            _SYSTEM_PROCESS_INFORMATION32::default(),
            _SYSTEM_PROCESS_INFORMATION32 {
                NumberOfThreads: 3,
                CreateTime: 0x01d9_0000_0000_0000,
                BasePriority: 8,
                UniqueProcessId: 4,
                InheritedFromUniqueProcessId: 0,
                HandleCount: 120,
                SessionId: 0,
                ..Default::default()
            },
            _SYSTEM_PROCESS_INFORMATION32 {
                NumberOfThreads: 1,
                BasePriority: 13,
                UniqueProcessId: 1234,
                InheritedFromUniqueProcessId: 4,
                HandleCount: 7,
                SessionId: 1,
                ..Default::default()
            },
        ]);

        let pids: Vec<_> = snapshot
            .entries()
            .map(|entry| entry.unwrap().pid)
            .collect();
        assert_eq!(pids, [Pid(0), Pid(4), Pid(1234)]);

        assert_eq!(
            snapshot.find(Pid(1234)).unwrap(),
            ProcessSnapshotEntry {
                pid: Pid(1234),
                parent_pid: Pid(4),
                threads: 1,
                handles: 7,
                session_id: 1,
                base_priority: 13,
                create_time: 0,
                image_name: String::new(),
            }
        );

        let system = snapshot.find(Pid(4)).unwrap();
        assert_eq!(system.create_time, 0x01d9_0000_0000_0000);
        assert_eq!(system.threads, 3);

        assert!(matches!(snapshot.find(Pid(8)), Err(ProcError::NotFound(_))));
    }

    #[test]
    fn truncated_32_bit_record_is_corrupted() {
        let mut snapshot = snapshot32(&[
            _SYSTEM_PROCESS_INFORMATION32::default(),
            _SYSTEM_PROCESS_INFORMATION32::default(),
        ]);
        snapshot.length -= 4;

        let entries: Vec<_> = snapshot.entries().collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_ok());
        assert!(matches!(entries[1], Err(ProcError::Corrupted(_))));
    }

    #[test]
    fn foreign_32_bit_image_name_is_corrupted() {
        let snapshot = snapshot32(&[_SYSTEM_PROCESS_INFORMATION32 {
            ImageName: _UNICODE_STRING32 {
                Length: 8,
                MaximumLength: 10,
                Buffer: 1,
            },
            UniqueProcessId: 4,
            ..Default::default()
        }]);

        assert!(matches!(
            snapshot.find(Pid(4)),
            Err(ProcError::Corrupted(_))
        ));
    }
}
