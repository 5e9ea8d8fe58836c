use crate::ProcError;

/// Allocates a zero-filled local buffer of `len` bytes.
///
/// Lengths that do not fit the address space, or that the allocator
/// refuses, are reported as [`ProcError::OutOfMemory`] instead of aborting.
pub fn zeroed_buffer(len: u64) -> Result<Vec<u8>, ProcError> {
    let size = usize::try_from(len)
        .ok()
        .filter(|&size| size <= isize::MAX as usize)
        .ok_or(ProcError::OutOfMemory { requested: len })?;

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(|_| ProcError::OutOfMemory { requested: len })?;
    buffer.resize(size, 0);

    Ok(buffer)
}
