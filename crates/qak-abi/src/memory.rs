//! Accessor over the engine's linear memory.
//!
//! All offsets are absolute byte addresses. Words are little-endian, as in
//! wasm32. The boundary layer writes only into buffers the engine's
//! allocator handed out.

use std::ops::Range;

use crate::error::{AbiError, AbiResult};

/// The null offset. Never a valid allocation.
pub const NULL: u32 = 0;

/// Read/write view of an engine's linear memory plus its allocator.
pub trait LinearMemory {
    /// Current size of linear memory in bytes.
    fn size(&self) -> u32;

    /// Fill `buf` with the bytes at `offset..offset + buf.len()`.
    fn read(&self, offset: u32, buf: &mut [u8]) -> AbiResult<()>;

    /// Copy `bytes` to `offset..offset + bytes.len()`.
    fn write(&mut self, offset: u32, bytes: &[u8]) -> AbiResult<()>;

    /// Allocate `size` bytes with the engine's allocator.
    ///
    /// Implementations map a null result to [`AbiError::ResourceExhausted`].
    fn allocate(&mut self, size: u32) -> AbiResult<u32>;

    /// Return an allocation to the engine.
    fn free(&mut self, offset: u32) -> AbiResult<()>;

    fn read_u32(&self, offset: u32) -> AbiResult<u32> {
        let mut word = [0u8; 4];
        self.read(offset, &mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    /// Read `len` bytes into an owned buffer.
    ///
    /// Bounds are checked before anything is allocated on the host, so a
    /// garbage length fails fast instead of reserving gigabytes.
    fn read_bytes(&self, offset: u32, len: u32) -> AbiResult<Vec<u8>> {
        check_bounds(self.size(), offset, len)?;
        let mut bytes = vec![0u8; len as usize];
        self.read(offset, &mut bytes)?;
        Ok(bytes)
    }

    fn write_u32(&mut self, offset: u32, value: u32) -> AbiResult<()> {
        self.write(offset, &value.to_le_bytes())
    }
}

impl<M: LinearMemory + ?Sized> LinearMemory for Box<M> {
    fn size(&self) -> u32 {
        (**self).size()
    }

    fn read(&self, offset: u32, buf: &mut [u8]) -> AbiResult<()> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> AbiResult<()> {
        (**self).write(offset, bytes)
    }

    fn allocate(&mut self, size: u32) -> AbiResult<u32> {
        (**self).allocate(size)
    }

    fn free(&mut self, offset: u32) -> AbiResult<()> {
        (**self).free(offset)
    }
}

/// Validate `offset..offset + len` against a memory of `memory_size` bytes
/// and return it as a slice range.
pub fn check_bounds(memory_size: u32, offset: u32, len: u32) -> AbiResult<Range<usize>> {
    let out_of_bounds = || AbiError::OutOfBounds {
        offset,
        len,
        memory_size,
    };
    let end = offset.checked_add(len).ok_or_else(out_of_bounds)?;
    if end > memory_size {
        return Err(out_of_bounds());
    }
    Ok(offset as usize..end as usize)
}
