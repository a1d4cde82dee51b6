//! Scoped native buffers.
//!
//! Both buffer kinds borrow the engine mutably for as long as they live and
//! free their allocations on drop. Calls into the engine while a buffer is
//! held go through [`ScratchBuffer::memory`] / [`NativeStrings::memory`].

use log::{error, trace};

use crate::error::{AbiError, AbiResult};
use crate::layout::RecordLayout;
use crate::memory::LinearMemory;

/// One record-sized output buffer in engine memory.
///
/// Acquired once per enumeration and reused for every index. The bytes are
/// zeroed on acquire.
pub struct ScratchBuffer<'m, M: LinearMemory + ?Sized> {
    memory: &'m mut M,
    offset: Option<u32>,
    size: u32,
}

impl<'m, M: LinearMemory + ?Sized> ScratchBuffer<'m, M> {
    pub fn acquire(memory: &'m mut M, layout: &RecordLayout) -> AbiResult<Self> {
        let offset = memory.allocate(layout.size)?;
        let mut buffer = Self {
            memory,
            offset: Some(offset),
            size: layout.size,
        };
        // On failure `buffer` drops here and frees the block.
        buffer.clear()?;
        trace!("scratch: acquired {} bytes at {offset} for {}", layout.size, layout.name);
        Ok(buffer)
    }

    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or_default()
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Zero the buffer so a call that writes nothing cannot leave the previous
    /// record's bytes behind.
    pub fn clear(&mut self) -> AbiResult<()> {
        let offset = self.offset();
        self.memory.write(offset, &vec![0u8; self.size as usize])
    }

    pub fn memory(&mut self) -> &mut M {
        &mut *self.memory
    }

    pub fn memory_ref(&self) -> &M {
        &*self.memory
    }

    /// Free the buffer now and report the outcome.
    pub fn release(mut self) -> AbiResult<()> {
        self.free()
    }

    fn free(&mut self) -> AbiResult<()> {
        match self.offset.take() {
            Some(offset) => {
                trace!("scratch: releasing {offset}");
                self.memory.free(offset)
            }
            None => Ok(()),
        }
    }
}

impl<M: LinearMemory + ?Sized> Drop for ScratchBuffer<'_, M> {
    fn drop(&mut self) {
        if let Err(e) = self.free() {
            error!("scratch: failed to release buffer: {e}");
        }
    }
}

/// NUL-terminated copies of host strings, for engine calls that take
/// `const char *` arguments.
///
/// Every string pushed stays alive until the set is released or dropped.
pub struct NativeStrings<'m, M: LinearMemory + ?Sized> {
    memory: &'m mut M,
    allocations: Vec<u32>,
}

impl<'m, M: LinearMemory + ?Sized> NativeStrings<'m, M> {
    pub fn new(memory: &'m mut M) -> Self {
        Self {
            memory,
            allocations: Vec::new(),
        }
    }

    /// Copy `text` into engine memory with a trailing NUL and return its
    /// address. `what` names the argument in errors.
    pub fn push(&mut self, what: &'static str, text: &str) -> AbiResult<u32> {
        if let Some(index) = text.bytes().position(|b| b == 0) {
            return Err(AbiError::InteriorNul { what, index });
        }
        let len = u32::try_from(text.len())
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or(AbiError::ResourceExhausted { operation: what })?;
        let ptr = self.memory.allocate(len)?;
        self.allocations.push(ptr);

        let mut bytes = Vec::with_capacity(len as usize);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        self.memory.write(ptr, &bytes)?;
        trace!("native string: {what} ({} bytes) at {ptr}", text.len());
        Ok(ptr)
    }

    pub fn memory(&mut self) -> &mut M {
        &mut *self.memory
    }

    /// Free every string now. Keeps going after a failure and reports the
    /// first one.
    pub fn release(mut self) -> AbiResult<()> {
        self.free_all()
    }

    fn free_all(&mut self) -> AbiResult<()> {
        let mut first_error = None;
        for ptr in self.allocations.drain(..) {
            if let Err(e) = self.memory.free(ptr) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<M: LinearMemory + ?Sized> Drop for NativeStrings<'_, M> {
    fn drop(&mut self) {
        if let Err(e) = self.free_all() {
            error!("native strings: failed to release: {e}");
        }
    }
}
