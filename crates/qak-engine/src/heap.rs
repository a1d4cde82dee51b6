//! The engine's linear memory: a growable byte vector with a first-fit
//! allocator.
//!
//! Offsets below [`HEAP_BASE`] are never handed out, so `0` stays free to
//! mean "no allocation". Freed blocks go on a free list, coalesced with their
//! neighbours, and are reused before the heap grows. Bytes are not cleared on
//! reuse.

use std::collections::BTreeMap;

use qak_abi::{check_bounds, AbiError, AbiResult, LinearMemory};

/// First offset the allocator hands out.
pub const HEAP_BASE: u32 = 8;

/// Allocation granularity in bytes.
pub const ALIGN: u32 = 8;

/// Allocation counters, as reported by `qak_compiler_print_memory_usage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    pub live_allocations: usize,
    pub live_bytes: u32,
    pub peak_bytes: u32,
    pub total_allocations: u64,
}

#[derive(Debug, Clone)]
pub struct Heap {
    bytes: Vec<u8>,
    limit: u32,
    /// Everything at or above `top` is unused.
    top: u32,
    live: BTreeMap<u32, u32>,
    free: BTreeMap<u32, u32>,
    stats: HeapStats,
}

impl Heap {
    /// An empty heap that never grows past `limit` bytes.
    pub fn new(limit: u32) -> Self {
        Self {
            bytes: vec![0; HEAP_BASE as usize],
            limit: limit.max(HEAP_BASE),
            top: HEAP_BASE,
            live: BTreeMap::new(),
            free: BTreeMap::new(),
            stats: HeapStats::default(),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn stats(&self) -> HeapStats {
        self.stats
    }

    /// Live blocks as `(offset, size)`, lowest offset first.
    pub fn blocks(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.live.iter().map(|(&offset, &size)| (offset, size))
    }

    pub fn is_live(&self, offset: u32) -> bool {
        self.live.contains_key(&offset)
    }

    /// Reserve `size` bytes. `None` when the limit would be exceeded.
    pub fn alloc(&mut self, size: u32) -> Option<u32> {
        let size = size.max(1).checked_add(ALIGN - 1)? & !(ALIGN - 1);
        let offset = match self.take_free(size) {
            Some(offset) => offset,
            None => self.grow(size)?,
        };
        self.live.insert(offset, size);
        self.stats.live_allocations += 1;
        self.stats.live_bytes += size;
        self.stats.peak_bytes = self.stats.peak_bytes.max(self.stats.live_bytes);
        self.stats.total_allocations += 1;
        Some(offset)
    }

    /// Return a block. `false` if `offset` is not the start of a live block.
    pub fn dealloc(&mut self, offset: u32) -> bool {
        let Some(size) = self.live.remove(&offset) else {
            return false;
        };
        self.stats.live_allocations -= 1;
        self.stats.live_bytes -= size;
        self.release(offset, size);
        true
    }

    /// The NUL-terminated byte string at `ptr`, without the terminator.
    pub fn c_str(&self, ptr: u32) -> Option<&[u8]> {
        let tail = self.bytes.get(ptr as usize..)?;
        let len = tail.iter().position(|&b| b == 0)?;
        Some(&tail[..len])
    }

    fn take_free(&mut self, size: u32) -> Option<u32> {
        let (&offset, &block) = self.free.iter().find(|(_, &block)| block >= size)?;
        self.free.remove(&offset);
        if block > size {
            self.free.insert(offset + size, block - size);
        }
        Some(offset)
    }

    fn grow(&mut self, size: u32) -> Option<u32> {
        let offset = self.top;
        let end = offset.checked_add(size)?;
        if end > self.limit {
            return None;
        }
        if end as usize > self.bytes.len() {
            self.bytes.resize(end as usize, 0);
        }
        self.top = end;
        Some(offset)
    }

    fn release(&mut self, mut offset: u32, mut size: u32) {
        if let Some((&prev, &prev_size)) = self.free.range(..offset).next_back() {
            if prev + prev_size == offset {
                self.free.remove(&prev);
                offset = prev;
                size += prev_size;
            }
        }
        if let Some(next_size) = self.free.remove(&(offset + size)) {
            size += next_size;
        }
        if offset + size == self.top {
            self.top = offset;
        } else {
            self.free.insert(offset, size);
        }
    }
}

impl LinearMemory for Heap {
    fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    fn read(&self, offset: u32, buf: &mut [u8]) -> AbiResult<()> {
        let range = check_bounds(self.size(), offset, buf.len() as u32)?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> AbiResult<()> {
        let range = check_bounds(self.size(), offset, bytes.len() as u32)?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }

    fn allocate(&mut self, size: u32) -> AbiResult<u32> {
        self.alloc(size)
            .ok_or(AbiError::ResourceExhausted { operation: "malloc" })
    }

    fn free(&mut self, offset: u32) -> AbiResult<()> {
        if self.dealloc(offset) {
            Ok(())
        } else {
            Err(AbiError::engine_call(
                "free",
                format!("{offset:#x} is not an allocated block"),
            ))
        }
    }
}
