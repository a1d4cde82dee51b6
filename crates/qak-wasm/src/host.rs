//! Host functions the engine module may import.
//!
//! Only `wasi_snapshot_preview1.fd_write` is provided: it is how a compiled
//! engine's `printf` reaches the host. Writes to stdout and stderr both go
//! to the [`HostState`] sink.

use std::io::{self, Write};

use qak_abi::exports;
use wasmi::{Caller, Extern, Linker};

use crate::error::{WasmError, WasmResult};

const WASI: &str = "wasi_snapshot_preview1";

const ERRNO_SUCCESS: i32 = 0;
const ERRNO_BADF: i32 = 8;
const ERRNO_FAULT: i32 = 21;
const ERRNO_IO: i32 = 29;

/// Store data for an engine instance.
pub struct HostState {
    pub out: Box<dyn Write + Send>,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            out: Box::new(io::stdout()),
        }
    }
}

pub(crate) fn link(linker: &mut Linker<HostState>) -> WasmResult<()> {
    linker
        .func_wrap(WASI, "fd_write", fd_write)
        .map_err(|e| WasmError::Link(e.to_string()))?;
    Ok(())
}

fn fd_write(
    mut caller: Caller<'_, HostState>,
    fd: i32,
    iovs: i32,
    iovs_len: i32,
    nwritten: i32,
) -> i32 {
    if fd != 1 && fd != 2 {
        return ERRNO_BADF;
    }
    let Some(memory) = caller.get_export(exports::MEMORY).and_then(Extern::into_memory) else {
        return ERRNO_FAULT;
    };
    let Some(bytes) = gather(memory.data(&caller), iovs as u32, iovs_len as u32) else {
        return ERRNO_FAULT;
    };
    if caller.data_mut().out.write_all(&bytes).is_err() {
        return ERRNO_IO;
    }

    let start = nwritten as u32 as usize;
    let Some(slot) = memory.data_mut(&mut caller).get_mut(start..start + 4) else {
        return ERRNO_FAULT;
    };
    slot.copy_from_slice(&(bytes.len() as u32).to_le_bytes());
    ERRNO_SUCCESS
}

/// Concatenate the `count` `{ ptr, len }` buffers listed at `iovs`.
fn gather(data: &[u8], iovs: u32, count: u32) -> Option<Vec<u8>> {
    let word = |at: usize| -> Option<usize> {
        let bytes = data.get(at..at.checked_add(4)?)?;
        Some(u32::from_le_bytes(bytes.try_into().ok()?) as usize)
    };
    let mut out = Vec::new();
    for i in 0..count as usize {
        let entry = (iovs as usize).checked_add(i * 8)?;
        let ptr = word(entry)?;
        let len = word(entry + 4)?;
        out.extend_from_slice(data.get(ptr..ptr.checked_add(len)?)?);
    }
    Some(out)
}
