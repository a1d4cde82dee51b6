//! Static checks on an engine module before it is instantiated.

use qak_abi::exports;
use wasmparser::{ExternalKind, Parser, Payload};

use crate::error::WasmResult;

/// Exports of `wasm` as `(name, kind)` in section order.
pub fn module_exports(wasm: &[u8]) -> WasmResult<Vec<(String, ExternalKind)>> {
    let mut found = Vec::new();
    for payload in Parser::new(0).parse_all(wasm) {
        if let Payload::ExportSection(reader) = payload? {
            for export in reader {
                let export = export?;
                found.push((export.name.to_string(), export.kind));
            }
        }
    }
    Ok(found)
}

/// Required engine exports `wasm` does not provide, in the order of
/// [`exports::REQUIRED`], with `memory` last.
pub fn missing_exports(wasm: &[u8]) -> WasmResult<Vec<&'static str>> {
    let found = module_exports(wasm)?;
    let has = |name: &str, kind: ExternalKind| found.iter().any(|(n, k)| n == name && *k == kind);

    let mut missing: Vec<&'static str> = exports::REQUIRED
        .iter()
        .copied()
        .filter(|name| !has(name, ExternalKind::Func))
        .collect();
    if !has(exports::MEMORY, ExternalKind::Memory) {
        missing.push(exports::MEMORY);
    }
    Ok(missing)
}
