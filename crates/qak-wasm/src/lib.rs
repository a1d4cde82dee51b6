//! Loads a compiled Qak engine module and runs it under `wasmi`.
//!
//! [`WasmEngine`] resolves the engine's exports once at load time and
//! implements [`qak_abi::Engine`] and [`qak_abi::LinearMemory`] over the
//! instance, so a [`qak_abi::Session`] can drive it like any other engine.
//! Traps inside the module surface as [`qak_abi::AbiError::EngineCall`].

pub mod engine;
pub mod error;
pub mod host;
pub mod inspect;

pub use engine::WasmEngine;
pub use error::{WasmError, WasmResult};
pub use host::HostState;
pub use inspect::{missing_exports, module_exports};
