//! Errors raised while loading an engine module.

use std::path::PathBuf;

use thiserror::Error;

/// Failures before the engine is usable. Once loaded, engine calls fail with
/// [`qak_abi::AbiError`].
#[derive(Debug, Error)]
pub enum WasmError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a WebAssembly module.
    #[error("invalid wasm module: {0}")]
    Invalid(#[from] wasmparser::BinaryReaderError),

    /// The module lacks entry points the boundary layer needs.
    #[error("engine module is missing exports: {}", .0.join(", "))]
    MissingExports(Vec<&'static str>),

    /// An export exists but has the wrong signature.
    #[error("export `{name}` has the wrong type: {message}")]
    Signature { name: &'static str, message: String },

    #[error("failed to link host functions: {0}")]
    Link(String),

    #[error(transparent)]
    Runtime(#[from] wasmi::Error),
}

pub type WasmResult<T> = Result<T, WasmError>;
