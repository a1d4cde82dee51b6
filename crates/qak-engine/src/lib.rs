//! Reference implementation of the Qak engine.
//!
//! [`ReferenceEngine`] implements [`qak_abi::Engine`] without a wasm
//! runtime: the linear memory is a [`Heap`] in this process, compilation
//! runs the tokenizer and parser from `qak-lexer` / `qak-parser`, and every
//! record it hands out is written into the heap in the ABI layout. Sessions
//! opened on it behave exactly as they do against a compiled engine module.
//!
//! ```ignore
//! let engine = ReferenceEngine::new().with_output(SharedBuffer::new());
//! let mut session = Session::new(engine)?;
//! let module = session.compile_source("main.qak", "x = 1")?;
//! assert!(!session.has_errors(module)?);
//! ```

pub mod config;
pub mod engine;
pub mod heap;
pub mod output;
pub mod report;

pub use config::EngineConfig;
pub use engine::ReferenceEngine;
pub use heap::{Heap, HeapStats};
pub use output::SharedBuffer;
