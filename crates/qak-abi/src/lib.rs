//! Boundary layer between a host and the Qak compiler engine.
//!
//! The engine lives behind a linear memory and a set of exported functions
//! that trade in `u32` handles and pointers. This crate knows the byte
//! layouts of the records the engine writes ([`layout`]), reads them back
//! into owned values ([`decode`]), manages the short-lived buffers those
//! calls need ([`scratch`]) and tracks compiler and module lifetimes
//! ([`Session`]).
//!
//! ```ignore
//! let mut session = Session::new(engine)?;
//! let module = session.compile_source("main.qak", "x = 1")?;
//! for token in session.tokens(module)? {
//!     println!("{}", token?);
//! }
//! session.delete_module(module)?;
//! ```

pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod handle;
pub mod layout;
pub mod memory;
pub mod raw;
pub mod scratch;
pub mod session;

pub use config::{SessionConfig, Utf8Policy};
pub use decode::Record;
pub use engine::{exports, Engine, RawHandle};
pub use error::{AbiError, AbiResult, ErrorKind};
pub use handle::ModuleHandle;
pub use layout::ABI_VERSION;
pub use memory::{check_bounds, LinearMemory, NULL};
pub use session::{Enumerable, ModuleSnapshot, RecordIter, Session};
