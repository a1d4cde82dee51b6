//! The engine's entry points.
//!
//! An [`Engine`] is a compiler living behind a linear memory. Every method
//! maps one-to-one onto an exported function (names in [`exports`]). Handles
//! and pointers are plain `u32`s in the engine's address space; giving them
//! meaning is the [`Session`](crate::Session)'s job, not the engine's.

use crate::error::AbiResult;
use crate::memory::LinearMemory;

/// An engine-side handle: the address of a compiler or module object.
pub type RawHandle = u32;

/// Export names of the engine entry points.
pub mod exports {
    pub const VERSION: &str = "qak_version";
    pub const COMPILER_NEW: &str = "qak_compiler_new";
    pub const COMPILER_DELETE: &str = "qak_compiler_delete";
    pub const COMPILER_COMPILE_SOURCE: &str = "qak_compiler_compile_source";
    pub const COMPILER_PRINT_MEMORY_USAGE: &str = "qak_compiler_print_memory_usage";
    pub const MODULE_DELETE: &str = "qak_module_delete";
    pub const MODULE_GET_SOURCE: &str = "qak_module_get_source";
    pub const MODULE_GET_NUM_ERRORS: &str = "qak_module_get_num_errors";
    pub const MODULE_GET_ERROR: &str = "qak_module_get_error";
    pub const MODULE_GET_NUM_TOKENS: &str = "qak_module_get_num_tokens";
    pub const MODULE_GET_TOKEN: &str = "qak_module_get_token";
    pub const MODULE_PRINT_ERRORS: &str = "qak_module_print_errors";
    pub const MODULE_PRINT_TOKENS: &str = "qak_module_print_tokens";
    pub const MODULE_PRINT_AST: &str = "qak_module_print_ast";
    pub const MALLOC: &str = "malloc";
    pub const FREE: &str = "free";
    pub const MEMORY: &str = "memory";

    /// Exports every engine must provide. `qak_version` is optional.
    pub const REQUIRED: [&str; 15] = [
        COMPILER_NEW,
        COMPILER_DELETE,
        COMPILER_COMPILE_SOURCE,
        COMPILER_PRINT_MEMORY_USAGE,
        MODULE_DELETE,
        MODULE_GET_SOURCE,
        MODULE_GET_NUM_ERRORS,
        MODULE_GET_ERROR,
        MODULE_GET_NUM_TOKENS,
        MODULE_GET_TOKEN,
        MODULE_PRINT_ERRORS,
        MODULE_PRINT_TOKENS,
        MODULE_PRINT_AST,
        MALLOC,
        FREE,
    ];
}

/// A Qak compiler engine.
///
/// Implementations forward each call verbatim. They do not check handles;
/// a null return from [`compiler_new`](Engine::compiler_new) or
/// [`compile_source`](Engine::compile_source) is passed through as `0`.
/// Output pointers (`out`) address a buffer of the matching record size.
pub trait Engine: LinearMemory {
    /// ABI version the engine was built against, if it exports one.
    fn version(&mut self) -> AbiResult<Option<u32>>;

    fn compiler_new(&mut self) -> AbiResult<RawHandle>;

    fn compiler_delete(&mut self, compiler: RawHandle) -> AbiResult<()>;

    /// Compile the NUL-terminated strings at `file_name` and `source`.
    fn compile_source(
        &mut self,
        compiler: RawHandle,
        file_name: u32,
        source: u32,
    ) -> AbiResult<RawHandle>;

    fn compiler_print_memory_usage(&mut self, compiler: RawHandle) -> AbiResult<()>;

    fn module_delete(&mut self, module: RawHandle) -> AbiResult<()>;

    /// Write a source record to `out`.
    fn module_get_source(&mut self, module: RawHandle, out: u32) -> AbiResult<()>;

    fn module_num_errors(&mut self, module: RawHandle) -> AbiResult<u32>;

    /// Write diagnostic `index` to `out`.
    fn module_get_error(&mut self, module: RawHandle, index: u32, out: u32) -> AbiResult<()>;

    fn module_num_tokens(&mut self, module: RawHandle) -> AbiResult<u32>;

    /// Write token `index` to `out`.
    fn module_get_token(&mut self, module: RawHandle, index: u32, out: u32) -> AbiResult<()>;

    fn module_print_errors(&mut self, module: RawHandle) -> AbiResult<()>;

    fn module_print_tokens(&mut self, module: RawHandle) -> AbiResult<()>;

    fn module_print_ast(&mut self, module: RawHandle) -> AbiResult<()>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn version(&mut self) -> AbiResult<Option<u32>> {
        (**self).version()
    }

    fn compiler_new(&mut self) -> AbiResult<RawHandle> {
        (**self).compiler_new()
    }

    fn compiler_delete(&mut self, compiler: RawHandle) -> AbiResult<()> {
        (**self).compiler_delete(compiler)
    }

    fn compile_source(
        &mut self,
        compiler: RawHandle,
        file_name: u32,
        source: u32,
    ) -> AbiResult<RawHandle> {
        (**self).compile_source(compiler, file_name, source)
    }

    fn compiler_print_memory_usage(&mut self, compiler: RawHandle) -> AbiResult<()> {
        (**self).compiler_print_memory_usage(compiler)
    }

    fn module_delete(&mut self, module: RawHandle) -> AbiResult<()> {
        (**self).module_delete(module)
    }

    fn module_get_source(&mut self, module: RawHandle, out: u32) -> AbiResult<()> {
        (**self).module_get_source(module, out)
    }

    fn module_num_errors(&mut self, module: RawHandle) -> AbiResult<u32> {
        (**self).module_num_errors(module)
    }

    fn module_get_error(&mut self, module: RawHandle, index: u32, out: u32) -> AbiResult<()> {
        (**self).module_get_error(module, index, out)
    }

    fn module_num_tokens(&mut self, module: RawHandle) -> AbiResult<u32> {
        (**self).module_num_tokens(module)
    }

    fn module_get_token(&mut self, module: RawHandle, index: u32, out: u32) -> AbiResult<()> {
        (**self).module_get_token(module, index, out)
    }

    fn module_print_errors(&mut self, module: RawHandle) -> AbiResult<()> {
        (**self).module_print_errors(module)
    }

    fn module_print_tokens(&mut self, module: RawHandle) -> AbiResult<()> {
        (**self).module_print_tokens(module)
    }

    fn module_print_ast(&mut self, module: RawHandle) -> AbiResult<()> {
        (**self).module_print_ast(module)
    }
}
