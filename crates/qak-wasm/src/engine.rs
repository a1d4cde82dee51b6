//! [`WasmEngine`]: the engine entry points, forwarded to a wasm instance.

use std::io::Write;
use std::path::Path;

use log::debug;
use qak_abi::{check_bounds, exports, AbiError, AbiResult, Engine, LinearMemory, RawHandle, NULL};
use wasmi::{Instance, Linker, Memory, Module, Store, TypedFunc, WasmParams, WasmResults};

use crate::error::{WasmError, WasmResult};
use crate::host::{self, HostState};
use crate::inspect::missing_exports;

/// Typed handles to the engine's exports.
struct Exports {
    version: Option<TypedFunc<(), i32>>,
    compiler_new: TypedFunc<(), i32>,
    compiler_delete: TypedFunc<i32, ()>,
    compile_source: TypedFunc<(i32, i32, i32), i32>,
    compiler_print_memory_usage: TypedFunc<i32, ()>,
    module_delete: TypedFunc<i32, ()>,
    module_get_source: TypedFunc<(i32, i32), ()>,
    module_get_num_errors: TypedFunc<i32, i32>,
    module_get_error: TypedFunc<(i32, i32, i32), ()>,
    module_get_num_tokens: TypedFunc<i32, i32>,
    module_get_token: TypedFunc<(i32, i32, i32), ()>,
    module_print_errors: TypedFunc<i32, ()>,
    module_print_tokens: TypedFunc<i32, ()>,
    module_print_ast: TypedFunc<i32, ()>,
    malloc: TypedFunc<i32, i32>,
    free: TypedFunc<i32, ()>,
}

impl Exports {
    fn resolve(instance: &Instance, store: &Store<HostState>) -> WasmResult<Self> {
        let version = match instance.get_func(store, exports::VERSION) {
            Some(func) => Some(func.typed(store).map_err(|e| WasmError::Signature {
                name: exports::VERSION,
                message: e.to_string(),
            })?),
            None => None,
        };
        Ok(Self {
            version,
            compiler_new: typed(instance, store, exports::COMPILER_NEW)?,
            compiler_delete: typed(instance, store, exports::COMPILER_DELETE)?,
            compile_source: typed(instance, store, exports::COMPILER_COMPILE_SOURCE)?,
            compiler_print_memory_usage: typed(instance, store, exports::COMPILER_PRINT_MEMORY_USAGE)?,
            module_delete: typed(instance, store, exports::MODULE_DELETE)?,
            module_get_source: typed(instance, store, exports::MODULE_GET_SOURCE)?,
            module_get_num_errors: typed(instance, store, exports::MODULE_GET_NUM_ERRORS)?,
            module_get_error: typed(instance, store, exports::MODULE_GET_ERROR)?,
            module_get_num_tokens: typed(instance, store, exports::MODULE_GET_NUM_TOKENS)?,
            module_get_token: typed(instance, store, exports::MODULE_GET_TOKEN)?,
            module_print_errors: typed(instance, store, exports::MODULE_PRINT_ERRORS)?,
            module_print_tokens: typed(instance, store, exports::MODULE_PRINT_TOKENS)?,
            module_print_ast: typed(instance, store, exports::MODULE_PRINT_AST)?,
            malloc: typed(instance, store, exports::MALLOC)?,
            free: typed(instance, store, exports::FREE)?,
        })
    }
}

fn typed<P: WasmParams, R: WasmResults>(
    instance: &Instance,
    store: &Store<HostState>,
    name: &'static str,
) -> WasmResult<TypedFunc<P, R>> {
    instance
        .get_func(store, name)
        .ok_or_else(|| WasmError::MissingExports(vec![name]))?
        .typed::<P, R>(store)
        .map_err(|e| WasmError::Signature {
            name,
            message: e.to_string(),
        })
}

/// Call an export. Traps become [`AbiError::EngineCall`].
fn invoke<P: WasmParams, R: WasmResults>(
    store: &mut Store<HostState>,
    func: &TypedFunc<P, R>,
    name: &'static str,
    params: P,
) -> AbiResult<R> {
    func.call(store, params)
        .map_err(|e| AbiError::engine_call(name, e))
}

/// A compiled engine module instantiated in `wasmi`.
pub struct WasmEngine {
    store: Store<HostState>,
    memory: Memory,
    funcs: Exports,
}

impl WasmEngine {
    pub fn from_file(path: impl AsRef<Path>) -> WasmResult<Self> {
        let path = path.as_ref();
        let wasm = std::fs::read(path).map_err(|source| WasmError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&wasm)
    }

    /// Check the module's exports, link the host functions and instantiate.
    pub fn from_bytes(wasm: &[u8]) -> WasmResult<Self> {
        let missing = missing_exports(wasm)?;
        if !missing.is_empty() {
            return Err(WasmError::MissingExports(missing));
        }

        let engine = wasmi::Engine::default();
        let module = Module::new(&engine, wasm)?;
        let mut store = Store::new(&engine, HostState::default());
        let mut linker = <Linker<HostState>>::new(&engine);
        host::link(&mut linker)?;

        let instance = linker.instantiate(&mut store, &module)?.start(&mut store)?;
        let memory = instance
            .get_memory(&store, exports::MEMORY)
            .ok_or_else(|| WasmError::MissingExports(vec![exports::MEMORY]))?;
        let funcs = Exports::resolve(&instance, &store)?;
        debug!(
            "wasm engine: instantiated {} byte module, {} bytes of memory",
            wasm.len(),
            memory.data(&store).len()
        );
        Ok(Self {
            store,
            memory,
            funcs,
        })
    }

    /// Redirect what the engine prints.
    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.store.data_mut().out = Box::new(out);
        self
    }
}

impl LinearMemory for WasmEngine {
    fn size(&self) -> u32 {
        self.memory.data(&self.store).len() as u32
    }

    fn read(&self, offset: u32, buf: &mut [u8]) -> AbiResult<()> {
        let data = self.memory.data(&self.store);
        let range = check_bounds(data.len() as u32, offset, buf.len() as u32)?;
        buf.copy_from_slice(&data[range]);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> AbiResult<()> {
        let data = self.memory.data_mut(&mut self.store);
        let range = check_bounds(data.len() as u32, offset, bytes.len() as u32)?;
        data[range].copy_from_slice(bytes);
        Ok(())
    }

    fn allocate(&mut self, size: u32) -> AbiResult<u32> {
        let ptr = invoke(&mut self.store, &self.funcs.malloc, exports::MALLOC, size as i32)? as u32;
        if ptr == NULL {
            return Err(AbiError::ResourceExhausted { operation: "malloc" });
        }
        Ok(ptr)
    }

    fn free(&mut self, offset: u32) -> AbiResult<()> {
        invoke(&mut self.store, &self.funcs.free, exports::FREE, offset as i32)
    }
}

impl Engine for WasmEngine {
    fn version(&mut self) -> AbiResult<Option<u32>> {
        match &self.funcs.version {
            Some(func) => Ok(Some(invoke(&mut self.store, func, exports::VERSION, ())? as u32)),
            None => Ok(None),
        }
    }

    fn compiler_new(&mut self) -> AbiResult<RawHandle> {
        let handle = invoke(&mut self.store, &self.funcs.compiler_new, exports::COMPILER_NEW, ())?;
        Ok(handle as u32)
    }

    fn compiler_delete(&mut self, compiler: RawHandle) -> AbiResult<()> {
        invoke(
            &mut self.store,
            &self.funcs.compiler_delete,
            exports::COMPILER_DELETE,
            compiler as i32,
        )
    }

    fn compile_source(
        &mut self,
        compiler: RawHandle,
        file_name: u32,
        source: u32,
    ) -> AbiResult<RawHandle> {
        let module = invoke(
            &mut self.store,
            &self.funcs.compile_source,
            exports::COMPILER_COMPILE_SOURCE,
            (compiler as i32, file_name as i32, source as i32),
        )?;
        Ok(module as u32)
    }

    fn compiler_print_memory_usage(&mut self, compiler: RawHandle) -> AbiResult<()> {
        invoke(
            &mut self.store,
            &self.funcs.compiler_print_memory_usage,
            exports::COMPILER_PRINT_MEMORY_USAGE,
            compiler as i32,
        )
    }

    fn module_delete(&mut self, module: RawHandle) -> AbiResult<()> {
        invoke(
            &mut self.store,
            &self.funcs.module_delete,
            exports::MODULE_DELETE,
            module as i32,
        )
    }

    fn module_get_source(&mut self, module: RawHandle, out: u32) -> AbiResult<()> {
        invoke(
            &mut self.store,
            &self.funcs.module_get_source,
            exports::MODULE_GET_SOURCE,
            (module as i32, out as i32),
        )
    }

    fn module_num_errors(&mut self, module: RawHandle) -> AbiResult<u32> {
        let count = invoke(
            &mut self.store,
            &self.funcs.module_get_num_errors,
            exports::MODULE_GET_NUM_ERRORS,
            module as i32,
        )?;
        Ok(count as u32)
    }

    fn module_get_error(&mut self, module: RawHandle, index: u32, out: u32) -> AbiResult<()> {
        invoke(
            &mut self.store,
            &self.funcs.module_get_error,
            exports::MODULE_GET_ERROR,
            (module as i32, index as i32, out as i32),
        )
    }

    fn module_num_tokens(&mut self, module: RawHandle) -> AbiResult<u32> {
        let count = invoke(
            &mut self.store,
            &self.funcs.module_get_num_tokens,
            exports::MODULE_GET_NUM_TOKENS,
            module as i32,
        )?;
        Ok(count as u32)
    }

    fn module_get_token(&mut self, module: RawHandle, index: u32, out: u32) -> AbiResult<()> {
        invoke(
            &mut self.store,
            &self.funcs.module_get_token,
            exports::MODULE_GET_TOKEN,
            (module as i32, index as i32, out as i32),
        )
    }

    fn module_print_errors(&mut self, module: RawHandle) -> AbiResult<()> {
        invoke(
            &mut self.store,
            &self.funcs.module_print_errors,
            exports::MODULE_PRINT_ERRORS,
            module as i32,
        )
    }

    fn module_print_tokens(&mut self, module: RawHandle) -> AbiResult<()> {
        invoke(
            &mut self.store,
            &self.funcs.module_print_tokens,
            exports::MODULE_PRINT_TOKENS,
            module as i32,
        )
    }

    fn module_print_ast(&mut self, module: RawHandle) -> AbiResult<()> {
        invoke(
            &mut self.store,
            &self.funcs.module_print_ast,
            exports::MODULE_PRINT_AST,
            module as i32,
        )
    }
}
