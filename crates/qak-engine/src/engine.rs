//! [`ReferenceEngine`]: the engine entry points, implemented in process.
//!
//! Compiler and module handles are addresses of heap blocks, so every live
//! object shows up in the heap's allocation list. A module handle points at
//! the module's source record; tokens and diagnostics are kept host side as
//! raw records whose strings live in the heap.

use std::collections::{BTreeSet, HashMap};
use std::io::{self, Write};

use log::{debug, warn};
use qak_abi::layout;
use qak_abi::raw::{RawDiagnostic, RawSource, RawSpan, RawString, RawToken};
use qak_abi::{exports, AbiError, AbiResult, Engine, LinearMemory, RawHandle, Utf8Policy, ABI_VERSION, NULL};
use qak_lexer::tokenize;
use qak_parser::{parse, print_module};
use qak_types::{ast, SourceFile, SourceRange};

use crate::config::EngineConfig;
use crate::heap::Heap;
use crate::report;

/// Size of a compiler object.
const COMPILER_SIZE: u32 = 8;

struct ModuleObject {
    handle: RawHandle,
    compiler: RawHandle,
    source: RawSource,
    tokens: Vec<RawToken>,
    errors: Vec<RawDiagnostic>,
    ast: Option<ast::Module>,
    /// Heap blocks owned by the module, its handle block included.
    blocks: Vec<u32>,
}

/// The Qak engine, running against a [`Heap`] in this process.
pub struct ReferenceEngine {
    heap: Heap,
    out: Box<dyn Write + Send>,
    compilers: BTreeSet<RawHandle>,
    modules: HashMap<RawHandle, ModuleObject>,
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// An engine that prints to stdout.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            heap: Heap::new(config.memory_limit),
            out: Box::new(io::stdout()),
            compilers: BTreeSet::new(),
            modules: HashMap::new(),
        }
    }

    /// Redirect the print entry points.
    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn live_compilers(&self) -> usize {
        self.compilers.len()
    }

    pub fn live_modules(&self) -> usize {
        self.modules.len()
    }

    // ── Handle Checks ─────────────────────────────────────────────────────

    fn check_compiler(&self, function: &'static str, compiler: RawHandle) -> AbiResult<()> {
        if self.compilers.contains(&compiler) {
            Ok(())
        } else {
            Err(AbiError::engine_call(
                function,
                format!("{compiler:#x} is not a compiler"),
            ))
        }
    }

    fn module(&self, function: &'static str, module: RawHandle) -> AbiResult<&ModuleObject> {
        self.modules
            .get(&module)
            .ok_or_else(|| AbiError::engine_call(function, format!("{module:#x} is not a module")))
    }

    fn c_string(&self, function: &'static str, what: &str, ptr: u32) -> AbiResult<String> {
        let bytes = self
            .heap
            .c_str(ptr)
            .ok_or_else(|| AbiError::engine_call(function, format!("{what} at {ptr:#x} is not terminated")))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| AbiError::engine_call(function, format!("{what} is not UTF-8: {e}")))
    }

    // ── Compilation ───────────────────────────────────────────────────────

    /// Copy `bytes` into a fresh heap block owned by the module being built.
    fn store(&mut self, blocks: &mut Vec<u32>, bytes: &[u8]) -> AbiResult<RawString> {
        let len = bytes.len() as u32;
        let ptr = self.heap.allocate(len)?;
        blocks.push(ptr);
        self.heap.write(ptr, bytes)?;
        Ok(RawString::new(ptr, len))
    }

    fn build_module(
        &mut self,
        compiler: RawHandle,
        file_name: &str,
        text: &str,
        blocks: &mut Vec<u32>,
    ) -> AbiResult<ModuleObject> {
        let file_name = self.store(blocks, file_name.as_bytes())?;
        let data = self.store(blocks, text.as_bytes())?;
        let span = |range: SourceRange| RawSpan::new(data.slice(range.start, range.end), range);

        let lexed = tokenize(text);
        let tokens = lexed
            .tokens
            .iter()
            .map(|t| RawToken {
                kind: t.kind.as_raw(),
                span: span(t.range),
            })
            .collect();
        let (syntax_errors, ast) = if lexed.has_errors() {
            (lexed.errors, None)
        } else {
            let parsed = parse(text, &lexed.tokens);
            (parsed.errors, parsed.module)
        };

        let mut errors = Vec::with_capacity(syntax_errors.len());
        for error in &syntax_errors {
            let message = self.store(blocks, error.message.as_bytes())?;
            errors.push(RawDiagnostic {
                message,
                span: span(error.range),
            });
        }

        let source = RawSource { data, file_name };
        let handle = self.heap.allocate(layout::source::LAYOUT.size)?;
        blocks.push(handle);
        source.write(&mut self.heap, handle)?;

        Ok(ModuleObject {
            handle,
            compiler,
            source,
            tokens,
            errors,
            ast,
            blocks: std::mem::take(blocks),
        })
    }

    fn destroy_module(&mut self, object: ModuleObject) {
        for block in object.blocks {
            self.heap.dealloc(block);
        }
    }

    // ── Printing ──────────────────────────────────────────────────────────

    fn emit(&mut self, function: &'static str, text: &str) -> AbiResult<()> {
        self.out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| AbiError::engine_call(function, e))
    }

    fn source_file(&self, object: &ModuleObject) -> AbiResult<SourceFile> {
        let name = object.source.file_name.fetch(&self.heap, Utf8Policy::Replace)?;
        let text = object.source.data.fetch(&self.heap, Utf8Policy::Replace)?;
        Ok(SourceFile::new(name, text))
    }
}

impl LinearMemory for ReferenceEngine {
    fn size(&self) -> u32 {
        self.heap.size()
    }

    fn read(&self, offset: u32, buf: &mut [u8]) -> AbiResult<()> {
        self.heap.read(offset, buf)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> AbiResult<()> {
        self.heap.write(offset, bytes)
    }

    fn allocate(&mut self, size: u32) -> AbiResult<u32> {
        self.heap.allocate(size)
    }

    fn free(&mut self, offset: u32) -> AbiResult<()> {
        self.heap.free(offset)
    }
}

impl Engine for ReferenceEngine {
    fn version(&mut self) -> AbiResult<Option<u32>> {
        Ok(Some(ABI_VERSION))
    }

    fn compiler_new(&mut self) -> AbiResult<RawHandle> {
        let Some(compiler) = self.heap.alloc(COMPILER_SIZE) else {
            return Ok(NULL);
        };
        self.compilers.insert(compiler);
        debug!("reference engine: compiler {compiler:#x} created");
        Ok(compiler)
    }

    fn compiler_delete(&mut self, compiler: RawHandle) -> AbiResult<()> {
        self.check_compiler(exports::COMPILER_DELETE, compiler)?;
        let mut owned: Vec<RawHandle> = self
            .modules
            .iter()
            .filter(|(_, object)| object.compiler == compiler)
            .map(|(&handle, _)| handle)
            .collect();
        owned.sort_unstable();
        for handle in owned {
            if let Some(object) = self.modules.remove(&handle) {
                debug!("reference engine: compiler {compiler:#x} frees module {handle:#x}");
                self.destroy_module(object);
            }
        }
        self.compilers.remove(&compiler);
        self.heap.dealloc(compiler);
        debug!("reference engine: compiler {compiler:#x} deleted");
        Ok(())
    }

    fn compile_source(
        &mut self,
        compiler: RawHandle,
        file_name: u32,
        source: u32,
    ) -> AbiResult<RawHandle> {
        const F: &str = exports::COMPILER_COMPILE_SOURCE;
        self.check_compiler(F, compiler)?;
        let name = self.c_string(F, "file name", file_name)?;
        let text = self.c_string(F, "source", source)?;

        let mut blocks = Vec::new();
        match self.build_module(compiler, &name, &text, &mut blocks) {
            Ok(object) => {
                let handle = object.handle;
                debug!(
                    "reference engine: {name:?} -> module {handle:#x} ({} tokens, {} errors)",
                    object.tokens.len(),
                    object.errors.len()
                );
                self.modules.insert(handle, object);
                Ok(handle)
            }
            Err(e) => {
                for block in blocks {
                    self.heap.dealloc(block);
                }
                match e {
                    AbiError::ResourceExhausted { .. } => {
                        warn!("reference engine: out of memory compiling {name:?}");
                        Ok(NULL)
                    }
                    other => Err(other),
                }
            }
        }
    }

    fn compiler_print_memory_usage(&mut self, compiler: RawHandle) -> AbiResult<()> {
        const F: &str = exports::COMPILER_PRINT_MEMORY_USAGE;
        self.check_compiler(F, compiler)?;
        let text = report::format_memory_usage(&self.heap);
        self.emit(F, &text)
    }

    fn module_delete(&mut self, module: RawHandle) -> AbiResult<()> {
        let object = self.modules.remove(&module).ok_or_else(|| {
            AbiError::engine_call(exports::MODULE_DELETE, format!("{module:#x} is not a module"))
        })?;
        self.destroy_module(object);
        debug!("reference engine: module {module:#x} deleted");
        Ok(())
    }

    fn module_get_source(&mut self, module: RawHandle, out: u32) -> AbiResult<()> {
        let source = self.module(exports::MODULE_GET_SOURCE, module)?.source;
        source.write(&mut self.heap, out)
    }

    fn module_num_errors(&mut self, module: RawHandle) -> AbiResult<u32> {
        Ok(self.module(exports::MODULE_GET_NUM_ERRORS, module)?.errors.len() as u32)
    }

    fn module_get_error(&mut self, module: RawHandle, index: u32, out: u32) -> AbiResult<()> {
        const F: &str = exports::MODULE_GET_ERROR;
        let error = self
            .module(F, module)?
            .errors
            .get(index as usize)
            .copied()
            .ok_or_else(|| AbiError::engine_call(F, format!("no error at index {index}")))?;
        error.write(&mut self.heap, out)
    }

    fn module_num_tokens(&mut self, module: RawHandle) -> AbiResult<u32> {
        Ok(self.module(exports::MODULE_GET_NUM_TOKENS, module)?.tokens.len() as u32)
    }

    fn module_get_token(&mut self, module: RawHandle, index: u32, out: u32) -> AbiResult<()> {
        const F: &str = exports::MODULE_GET_TOKEN;
        let token = self
            .module(F, module)?
            .tokens
            .get(index as usize)
            .copied()
            .ok_or_else(|| AbiError::engine_call(F, format!("no token at index {index}")))?;
        token.write(&mut self.heap, out)
    }

    fn module_print_errors(&mut self, module: RawHandle) -> AbiResult<()> {
        const F: &str = exports::MODULE_PRINT_ERRORS;
        let object = self.module(F, module)?;
        let file = self.source_file(object)?;
        let errors = object
            .errors
            .iter()
            .map(|e| Ok((e.message.fetch(&self.heap, Utf8Policy::Replace)?, e.span.range())))
            .collect::<AbiResult<Vec<_>>>()?;
        let text = report::format_errors(&file, &errors);
        self.emit(F, &text)
    }

    fn module_print_tokens(&mut self, module: RawHandle) -> AbiResult<()> {
        const F: &str = exports::MODULE_PRINT_TOKENS;
        let object = self.module(F, module)?;
        let file = self.source_file(object)?;
        let text = report::format_tokens(
            &file.text,
            object.tokens.iter().map(|t| (t.kind, t.span.range())),
        );
        self.emit(F, &text)
    }

    fn module_print_ast(&mut self, module: RawHandle) -> AbiResult<()> {
        const F: &str = exports::MODULE_PRINT_AST;
        let Some(tree) = self.module(F, module)?.ast.as_ref().map(print_module) else {
            return Ok(());
        };
        self.emit(F, &tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SharedBuffer;

    fn compile(engine: &mut ReferenceEngine, compiler: RawHandle, name: &str, text: &str) -> RawHandle {
        let name_ptr = engine.heap.alloc(name.len() as u32 + 1).unwrap();
        engine.heap.write(name_ptr, &[name.as_bytes(), b"\0"].concat()).unwrap();
        let text_ptr = engine.heap.alloc(text.len() as u32 + 1).unwrap();
        engine.heap.write(text_ptr, &[text.as_bytes(), b"\0"].concat()).unwrap();
        let module = engine.compile_source(compiler, name_ptr, text_ptr).unwrap();
        engine.heap.dealloc(name_ptr);
        engine.heap.dealloc(text_ptr);
        module
    }

    #[test]
    fn test_handles_are_heap_blocks() {
        let mut engine = ReferenceEngine::new();
        let compiler = engine.compiler_new().unwrap();
        assert!(engine.heap().is_live(compiler));
        let module = compile(&mut engine, compiler, "a.qak", "x = 1");
        assert!(engine.heap().is_live(module));
        assert_eq!(engine.live_modules(), 1);
    }

    #[test]
    fn test_module_handle_points_at_source_record() {
        let mut engine = ReferenceEngine::new();
        let compiler = engine.compiler_new().unwrap();
        let module = compile(&mut engine, compiler, "a.qak", "x = 1");
        let record = RawSource::read(&engine, module).unwrap();
        assert_eq!(record.data.len, 5);
        assert_eq!(record.file_name.fetch(&engine, Utf8Policy::Reject).unwrap(), "a.qak");
    }

    #[test]
    fn test_token_span_text_points_into_source() {
        let mut engine = ReferenceEngine::new();
        let compiler = engine.compiler_new().unwrap();
        let module = compile(&mut engine, compiler, "a.qak", "foo = 12");
        let out = engine.heap.alloc(layout::token::LAYOUT.size).unwrap();
        engine.module_get_token(module, 2, out).unwrap();
        let token = RawToken::read(&engine, out).unwrap();
        let source = RawSource::read(&engine, module).unwrap();
        assert_eq!(token.span.text.ptr, source.data.ptr + 6);
        assert_eq!(token.span.text.fetch(&engine, Utf8Policy::Reject).unwrap(), "12");
    }

    #[test]
    fn test_lex_error_skips_parsing() {
        let mut engine = ReferenceEngine::new();
        let compiler = engine.compiler_new().unwrap();
        let module = compile(&mut engine, compiler, "a.qak", "x = \"open");
        assert_eq!(engine.module_num_errors(module).unwrap(), 1);
        assert!(engine.modules[&module].ast.is_none());
    }

    #[test]
    fn test_unknown_handles_are_engine_errors() {
        let mut engine = ReferenceEngine::new();
        assert!(matches!(
            engine.module_num_tokens(1234),
            Err(AbiError::EngineCall { function: "qak_module_get_num_tokens", .. })
        ));
        assert!(engine.compiler_delete(8).is_err());
        assert!(engine.module_delete(8).is_err());
    }

    #[test]
    fn test_index_out_of_range() {
        let mut engine = ReferenceEngine::new();
        let compiler = engine.compiler_new().unwrap();
        let module = compile(&mut engine, compiler, "a.qak", "x");
        let out = engine.heap.alloc(32).unwrap();
        assert!(engine.module_get_token(module, 1, out).is_err());
        assert!(engine.module_get_error(module, 0, out).is_err());
    }

    #[test]
    fn test_compiler_delete_frees_everything() {
        let mut engine = ReferenceEngine::new();
        let compiler = engine.compiler_new().unwrap();
        compile(&mut engine, compiler, "a.qak", "x = 1");
        compile(&mut engine, compiler, "b.qak", "y = ");
        engine.compiler_delete(compiler).unwrap();
        assert_eq!(engine.live_modules(), 0);
        assert_eq!(engine.heap().stats().live_allocations, 0);
    }

    #[test]
    fn test_out_of_memory_returns_null_and_cleans_up() {
        let mut engine = ReferenceEngine::with_config(EngineConfig { memory_limit: 96 });
        let compiler = engine.compiler_new().unwrap();
        let before = engine.heap().stats().live_allocations;
        let module = compile(&mut engine, compiler, "a.qak", "some_long_identifier = 42");
        assert_eq!(module, NULL);
        assert_eq!(engine.heap().stats().live_allocations, before);
    }

    #[test]
    fn test_print_ast() {
        let buffer = SharedBuffer::new();
        let mut engine = ReferenceEngine::new().with_output(buffer.clone());
        let compiler = engine.compiler_new().unwrap();
        let module = compile(&mut engine, compiler, "a.qak", "x = 1");
        engine.module_print_ast(module).unwrap();
        assert!(buffer.contents().starts_with("Module\n  Assignment:"));
    }
}
