//! Compiler session: one engine, one compiler handle, the modules it made.
//!
//! A [`Session`] owns its engine. It creates the compiler on construction,
//! hands out [`ModuleHandle`] capabilities for compiled modules, and
//! destroys whatever is left when it is closed or dropped. Raw engine
//! handles never leave this module, so a deleted or foreign handle is caught
//! here before the engine is called.

use std::collections::HashMap;
use std::marker::PhantomData;

use log::{debug, error, trace, warn};
use qak_types::{Diagnostic, Source, Token};
use serde::Serialize;

use crate::config::{SessionConfig, Utf8Policy};
use crate::decode::Record;
use crate::engine::{Engine, RawHandle};
use crate::error::{AbiError, AbiResult};
use crate::handle::{next_session_id, ModuleHandle};
use crate::layout::ABI_VERSION;
use crate::memory::NULL;
use crate::scratch::{NativeStrings, ScratchBuffer};

// ══════════════════════════════════════════════════════════════════════════
// Enumerable records
// ══════════════════════════════════════════════════════════════════════════

/// A record type the engine exposes as an indexed list per module.
pub trait Enumerable: Record {
    /// Noun used in log lines.
    const WHAT: &'static str;

    fn count<E: Engine + ?Sized>(engine: &mut E, module: RawHandle) -> AbiResult<u32>;

    /// Ask the engine to write element `index` to `out`.
    fn fetch<E: Engine + ?Sized>(
        engine: &mut E,
        module: RawHandle,
        index: u32,
        out: u32,
    ) -> AbiResult<()>;
}

impl Enumerable for Token {
    const WHAT: &'static str = "tokens";

    fn count<E: Engine + ?Sized>(engine: &mut E, module: RawHandle) -> AbiResult<u32> {
        engine.module_num_tokens(module)
    }

    fn fetch<E: Engine + ?Sized>(
        engine: &mut E,
        module: RawHandle,
        index: u32,
        out: u32,
    ) -> AbiResult<()> {
        engine.module_get_token(module, index, out)
    }
}

impl Enumerable for Diagnostic {
    const WHAT: &'static str = "diagnostics";

    fn count<E: Engine + ?Sized>(engine: &mut E, module: RawHandle) -> AbiResult<u32> {
        engine.module_num_errors(module)
    }

    fn fetch<E: Engine + ?Sized>(
        engine: &mut E,
        module: RawHandle,
        index: u32,
        out: u32,
    ) -> AbiResult<()> {
        engine.module_get_error(module, index, out)
    }
}

/// Lazy enumeration of a module's tokens or diagnostics.
///
/// Holds one scratch buffer for its whole life and reuses it for every
/// element. The buffer is freed when the iterator is dropped, whether or not
/// it ran to the end. After the first error the iterator is fused.
pub struct RecordIter<'s, E: Engine, R: Enumerable> {
    scratch: ScratchBuffer<'s, E>,
    module: RawHandle,
    index: u32,
    count: u32,
    policy: Utf8Policy,
    failed: bool,
    _record: PhantomData<fn() -> R>,
}

impl<E: Engine, R: Enumerable> RecordIter<'_, E, R> {
    /// Number of elements the engine reported when the iterator was created.
    pub fn count_hint(&self) -> u32 {
        self.count
    }

    fn next_record(&mut self) -> AbiResult<R> {
        let out = self.scratch.offset();
        self.scratch.clear()?;
        R::fetch(self.scratch.memory(), self.module, self.index, out)?;
        R::decode(self.scratch.memory_ref(), out, self.policy)
    }
}

impl<E: Engine, R: Enumerable> Iterator for RecordIter<'_, E, R> {
    type Item = AbiResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.index >= self.count {
            return None;
        }
        let result = self.next_record();
        trace!("{}: decoded index {} of {}", R::WHAT, self.index, self.count);
        self.index += 1;
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        // A failed decode ends the iteration early, so only the next item is
        // guaranteed.
        let remaining = (self.count - self.index) as usize;
        (usize::from(remaining > 0), Some(remaining))
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Session
// ══════════════════════════════════════════════════════════════════════════

/// Everything the boundary layer can read back about one module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSnapshot {
    pub handle: ModuleHandle,
    pub source: Source,
    pub has_errors: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub tokens: Vec<Token>,
}

/// An open compiler on an engine.
pub struct Session<E: Engine> {
    engine: E,
    config: SessionConfig,
    id: u64,
    compiler: Option<RawHandle>,
    engine_version: Option<u32>,
    modules: HashMap<ModuleHandle, RawHandle>,
    next_serial: u64,
}

impl<E: Engine> Session<E> {
    /// Open a session with the default configuration.
    pub fn new(engine: E) -> AbiResult<Self> {
        Self::with_config(engine, SessionConfig::default())
    }

    /// Open a session: check the engine's ABI version, then create its
    /// compiler.
    pub fn with_config(mut engine: E, config: SessionConfig) -> AbiResult<Self> {
        let engine_version = engine.version()?;
        if let Some(found) = engine_version {
            if config.check_abi_version && found != ABI_VERSION {
                return Err(AbiError::AbiVersionMismatch {
                    expected: ABI_VERSION,
                    found,
                });
            }
        }

        let compiler = engine.compiler_new()?;
        if compiler == NULL {
            return Err(AbiError::ResourceExhausted {
                operation: "compiler_new",
            });
        }

        let id = next_session_id();
        debug!(
            "session {id}: compiler {compiler:#x} created (engine version {})",
            engine_version.map_or_else(|| "unknown".to_string(), |v| v.to_string())
        );
        Ok(Self {
            engine,
            config,
            id,
            compiler: Some(compiler),
            engine_version,
            modules: HashMap::new(),
            next_serial: 1,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Version the engine reported when the session opened.
    pub fn engine_version(&self) -> Option<u32> {
        self.engine_version
    }

    pub fn is_closed(&self) -> bool {
        self.compiler.is_none()
    }

    /// Handles of all modules not yet deleted, oldest first.
    pub fn live_modules(&self) -> Vec<ModuleHandle> {
        let mut handles: Vec<_> = self.modules.keys().copied().collect();
        handles.sort();
        handles
    }

    pub fn is_live(&self, handle: ModuleHandle) -> bool {
        self.modules.contains_key(&handle)
    }

    // ── compilation ──────────────────────────────────────────────────────

    /// Compile `text` as the file `file_name`.
    ///
    /// A module with diagnostics is still a module; check
    /// [`has_errors`](Self::has_errors).
    pub fn compile_source(&mut self, file_name: &str, text: &str) -> AbiResult<ModuleHandle> {
        let compiler = self.compiler()?;

        let mut strings = NativeStrings::new(&mut self.engine);
        let name_ptr = strings.push("file name", file_name)?;
        let text_ptr = strings.push("source text", text)?;
        let raw = strings.memory().compile_source(compiler, name_ptr, text_ptr);
        let released = strings.release();

        let raw = raw?;
        if raw == NULL {
            released?;
            return Err(AbiError::ResourceExhausted {
                operation: "compile_source",
            });
        }

        let handle = ModuleHandle::new(self.id, self.next_serial);
        self.next_serial += 1;
        self.modules.insert(handle, raw);
        debug!(
            "session {}: compiled {file_name:?} ({} bytes) as {handle}",
            self.id,
            text.len()
        );
        released?;
        Ok(handle)
    }

    /// Destroy a module. The handle is dead afterwards, even if the engine
    /// call fails.
    pub fn delete_module(&mut self, handle: ModuleHandle) -> AbiResult<()> {
        let raw = self.resolve(handle)?;
        self.modules.remove(&handle);
        debug!("session {}: deleting {handle}", self.id);
        self.engine.module_delete(raw)
    }

    // ── queries ──────────────────────────────────────────────────────────

    /// Read back the module's source text and file name.
    pub fn get_source(&mut self, handle: ModuleHandle) -> AbiResult<Source> {
        let raw = self.resolve(handle)?;
        let policy = self.config.utf8_policy;
        let mut scratch = ScratchBuffer::acquire(&mut self.engine, &Source::LAYOUT)?;
        let out = scratch.offset();
        scratch.memory().module_get_source(raw, out)?;
        let source = Source::decode(scratch.memory_ref(), out, policy)?;
        scratch.release()?;
        Ok(source)
    }

    pub fn diagnostic_count(&mut self, handle: ModuleHandle) -> AbiResult<u32> {
        let raw = self.resolve(handle)?;
        Diagnostic::count(&mut self.engine, raw)
    }

    pub fn token_count(&mut self, handle: ModuleHandle) -> AbiResult<u32> {
        let raw = self.resolve(handle)?;
        Token::count(&mut self.engine, raw)
    }

    /// Whether the module has at least one diagnostic.
    pub fn has_errors(&mut self, handle: ModuleHandle) -> AbiResult<bool> {
        Ok(self.diagnostic_count(handle)? > 0)
    }

    /// Lazily enumerate the module's diagnostics in engine order.
    pub fn diagnostics(
        &mut self,
        handle: ModuleHandle,
    ) -> AbiResult<RecordIter<'_, E, Diagnostic>> {
        self.records(handle)
    }

    /// Lazily enumerate the module's tokens in engine order.
    pub fn tokens(&mut self, handle: ModuleHandle) -> AbiResult<RecordIter<'_, E, Token>> {
        self.records(handle)
    }

    pub fn get_diagnostics(&mut self, handle: ModuleHandle) -> AbiResult<Vec<Diagnostic>> {
        self.diagnostics(handle)?.collect()
    }

    pub fn get_tokens(&mut self, handle: ModuleHandle) -> AbiResult<Vec<Token>> {
        self.tokens(handle)?.collect()
    }

    /// Source, diagnostics and tokens of a module in one value.
    pub fn snapshot(&mut self, handle: ModuleHandle) -> AbiResult<ModuleSnapshot> {
        let source = self.get_source(handle)?;
        let diagnostics = self.get_diagnostics(handle)?;
        let tokens = self.get_tokens(handle)?;
        Ok(ModuleSnapshot {
            handle,
            source,
            has_errors: !diagnostics.is_empty(),
            diagnostics,
            tokens,
        })
    }

    fn records<R: Enumerable>(&mut self, handle: ModuleHandle) -> AbiResult<RecordIter<'_, E, R>> {
        let raw = self.resolve(handle)?;
        let count = R::count(&mut self.engine, raw)?;
        debug!("session {}: enumerating {count} {} of {handle}", self.id, R::WHAT);
        let scratch = ScratchBuffer::acquire(&mut self.engine, &R::LAYOUT)?;
        Ok(RecordIter {
            scratch,
            module: raw,
            index: 0,
            count,
            policy: self.config.utf8_policy,
            failed: false,
            _record: PhantomData,
        })
    }

    // ── engine-side printers ─────────────────────────────────────────────

    pub fn print_diagnostics(&mut self, handle: ModuleHandle) -> AbiResult<()> {
        let raw = self.resolve(handle)?;
        self.engine.module_print_errors(raw)
    }

    pub fn print_tokens(&mut self, handle: ModuleHandle) -> AbiResult<()> {
        let raw = self.resolve(handle)?;
        self.engine.module_print_tokens(raw)
    }

    pub fn print_syntax_tree(&mut self, handle: ModuleHandle) -> AbiResult<()> {
        let raw = self.resolve(handle)?;
        self.engine.module_print_ast(raw)
    }

    pub fn report_memory_usage(&mut self) -> AbiResult<()> {
        let compiler = self.compiler()?;
        self.engine.compiler_print_memory_usage(compiler)
    }

    // ── teardown ─────────────────────────────────────────────────────────

    /// Destroy remaining modules (unless configured otherwise) and the
    /// compiler. Calling it again is a no-op.
    ///
    /// Every release is attempted; the first failure is returned.
    pub fn close(&mut self) -> AbiResult<()> {
        let Some(compiler) = self.compiler.take() else {
            return Ok(());
        };
        let mut first_error = None;

        let mut leftover: Vec<_> = self.modules.drain().collect();
        leftover.sort();
        if !leftover.is_empty() {
            if self.config.release_modules_on_close {
                warn!(
                    "session {}: releasing {} module(s) still live at close",
                    self.id,
                    leftover.len()
                );
                for (handle, raw) in leftover {
                    trace!("session {}: releasing {handle}", self.id);
                    if let Err(e) = self.engine.module_delete(raw) {
                        first_error.get_or_insert(e);
                    }
                }
            } else {
                warn!(
                    "session {}: abandoning {} live module(s) at close",
                    self.id,
                    leftover.len()
                );
            }
        }

        if let Err(e) = self.engine.compiler_delete(compiler) {
            first_error.get_or_insert(e);
        }
        debug!("session {}: closed", self.id);
        first_error.map_or(Ok(()), Err)
    }

    fn compiler(&self) -> AbiResult<RawHandle> {
        self.compiler.ok_or(AbiError::SessionClosed)
    }

    fn resolve(&self, handle: ModuleHandle) -> AbiResult<RawHandle> {
        self.compiler()?;
        self.modules
            .get(&handle)
            .copied()
            .ok_or(AbiError::StaleModule(handle))
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("session {}: error while closing: {e}", self.id);
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::testing::TestMemory;
    use crate::memory::LinearMemory;
    use crate::raw::{RawDiagnostic, RawSource, RawSpan, RawString, RawToken};
    use qak_types::SourceRange;

    struct FakeModule {
        name: RawString,
        text: RawString,
        words: Vec<(u32, u32)>,
        errors: Vec<(RawString, u32)>,
    }

    /// Splits its input on spaces into identifier tokens. Input ending in
    /// `=` gets one diagnostic.
    struct FakeEngine {
        mem: TestMemory,
        version: Option<u32>,
        next_handle: u32,
        compilers: Vec<u32>,
        modules: HashMap<u32, FakeModule>,
        calls: Vec<&'static str>,
        null_compile: bool,
        inverted_spans: bool,
        silent_tokens: bool,
    }

    impl FakeEngine {
        fn new() -> Self {
            Self {
                mem: TestMemory::new(64 * 1024),
                version: Some(ABI_VERSION),
                next_handle: 0x100,
                compilers: Vec::new(),
                modules: HashMap::new(),
                calls: Vec::new(),
                null_compile: false,
                inverted_spans: false,
                silent_tokens: false,
            }
        }

        fn read_c_string(&self, ptr: u32) -> Vec<u8> {
            let start = ptr as usize;
            let len = self.mem.bytes[start..].iter().position(|&b| b == 0).unwrap();
            self.mem.bytes[start..start + len].to_vec()
        }

        fn copy_in(&mut self, bytes: &[u8]) -> RawString {
            let ptr = self.mem.allocate(bytes.len() as u32).unwrap();
            self.mem.write(ptr, bytes).unwrap();
            RawString::new(ptr, bytes.len() as u32)
        }

        fn module(&self, module: RawHandle) -> AbiResult<&FakeModule> {
            self.modules
                .get(&module)
                .ok_or_else(|| AbiError::engine_call("module", "bad handle"))
        }
    }

    impl LinearMemory for FakeEngine {
        fn size(&self) -> u32 {
            self.mem.size()
        }
        fn read(&self, offset: u32, buf: &mut [u8]) -> AbiResult<()> {
            self.mem.read(offset, buf)
        }
        fn write(&mut self, offset: u32, bytes: &[u8]) -> AbiResult<()> {
            self.mem.write(offset, bytes)
        }
        fn allocate(&mut self, size: u32) -> AbiResult<u32> {
            self.mem.allocate(size)
        }
        fn free(&mut self, offset: u32) -> AbiResult<()> {
            self.mem.free(offset)
        }
    }

    impl Engine for FakeEngine {
        fn version(&mut self) -> AbiResult<Option<u32>> {
            Ok(self.version)
        }

        fn compiler_new(&mut self) -> AbiResult<RawHandle> {
            self.calls.push("compiler_new");
            self.next_handle += 4;
            self.compilers.push(self.next_handle);
            Ok(self.next_handle)
        }

        fn compiler_delete(&mut self, compiler: RawHandle) -> AbiResult<()> {
            self.calls.push("compiler_delete");
            self.compilers.retain(|&c| c != compiler);
            Ok(())
        }

        fn compile_source(&mut self, _: RawHandle, file_name: u32, source: u32) -> AbiResult<RawHandle> {
            self.calls.push("compile_source");
            if self.null_compile {
                return Ok(NULL);
            }
            let name_bytes = self.read_c_string(file_name);
            let text_bytes = self.read_c_string(source);
            let name = self.copy_in(&name_bytes);
            let text = self.copy_in(&text_bytes);

            let mut words = Vec::new();
            let mut start = None;
            for (i, &b) in text_bytes.iter().chain(std::iter::once(&b' ')).enumerate() {
                match (b == b' ', start) {
                    (false, None) => start = Some(i as u32),
                    (true, Some(s)) => {
                        words.push((s, i as u32));
                        start = None;
                    }
                    _ => {}
                }
            }
            let mut errors = Vec::new();
            if text_bytes.last() == Some(&b'=') {
                let message = self.copy_in(b"dangling =");
                errors.push((message, text_bytes.len() as u32));
            }

            self.next_handle += 4;
            self.modules.insert(self.next_handle, FakeModule { name, text, words, errors });
            Ok(self.next_handle)
        }

        fn compiler_print_memory_usage(&mut self, _: RawHandle) -> AbiResult<()> {
            self.calls.push("print_memory_usage");
            Ok(())
        }

        fn module_delete(&mut self, module: RawHandle) -> AbiResult<()> {
            self.calls.push("module_delete");
            let m = self
                .modules
                .remove(&module)
                .ok_or_else(|| AbiError::engine_call("module_delete", "double free"))?;
            self.mem.free(m.name.ptr)?;
            self.mem.free(m.text.ptr)?;
            for (message, _) in m.errors {
                self.mem.free(message.ptr)?;
            }
            Ok(())
        }

        fn module_get_source(&mut self, module: RawHandle, out: u32) -> AbiResult<()> {
            let m = self.module(module)?;
            let record = RawSource {
                data: m.text,
                file_name: m.name,
            };
            record.write(&mut self.mem, out)
        }

        fn module_num_errors(&mut self, module: RawHandle) -> AbiResult<u32> {
            Ok(self.module(module)?.errors.len() as u32)
        }

        fn module_get_error(&mut self, module: RawHandle, index: u32, out: u32) -> AbiResult<()> {
            let m = self.module(module)?;
            let (message, at) = m.errors[index as usize];
            let record = RawDiagnostic {
                message,
                span: RawSpan::new(m.text.slice(at, at), SourceRange::point(at, 1)),
            };
            record.write(&mut self.mem, out)
        }

        fn module_num_tokens(&mut self, module: RawHandle) -> AbiResult<u32> {
            Ok(self.module(module)?.words.len() as u32)
        }

        fn module_get_token(&mut self, module: RawHandle, index: u32, out: u32) -> AbiResult<()> {
            if self.silent_tokens && index > 0 {
                return Ok(());
            }
            let m = self.module(module)?;
            let (start, end) = m.words[index as usize];
            let range = if self.inverted_spans && index == 1 {
                SourceRange::new(end, start, 1, 1)
            } else {
                SourceRange::new(start, end, 1, 1)
            };
            let record = RawToken {
                kind: 38,
                span: RawSpan::new(m.text.slice(start, end), range),
            };
            record.write(&mut self.mem, out)
        }

        fn module_print_errors(&mut self, _: RawHandle) -> AbiResult<()> {
            self.calls.push("print_errors");
            Ok(())
        }

        fn module_print_tokens(&mut self, _: RawHandle) -> AbiResult<()> {
            self.calls.push("print_tokens");
            Ok(())
        }

        fn module_print_ast(&mut self, _: RawHandle) -> AbiResult<()> {
            self.calls.push("print_ast");
            Ok(())
        }
    }

    // ── construction ─────────────────────────────────────────────────────

    #[test]
    fn test_new_creates_compiler() {
        let session = Session::new(FakeEngine::new()).unwrap();
        assert_eq!(session.engine().calls, vec!["compiler_new"]);
        assert_eq!(session.engine_version(), Some(ABI_VERSION));
        assert!(!session.is_closed());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut engine = FakeEngine::new();
        engine.version = Some(ABI_VERSION + 1);
        let err = Session::new(engine).err().unwrap();
        assert!(matches!(err, AbiError::AbiVersionMismatch { found: 2, .. }));
    }

    #[test]
    fn test_version_check_can_be_disabled() {
        let mut engine = FakeEngine::new();
        engine.version = Some(7);
        let config = SessionConfig {
            check_abi_version: false,
            ..SessionConfig::default()
        };
        let session = Session::with_config(engine, config).unwrap();
        assert_eq!(session.engine_version(), Some(7));
    }

    #[test]
    fn test_unversioned_engine_accepted() {
        let mut engine = FakeEngine::new();
        engine.version = None;
        assert!(Session::new(engine).is_ok());
    }

    // ── compile and query ────────────────────────────────────────────────

    #[test]
    fn test_compile_round_trips_source() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let module = session.compile_source("main.qak", "x = 1").unwrap();
        let source = session.get_source(module).unwrap();
        assert_eq!(source, Source::new("main.qak", "x = 1"));
    }

    #[test]
    fn test_compile_frees_input_strings() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let module = session.compile_source("a.qak", "a b").unwrap();
        session.delete_module(module).unwrap();
        assert!(session.engine().mem.live.is_empty());
    }

    #[test]
    fn test_compile_rejects_interior_nul() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let err = session.compile_source("a.qak", "x\0y").unwrap_err();
        assert!(matches!(err, AbiError::InteriorNul { what: "source text", index: 1 }));
        assert!(session.engine().mem.live.is_empty());
        assert!(!session.engine().calls.contains(&"compile_source"));
    }

    #[test]
    fn test_null_module_is_resource_exhausted() {
        let mut engine = FakeEngine::new();
        engine.null_compile = true;
        let mut session = Session::new(engine).unwrap();
        let err = session.compile_source("a.qak", "x").unwrap_err();
        assert!(matches!(err, AbiError::ResourceExhausted { operation: "compile_source" }));
        assert!(session.live_modules().is_empty());
    }

    #[test]
    fn test_tokens_and_counts() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let module = session.compile_source("a.qak", "alpha beta gamma").unwrap();
        assert_eq!(session.token_count(module).unwrap(), 3);
        let texts: Vec<_> = session
            .get_tokens(module)
            .unwrap()
            .into_iter()
            .map(|t| t.span.text)
            .collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
        assert!(!session.has_errors(module).unwrap());
    }

    #[test]
    fn test_diagnostics() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let module = session.compile_source("a.qak", "x =").unwrap();
        assert!(session.has_errors(module).unwrap());
        let diags = session.get_diagnostics(module).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "dangling =");
        assert_eq!(diags[0].span.start, 3);
    }

    #[test]
    fn test_enumeration_is_repeatable() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let module = session.compile_source("a.qak", "p q r s").unwrap();
        let first = session.get_tokens(module).unwrap();
        for _ in 0..100 {
            assert_eq!(session.get_tokens(module).unwrap(), first);
        }
    }

    #[test]
    fn test_early_termination_releases_scratch() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let module = session.compile_source("a.qak", "p q r s").unwrap();
        let before = session.engine().mem.live.len();
        {
            let mut tokens = session.tokens(module).unwrap();
            assert_eq!(tokens.count_hint(), 4);
            assert!(tokens.next().unwrap().is_ok());
        }
        assert_eq!(session.engine().mem.live.len(), before);
    }

    #[test]
    fn test_decode_failure_fuses_and_releases() {
        let mut engine = FakeEngine::new();
        engine.inverted_spans = true;
        let mut session = Session::new(engine).unwrap();
        let module = session.compile_source("a.qak", "ab cd ef").unwrap();
        let before = session.engine().mem.live.len();

        let results: Vec<_> = session.tokens(module).unwrap().collect();
        assert_eq!(results.len(), 2, "stops after the malformed record");
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(AbiError::MalformedRecord { .. })));
        assert_eq!(session.engine().mem.live.len(), before);

        assert!(session.get_tokens(module).is_err());
    }

    #[test]
    fn test_scratch_does_not_leak_previous_record() {
        let mut engine = FakeEngine::new();
        engine.silent_tokens = true;
        let mut session = Session::new(engine).unwrap();
        let module = session.compile_source("a.qak", "first second").unwrap();
        let tokens = session.get_tokens(module).unwrap();
        assert_eq!(tokens[0].span.text, "first");
        assert_eq!(tokens[1].span.text, "", "index 1 must not repeat index 0");
        assert_eq!(tokens[1].kind, 0);
    }

    #[test]
    fn test_snapshot() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let module = session.compile_source("s.qak", "a =").unwrap();
        let snapshot = session.snapshot(module).unwrap();
        assert_eq!(snapshot.handle, module);
        assert_eq!(snapshot.source.text, "a =");
        assert!(snapshot.has_errors);
        assert_eq!(snapshot.tokens.len(), 2);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["diagnostics"][0]["message"], "dangling =");
    }

    // ── lifecycle ────────────────────────────────────────────────────────

    #[test]
    fn test_deleted_module_is_stale() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let module = session.compile_source("a.qak", "x").unwrap();
        session.delete_module(module).unwrap();
        let calls_before = session.engine().calls.len();

        assert!(matches!(session.get_source(module), Err(AbiError::StaleModule(h)) if h == module));
        assert!(matches!(session.get_tokens(module), Err(AbiError::StaleModule(_))));
        assert!(matches!(session.has_errors(module), Err(AbiError::StaleModule(_))));
        assert!(matches!(session.delete_module(module), Err(AbiError::StaleModule(_))));
        assert!(matches!(session.print_tokens(module), Err(AbiError::StaleModule(_))));
        assert_eq!(session.engine().calls.len(), calls_before, "engine not called");
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut a = Session::new(FakeEngine::new()).unwrap();
        let mut b = Session::new(FakeEngine::new()).unwrap();
        let module = a.compile_source("a.qak", "x").unwrap();
        b.compile_source("b.qak", "y").unwrap();
        assert!(matches!(b.get_source(module), Err(AbiError::StaleModule(_))));
    }

    #[test]
    fn test_closed_session_rejects_everything() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let module = session.compile_source("a.qak", "x").unwrap();
        session.close().unwrap();
        assert!(session.is_closed());
        assert!(matches!(session.compile_source("b", "y"), Err(AbiError::SessionClosed)));
        assert!(matches!(session.get_source(module), Err(AbiError::SessionClosed)));
        assert!(matches!(session.report_memory_usage(), Err(AbiError::SessionClosed)));
    }

    #[test]
    fn test_close_releases_live_modules_once() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        session.compile_source("a.qak", "x").unwrap();
        session.compile_source("b.qak", "y").unwrap();
        session.close().unwrap();
        session.close().unwrap();

        let calls = &session.engine().calls;
        assert_eq!(calls.iter().filter(|c| **c == "module_delete").count(), 2);
        assert_eq!(calls.iter().filter(|c| **c == "compiler_delete").count(), 1);
        assert_eq!(calls.last(), Some(&"compiler_delete"));
        assert!(session.engine().mem.live.is_empty());
    }

    #[test]
    fn test_close_can_abandon_modules() {
        let config = SessionConfig {
            release_modules_on_close: false,
            ..SessionConfig::default()
        };
        let mut session = Session::with_config(FakeEngine::new(), config).unwrap();
        session.compile_source("a.qak", "x").unwrap();
        session.close().unwrap();
        assert!(!session.engine().calls.contains(&"module_delete"));
        assert!(session.live_modules().is_empty());
    }

    #[test]
    fn test_live_modules_in_creation_order() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let a = session.compile_source("a.qak", "x").unwrap();
        let b = session.compile_source("b.qak", "y").unwrap();
        let c = session.compile_source("c.qak", "z").unwrap();
        session.delete_module(b).unwrap();
        assert_eq!(session.live_modules(), vec![a, c]);
        assert!(session.is_live(a));
        assert!(!session.is_live(b));
    }

    #[test]
    fn test_printers_forward() {
        let mut session = Session::new(FakeEngine::new()).unwrap();
        let module = session.compile_source("a.qak", "x").unwrap();
        session.print_diagnostics(module).unwrap();
        session.print_tokens(module).unwrap();
        session.print_syntax_tree(module).unwrap();
        session.report_memory_usage().unwrap();
        let calls = &session.engine().calls;
        assert_eq!(
            &calls[calls.len() - 4..],
            &["print_errors", "print_tokens", "print_ast", "print_memory_usage"]
        );
    }
}
